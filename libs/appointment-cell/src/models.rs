// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub department_id: Uuid,
    /// Assigned by the doctor after examination, never at booking time.
    pub service_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Always department.health_examination_fee, plus service.price once a
    /// service is assigned. Recomputed on every change, never adjusted.
    pub estimated_fee: f64,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Previous (date, time) if rescheduled; overwritten on each reschedule.
    pub rescheduled_from: Option<PreviousSlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The scheduled moment as a UTC instant, for cancellation-window math.
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.appointment_date
            .and_time(self.appointment_time)
            .and_utc()
    }
}

/// Single-hop reschedule history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Active appointments occupy their slot and block rebooking.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::Confirmed)
    }

    /// Terminal for cancel/reschedule purposes.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// COLLABORATOR MODELS (read-only reference data)
// ==============================================================================

/// Identity-service view of a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
}

/// Doctor profile keyed by user id. Doctors are scoped to one department
/// and may have a dedicated room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub department_id: Uuid,
    pub room_id: Option<Uuid>,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub health_examination_fee: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalService {
    pub id: Uuid,
    pub department_id: Uuid,
    pub name: String,
    pub price: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub floor: Option<i32>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub department_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub symptoms: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignServiceRequest {
    pub service_id: Uuid,
}

/// One entry of the availability grid. `room` carries the representative
/// room number for bookable slots only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub time: NaiveTime,
    pub available: bool,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub doctor: DoctorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentSummary>,
    pub slots: Vec<SlotAvailability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub room_number: String,
}

/// Booking response: the created appointment with resolved display data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub appointment: Appointment,
    pub patient: PartySummary,
    pub doctor: DoctorSummary,
    pub department: DepartmentSummary,
    pub room: Option<RoomSummary>,
}

/// Fee components reported after service assignment. Total always equals
/// the sum of the two parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub health_examination_fee: f64,
    pub service_fee: f64,
    pub total_fee: f64,
}

// ==============================================================================
// BUSINESS RULES
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SchedulingRules {
    /// Bookings and reschedules must land within [today, today + this].
    pub max_advance_booking_days: i64,
    /// Non-admin cancellations need at least this much notice.
    pub min_cancellation_notice_hours: i64,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            max_advance_booking_days: 30,
            min_cancellation_notice_hours: 24,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient account not found or inactive")]
    PatientNotFound,

    #[error("Doctor not found or inactive")]
    DoctorNotFound,

    #[error("Doctor profile not found")]
    DoctorProfileNotFound,

    #[error("Department not found or inactive")]
    DepartmentNotFound,

    #[error("Service not found or inactive")]
    ServiceNotFound,

    #[error("Doctor does not belong to department \"{department}\"")]
    DoctorDepartmentMismatch { department: String },

    #[error("Service does not belong to the appointment's department")]
    ServiceDepartmentMismatch,

    #[error("Invalid appointment date: {0}")]
    InvalidDate(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("This time slot is already taken. Please choose another time.")]
    SlotTaken,

    #[error("{0}")]
    Forbidden(String),

    #[error("Operation not allowed for appointment with status: {0}")]
    InvalidStatus(AppointmentStatus),

    #[error("Cannot cancel appointment within {0} hours of scheduled time")]
    CancellationWindow(i64),

    #[error("Cannot modify an appointment that has already passed")]
    AppointmentPassed,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
