// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentStatus, BookAppointmentRequest, Department,
    DepartmentSummary, DoctorProfile, DoctorSummary, PartySummary, Room, RoomSummary,
    SchedulingError, SchedulingRules,
};
use crate::services::catalog::CatalogService;
use crate::services::conflict::SlotConflictService;
use crate::services::{slots, store_error};

/// The Booking Transaction: validates a booking request against the
/// business rules in order and commits the appointment atomically. The
/// final defense against concurrent commits on the same slot is the
/// store's unique constraint, surfaced here as a slot-taken error.
pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    catalog: CatalogService,
    conflict: SlotConflictService,
    rules: SchedulingRules,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            catalog: CatalogService::new(Arc::clone(&supabase)),
            conflict: SlotConflictService::new(Arc::clone(&supabase)),
            supabase,
            rules: SchedulingRules::default(),
        }
    }

    /// Book a new appointment for the calling patient.
    ///
    /// Preconditions are checked in a fixed order so the caller always
    /// learns the first failing rule: caller role, doctor and department
    /// existence, doctor/department match, date and time bounds, slot
    /// occupancy.
    pub async fn book_appointment(
        &self,
        actor: &User,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<AppointmentDetails, SchedulingError> {
        info!(
            "Booking appointment for patient {} with doctor {}",
            actor.id, request.doctor_id
        );

        if !actor.is_patient() {
            return Err(SchedulingError::Forbidden(
                "Only patients can book appointments".to_string(),
            ));
        }
        let patient_id = Uuid::parse_str(&actor.id)
            .map_err(|_| SchedulingError::Forbidden("Caller id is not a valid user id".to_string()))?;

        let doctor_user = self
            .catalog
            .get_doctor_user(request.doctor_id, Some(auth_token))
            .await?;
        let profile = self
            .catalog
            .get_doctor_profile(request.doctor_id, Some(auth_token))
            .await?;
        let department = self
            .catalog
            .get_active_department(request.department_id, Some(auth_token))
            .await?;

        // Doctors are scoped to a single department.
        if profile.department_id != department.id {
            warn!(
                "Doctor {} booked against department {} but belongs to {}",
                request.doctor_id, department.id, profile.department_id
            );
            return Err(SchedulingError::DoctorDepartmentMismatch {
                department: department.name.clone(),
            });
        }

        let today = Utc::now().date_naive();
        slots::validate_booking_date(request.appointment_date, today, &self.rules)?;
        slots::validate_slot_time(request.appointment_time)?;

        if self
            .conflict
            .slot_taken(
                request.doctor_id,
                request.appointment_date,
                request.appointment_time,
                None,
                Some(auth_token),
            )
            .await?
        {
            return Err(SchedulingError::SlotTaken);
        }

        let room = self.assign_room(&profile, department.id, auth_token).await?;

        let patient = self
            .catalog
            .find_user_account(patient_id, Some(auth_token))
            .await?
            .ok_or(SchedulingError::PatientNotFound)?;

        let appointment = self
            .create_appointment_record(patient_id, &request, &department, room.as_ref(), auth_token)
            .await?;

        info!(
            "Appointment {} booked for patient {} with doctor {} on {} at {}",
            appointment.id,
            patient_id,
            request.doctor_id,
            appointment.appointment_date,
            appointment.appointment_time
        );

        Ok(AppointmentDetails {
            appointment,
            patient: PartySummary {
                id: patient.id,
                full_name: patient.full_name,
                email: patient.email,
            },
            doctor: DoctorSummary {
                id: doctor_user.id,
                full_name: doctor_user.full_name,
                specialization: profile.specialization,
            },
            department: DepartmentSummary {
                id: department.id,
                name: department.name,
                icon: department.icon,
            },
            room: room.map(|r| RoomSummary {
                id: r.id,
                room_number: r.room_number,
            }),
        })
    }

    /// Get appointment by ID.
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(store_error)?;

        rows.into_iter().next().ok_or(SchedulingError::NotFound)
    }

    /// List the caller's own appointments: patients theirs, doctors
    /// theirs, admins all. Ordered newest date first, times ascending.
    pub async fn list_for_actor(
        &self,
        actor: &User,
        status: Option<AppointmentStatus>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut query_parts = Vec::new();

        match actor.role.as_deref() {
            Some("patient") => query_parts.push(format!("patient_id=eq.{}", actor.id)),
            Some("doctor") => query_parts.push(format!("doctor_id=eq.{}", actor.id)),
            Some("admin") => {}
            _ => {
                return Err(SchedulingError::Forbidden(
                    "You do not have permission to list appointments".to_string(),
                ))
            }
        }

        if let Some(status) = status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = date_from {
            query_parts.push(format!("appointment_date=gte.{}", from));
        }
        if let Some(to) = date_to {
            query_parts.push(format!("appointment_date=lte.{}", to));
        }
        query_parts.push("order=appointment_date.desc,appointment_time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(store_error)?;

        Ok(rows)
    }

    /// Room auto-assignment: the doctor's dedicated room when active, else
    /// the first active room of the department, else none.
    async fn assign_room(
        &self,
        profile: &DoctorProfile,
        department_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Room>, SchedulingError> {
        if let Some(room_id) = profile.room_id {
            if let Some(room) = self
                .catalog
                .find_active_room(room_id, Some(auth_token))
                .await?
            {
                return Ok(Some(room));
            }
        }

        self.catalog
            .first_active_room(Some(department_id), Some(auth_token))
            .await
    }

    async fn create_appointment_record(
        &self,
        patient_id: Uuid,
        request: &BookAppointmentRequest,
        department: &Department,
        room: Option<&Room>,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let now = Utc::now();

        // Service is assigned later by the doctor; the fee at booking time
        // is the department's examination fee alone.
        let appointment_data = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "department_id": department.id,
            "service_id": null,
            "room_id": room.map(|r| r.id),
            "appointment_date": request.appointment_date.to_string(),
            "appointment_time": request.appointment_time.format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Booked.to_string(),
            "symptoms": request.symptoms.clone(),
            "reason": request.reason.clone(),
            "notes": request.notes.clone(),
            "estimated_fee": department.health_examination_fee,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(store_error)?;

        rows.into_iter().next().ok_or_else(|| {
            SchedulingError::DatabaseError("Failed to create appointment".to_string())
        })
    }
}
