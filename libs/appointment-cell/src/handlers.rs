// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentStatus, AssignServiceRequest, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest, SchedulingError,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::SlotCalculatorService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: Uuid,
    pub date: String,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MyAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

/// Boundary translation: every business-rule failure becomes a structured
/// response; only store faults surface as internal errors.
fn scheduling_error(err: SchedulingError) -> AppError {
    match err {
        SchedulingError::NotFound
        | SchedulingError::PatientNotFound
        | SchedulingError::DoctorNotFound
        | SchedulingError::DoctorProfileNotFound
        | SchedulingError::DepartmentNotFound
        | SchedulingError::ServiceNotFound => AppError::NotFound(err.to_string()),

        SchedulingError::SlotTaken => AppError::Conflict(err.to_string()),

        SchedulingError::Forbidden(msg) => AppError::Forbidden(msg),

        SchedulingError::DatabaseError(msg) => AppError::Internal(msg),

        SchedulingError::DoctorDepartmentMismatch { .. }
        | SchedulingError::ServiceDepartmentMismatch
        | SchedulingError::InvalidDate(_)
        | SchedulingError::InvalidTime(_)
        | SchedulingError::InvalidStatus(_)
        | SchedulingError::CancellationWindow(_)
        | SchedulingError::AppointmentPassed => AppError::BadRequest(err.to_string()),
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Public availability grid for a doctor on a date. Always 18 slots,
/// ascending from 08:00 to 16:30.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date format. Use YYYY-MM-DD".to_string()))?;

    let slot_service = SlotCalculatorService::new(&state);

    let response = slot_service
        .get_available_slots(params.doctor_id, date, params.department_id, None)
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!(response)))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let details = booking_service
        .book_appointment(&user, request, token)
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked successfully",
        "appointment": details
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, token)
        .await
        .map_err(scheduling_error)?;

    // Only the appointment's patient, its doctor, or an admin may view it.
    let is_patient = appointment.patient_id.to_string() == user.id;
    let is_doctor = appointment.doctor_id.to_string() == user.id;

    if !is_patient && !is_doctor && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<MyAppointmentsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .list_for_actor(&user, params.status, params.date_from, params.date_to, token)
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let cancelled = lifecycle_service
        .cancel(&user, appointment_id, request, token)
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
        "appointment": cancelled
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let rescheduled = lifecycle_service
        .reschedule(&user, appointment_id, request, token)
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment rescheduled successfully",
        "appointment": rescheduled
    })))
}

#[axum::debug_handler]
pub async fn assign_service(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AssignServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let (appointment, fee_breakdown) = lifecycle_service
        .assign_service(&user, appointment_id, request, token)
        .await
        .map_err(scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Service assigned successfully",
        "appointment": appointment,
        "fee_breakdown": fee_breakdown
    })))
}
