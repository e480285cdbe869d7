// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentStatus, AssignServiceRequest, CancelAppointmentRequest, FeeBreakdown,
    PreviousSlot, RescheduleAppointmentRequest, SchedulingError, SchedulingRules,
};
use crate::services::catalog::CatalogService;
use crate::services::conflict::SlotConflictService;
use crate::services::{slots, store_error};

/// The Lifecycle Manager: state transitions over `status` under role and
/// timing constraints. Cancellation is the only removal semantic; a freed
/// slot needs no release step because occupancy is a live status query.
pub struct AppointmentLifecycleService {
    supabase: Arc<SupabaseClient>,
    catalog: CatalogService,
    conflict: SlotConflictService,
    rules: SchedulingRules,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            catalog: CatalogService::new(Arc::clone(&supabase)),
            conflict: SlotConflictService::new(Arc::clone(&supabase)),
            supabase,
            rules: SchedulingRules::default(),
        }
    }

    // ==========================================================================
    // PERMISSION CHECKS
    // ==========================================================================
    // One small check per operation over (role, actor id, appointment),
    // keeping the state machine itself role-agnostic.

    pub fn authorize_cancel(
        &self,
        actor: &User,
        appointment: &Appointment,
    ) -> Result<(), SchedulingError> {
        Self::authorize_party(actor, appointment, "cancel")
    }

    pub fn authorize_reschedule(
        &self,
        actor: &User,
        appointment: &Appointment,
    ) -> Result<(), SchedulingError> {
        Self::authorize_party(actor, appointment, "reschedule")
    }

    /// Only the doctor assigned to this appointment may attach a service.
    pub fn authorize_assign_service(
        &self,
        actor: &User,
        appointment: &Appointment,
    ) -> Result<(), SchedulingError> {
        if !actor.is_doctor() {
            return Err(SchedulingError::Forbidden(
                "Only doctors can assign services to appointments".to_string(),
            ));
        }
        if appointment.doctor_id.to_string() != actor.id {
            return Err(SchedulingError::Forbidden(
                "You can only assign services to your own appointments".to_string(),
            ));
        }
        Ok(())
    }

    fn authorize_party(
        actor: &User,
        appointment: &Appointment,
        action: &str,
    ) -> Result<(), SchedulingError> {
        match actor.role.as_deref() {
            Some("patient") => {
                if appointment.patient_id.to_string() != actor.id {
                    return Err(SchedulingError::Forbidden(format!(
                        "You can only {} your own appointments",
                        action
                    )));
                }
                Ok(())
            }
            Some("doctor") => {
                if appointment.doctor_id.to_string() != actor.id {
                    return Err(SchedulingError::Forbidden(format!(
                        "You can only {} your own appointments",
                        action
                    )));
                }
                Ok(())
            }
            Some("admin") => Ok(()),
            _ => Err(SchedulingError::Forbidden(format!(
                "You do not have permission to {} appointments",
                action
            ))),
        }
    }

    // ==========================================================================
    // STATUS AND TIMING GATES
    // ==========================================================================

    pub fn validate_cancellable(&self, status: AppointmentStatus) -> Result<(), SchedulingError> {
        if status.is_terminal() {
            return Err(SchedulingError::InvalidStatus(status));
        }
        Ok(())
    }

    pub fn validate_reschedulable(&self, status: AppointmentStatus) -> Result<(), SchedulingError> {
        if !status.is_active() {
            return Err(SchedulingError::InvalidStatus(status));
        }
        Ok(())
    }

    pub fn validate_service_assignable(
        &self,
        status: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        if !matches!(
            status,
            AppointmentStatus::Confirmed | AppointmentStatus::Completed
        ) {
            return Err(SchedulingError::InvalidStatus(status));
        }
        Ok(())
    }

    /// Cancellation notice rule. An appointment whose scheduled moment has
    /// passed is rejected distinctly from one inside the notice window;
    /// callers waive this entirely for admins.
    pub fn validate_cancellation_window(
        &self,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        let remaining = scheduled_at - now;

        if remaining < Duration::zero() {
            return Err(SchedulingError::AppointmentPassed);
        }
        if remaining < Duration::hours(self.rules.min_cancellation_notice_hours) {
            return Err(SchedulingError::CancellationWindow(
                self.rules.min_cancellation_notice_hours,
            ));
        }

        Ok(())
    }

    // ==========================================================================
    // OPERATIONS
    // ==========================================================================

    /// booked/confirmed -> cancelled (terminal).
    pub async fn cancel(
        &self,
        actor: &User,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        self.authorize_cancel(actor, &appointment)?;
        self.validate_cancellable(appointment.status)?;

        if !actor.is_admin() {
            self.validate_cancellation_window(appointment.scheduled_at(), Utc::now())?;
        }

        let now = Utc::now();
        let update = json!({
            "status": AppointmentStatus::Cancelled.to_string(),
            "cancellation_reason": request.reason,
            "cancelled_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let cancelled = self.patch_appointment(appointment.id, update, auth_token).await?;

        info!(
            "Appointment {} cancelled by {} ({})",
            appointment.id,
            actor.id,
            actor.role.as_deref().unwrap_or("unknown")
        );
        Ok(cancelled)
    }

    /// booked/confirmed -> booked at the new (date, time). Keeps the id,
    /// overwrites `rescheduled_from` with the immediately-previous slot.
    pub async fn reschedule(
        &self,
        actor: &User,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        self.authorize_reschedule(actor, &appointment)?;
        self.validate_reschedulable(appointment.status)?;

        let today = Utc::now().date_naive();
        slots::validate_booking_date(request.new_date, today, &self.rules)?;
        slots::validate_slot_time(request.new_time)?;

        if self
            .conflict
            .slot_taken(
                appointment.doctor_id,
                request.new_date,
                request.new_time,
                Some(appointment.id),
                Some(auth_token),
            )
            .await?
        {
            warn!(
                "Reschedule collision for appointment {} onto {} {}",
                appointment.id, request.new_date, request.new_time
            );
            return Err(SchedulingError::SlotTaken);
        }

        let previous = PreviousSlot {
            date: appointment.appointment_date,
            time: appointment.appointment_time,
        };

        let mut notes = appointment.notes.clone().unwrap_or_default();
        if !notes.is_empty() {
            notes.push('\n');
        }
        notes.push_str("Rescheduled");
        if let Some(reason) = request.reason.as_deref().filter(|r| !r.is_empty()) {
            notes.push_str(": ");
            notes.push_str(reason);
        }

        let now = Utc::now();
        let update = json!({
            "appointment_date": request.new_date.to_string(),
            "appointment_time": request.new_time.format("%H:%M:%S").to_string(),
            "rescheduled_from": previous.clone(),
            "status": AppointmentStatus::Booked.to_string(),
            "notes": notes,
            "updated_at": now.to_rfc3339()
        });

        let rescheduled = self.patch_appointment(appointment.id, update, auth_token).await?;

        info!(
            "Appointment {} rescheduled from {} {} to {} {}",
            appointment.id, previous.date, previous.time, request.new_date, request.new_time
        );
        Ok(rescheduled)
    }

    /// confirmed/completed self-loop: attach a service and recompute the
    /// fee as examination fee + service price (full replace, never
    /// stacked across calls).
    pub async fn assign_service(
        &self,
        actor: &User,
        appointment_id: Uuid,
        request: AssignServiceRequest,
        auth_token: &str,
    ) -> Result<(Appointment, FeeBreakdown), SchedulingError> {
        debug!(
            "Assigning service {} to appointment {}",
            request.service_id, appointment_id
        );

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        self.authorize_assign_service(actor, &appointment)?;
        self.validate_service_assignable(appointment.status)?;

        let service = self
            .catalog
            .get_active_service(request.service_id, Some(auth_token))
            .await?;

        if service.department_id != appointment.department_id {
            return Err(SchedulingError::ServiceDepartmentMismatch);
        }

        let department = self
            .catalog
            .get_department(appointment.department_id, Some(auth_token))
            .await?;

        let breakdown = FeeBreakdown {
            health_examination_fee: department.health_examination_fee,
            service_fee: service.price,
            total_fee: department.health_examination_fee + service.price,
        };

        let now = Utc::now();
        let update = json!({
            "service_id": service.id,
            "estimated_fee": breakdown.total_fee,
            "updated_at": now.to_rfc3339()
        });

        let updated = self.patch_appointment(appointment.id, update, auth_token).await?;

        info!(
            "Service {} assigned to appointment {} (fee {} -> {})",
            service.id, appointment.id, appointment.estimated_fee, breakdown.total_fee
        );
        Ok((updated, breakdown))
    }

    // ==========================================================================
    // STORE ACCESS
    // ==========================================================================

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(store_error)?;

        rows.into_iter().next().ok_or(SchedulingError::NotFound)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update),
                Some(headers),
            )
            .await
            .map_err(store_error)?;

        rows.into_iter().next().ok_or(SchedulingError::NotFound)
    }
}
