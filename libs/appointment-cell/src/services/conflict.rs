// libs/appointment-cell/src/services/conflict.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, SchedulingError};
use crate::services::store_error;

/// Occupancy checks over the shared appointment store.
///
/// A slot is occupied while an appointment with an active status (booked
/// or confirmed) holds it; cancellation frees the slot implicitly because
/// every check is a live status query. This pre-check narrows the race
/// window; the store's unique constraint closes it at commit time.
pub struct SlotConflictService {
    supabase: Arc<SupabaseClient>,
}

impl SlotConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Whether an active appointment already holds (doctor, date, time).
    /// `exclude_appointment_id` skips the appointment being moved so a
    /// reschedule does not collide with itself.
    pub async fn slot_taken(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<bool, SchedulingError> {
        debug!(
            "Checking slot occupancy for doctor {} on {} at {}",
            doctor_id, date, time
        );

        let time_str = time.format("%H:%M:%S").to_string();
        let time_filter = urlencoding::encode(&time_str);
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=in.(booked,confirmed)",
            doctor_id, date, time_filter
        );
        if let Some(id) = exclude_appointment_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        let taken = rows.iter().any(|apt| apt.status.is_active());
        if taken {
            warn!(
                "Slot conflict for doctor {} on {} at {}",
                doctor_id, date, time
            );
        }

        Ok(taken)
    }

    /// All times held by active appointments of a doctor on a date.
    pub async fn occupied_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<HashSet<NaiveTime>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=in.(booked,confirmed)",
            doctor_id, date
        );

        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .filter(|apt| apt.status.is_active())
            .map(|apt| apt.appointment_time)
            .collect())
    }
}
