// libs/appointment-cell/src/services/slots.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Timelike, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailableSlotsResponse, DepartmentSummary, DoctorProfile, DoctorSummary, SchedulingError,
    SchedulingRules, SlotAvailability,
};
use crate::services::catalog::CatalogService;
use crate::services::conflict::SlotConflictService;

pub const SLOT_INTERVAL_MINUTES: i64 = 30;

fn first_slot() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap()
}

fn last_slot() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 30, 0).unwrap()
}

/// The canonical bookable grid: 08:00 through 16:30 inclusive in
/// 30-minute steps, ascending. Always exactly 18 entries.
pub fn canonical_slots() -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let mut current = first_slot();
    while current <= last_slot() {
        slots.push(current);
        current = current + Duration::minutes(SLOT_INTERVAL_MINUTES);
    }
    slots
}

/// Booking window check shared by booking, reschedule and availability.
pub fn validate_booking_date(
    date: NaiveDate,
    today: NaiveDate,
    rules: &SchedulingRules,
) -> Result<(), SchedulingError> {
    if date < today {
        return Err(SchedulingError::InvalidDate(
            "Cannot book appointments in the past".to_string(),
        ));
    }

    let max_date = today + Duration::days(rules.max_advance_booking_days);
    if date > max_date {
        return Err(SchedulingError::InvalidDate(format!(
            "Cannot book appointments more than {} days in advance",
            rules.max_advance_booking_days
        )));
    }

    Ok(())
}

/// Reject any time that is not one of the canonical marks.
pub fn validate_slot_time(time: NaiveTime) -> Result<(), SchedulingError> {
    if time < first_slot() || time > last_slot() {
        return Err(SchedulingError::InvalidTime(
            "Appointment time must be between 08:00 and 16:30".to_string(),
        ));
    }

    if time.second() != 0 || !matches!(time.minute(), 0 | 30) {
        return Err(SchedulingError::InvalidTime(
            "Appointment time must be on a 30-minute mark (e.g., 09:00, 09:30)".to_string(),
        ));
    }

    Ok(())
}

/// The Slot Calculator: a pure function of the date and current occupancy,
/// safe to call repeatedly with no side effects.
pub struct SlotCalculatorService {
    catalog: CatalogService,
    conflict: SlotConflictService,
    rules: SchedulingRules,
}

impl SlotCalculatorService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            catalog: CatalogService::new(Arc::clone(&supabase)),
            conflict: SlotConflictService::new(supabase),
            rules: SchedulingRules::default(),
        }
    }

    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        department_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<AvailableSlotsResponse, SchedulingError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let doctor_user = self.catalog.get_doctor_user(doctor_id, auth_token).await?;
        let profile = self.catalog.get_doctor_profile(doctor_id, auth_token).await?;

        let today = Utc::now().date_naive();
        validate_booking_date(date, today, &self.rules)?;

        let department = match department_id {
            Some(id) => Some(self.catalog.get_active_department(id, auth_token).await?),
            None => None,
        };

        let occupied = self
            .conflict
            .occupied_times(doctor_id, date, auth_token)
            .await?;

        let room = self.suggest_room(&profile, department_id, auth_token).await?;

        let slots = canonical_slots()
            .into_iter()
            .map(|time| {
                let available = !occupied.contains(&time);
                SlotAvailability {
                    time,
                    available,
                    room: if available { room.clone() } else { None },
                }
            })
            .collect();

        Ok(AvailableSlotsResponse {
            date,
            doctor: DoctorSummary {
                id: doctor_user.id,
                full_name: doctor_user.full_name,
                specialization: profile.specialization,
            },
            department: department.map(|d| DepartmentSummary {
                id: d.id,
                name: d.name,
                icon: d.icon,
            }),
            slots,
        })
    }

    /// Representative room for bookable slots: the doctor's dedicated room
    /// when still active, else the first active room of the department (or
    /// of any department when none was given). A clinic with no active
    /// room reports availability with no room.
    async fn suggest_room(
        &self,
        profile: &DoctorProfile,
        department_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Option<String>, SchedulingError> {
        if let Some(room_id) = profile.room_id {
            if let Some(room) = self.catalog.find_active_room(room_id, auth_token).await? {
                return Ok(Some(room.room_number));
            }
        }

        let fallback = self.catalog.first_active_room(department_id, auth_token).await?;
        Ok(fallback.map(|room| room.room_number))
    }
}
