pub mod booking;
pub mod catalog;
pub mod conflict;
pub mod lifecycle;
pub mod slots;

pub use booking::AppointmentBookingService;
pub use catalog::CatalogService;
pub use conflict::SlotConflictService;
pub use lifecycle::AppointmentLifecycleService;
pub use slots::SlotCalculatorService;

use shared_database::StoreError;

use crate::models::SchedulingError;

/// Translate store failures into scheduling errors. The store's 409 comes
/// from the partial unique index over (doctor_id, appointment_date,
/// appointment_time) scoped to active statuses, so it always means the
/// slot was taken between our read and the commit.
pub(crate) fn store_error(err: StoreError) -> SchedulingError {
    match err {
        StoreError::Conflict(_) => SchedulingError::SlotTaken,
        other => SchedulingError::DatabaseError(other.to_string()),
    }
}
