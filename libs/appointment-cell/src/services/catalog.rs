// libs/appointment-cell/src/services/catalog.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Department, DoctorProfile, MedicalService, Room, SchedulingError, UserAccount};
use crate::services::store_error;

/// Read-only lookups against the identity and catalog collaborators.
/// Everything here is reference data; the scheduler never writes to it.
pub struct CatalogService {
    supabase: Arc<SupabaseClient>,
}

impl CatalogService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_user_account(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<UserAccount>, SchedulingError> {
        let path = format!("/rest/v1/users?id=eq.{}&is_active=eq.true", user_id);
        let rows: Vec<UserAccount> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    /// The user account behind a doctor id. Requires role=doctor and an
    /// active account; anything else reads as "no such doctor".
    pub async fn get_doctor_user(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<UserAccount, SchedulingError> {
        debug!("Looking up doctor user: {}", doctor_id);

        let path = format!(
            "/rest/v1/users?id=eq.{}&role=eq.doctor&is_active=eq.true",
            doctor_id
        );
        let rows: Vec<UserAccount> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::DoctorNotFound)
    }

    pub async fn get_doctor_profile(
        &self,
        doctor_user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<DoctorProfile, SchedulingError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", doctor_user_id);
        let rows: Vec<DoctorProfile> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::DoctorProfileNotFound)
    }

    pub async fn get_active_department(
        &self,
        department_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Department, SchedulingError> {
        let path = format!(
            "/rest/v1/departments?id=eq.{}&is_active=eq.true",
            department_id
        );
        let rows: Vec<Department> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::DepartmentNotFound)
    }

    /// Department lookup without the active filter, for fee recomputation
    /// on appointments that already reference the department.
    pub async fn get_department(
        &self,
        department_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Department, SchedulingError> {
        let path = format!("/rest/v1/departments?id=eq.{}", department_id);
        let rows: Vec<Department> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::DepartmentNotFound)
    }

    pub async fn get_active_service(
        &self,
        service_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<MedicalService, SchedulingError> {
        let path = format!(
            "/rest/v1/services?id=eq.{}&is_active=eq.true",
            service_id
        );
        let rows: Vec<MedicalService> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::ServiceNotFound)
    }

    /// A specific room, only if it is still active.
    pub async fn find_active_room(
        &self,
        room_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<Room>, SchedulingError> {
        let path = format!("/rest/v1/rooms?id=eq.{}&is_active=eq.true", room_id);
        let rows: Vec<Room> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    /// First active room of a department, or of any department when none
    /// is given. `None` when the clinic has no matching active room.
    pub async fn first_active_room(
        &self,
        department_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Option<Room>, SchedulingError> {
        let path = match department_id {
            Some(id) => format!(
                "/rest/v1/rooms?department_id=eq.{}&is_active=eq.true&order=room_number.asc&limit=1",
                id
            ),
            None => "/rest/v1/rooms?is_active=eq.true&order=room_number.asc&limit=1".to_string(),
        };
        let rows: Vec<Room> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }
}
