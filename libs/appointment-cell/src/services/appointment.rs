// libs/appointment-cell/src/services/appointment.rs
use std::sync::Arc;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use shared_api::PortalClient;
use shared_models::error::{ApiError, QueryError};

use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, AvailabilityQuery,
    AvailabilityResult, MutationError, UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Issues status changes and reads against the portal backend.
///
/// Holds no copy of the appointment list; callers re-fetch after a mutation.
pub struct AppointmentService {
    client: Arc<PortalClient>,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentService {
    pub fn new(client: Arc<PortalClient>) -> Self {
        Self {
            client,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    /// Search appointments with filters
    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, QueryError> {
        debug!("Listing appointments with filters: {:?}", filter);
        filter.validate()?;

        let appointments: Vec<Appointment> = self.client
            .get("/appointments", &filter.to_query())
            .await?;

        debug!("Fetched {} appointments", appointments.len());
        Ok(appointments)
    }

    /// A doctor's appointments falling on `today`.
    pub async fn todays_appointments(
        &self,
        doctor_id: i64,
        today: NaiveDate,
    ) -> Result<Vec<Appointment>, QueryError> {
        self.list_appointments(&AppointmentFilter::for_doctor(doctor_id).on(today)).await
    }

    /// Get appointment by ID
    pub async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, QueryError> {
        Ok(self.fetch_appointment(appointment_id).await?)
    }

    async fn fetch_appointment(&self, appointment_id: i64) -> Result<Appointment, ApiError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/appointments/{}", appointment_id);
        self.client.get(&path, &[]).await
    }

    /// Cancel an appointment.
    ///
    /// The backend treats cancellation as a status write, so repeating it on
    /// an already-cancelled appointment succeeds.
    pub async fn cancel(&self, appointment_id: i64) -> Result<(), MutationError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let path = format!("/appointments/{}", appointment_id);
        self.client.delete(&path).await
            .map_err(|e| mutation_error(appointment_id, e))?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(())
    }

    /// Mark a scheduled appointment completed and attach the diagnosis.
    pub async fn complete(&self, appointment_id: i64, diagnosis: &str) -> Result<(), MutationError> {
        debug!("Completing appointment: {}", appointment_id);

        let current = self.fetch_appointment(appointment_id).await
            .map_err(|e| mutation_error(appointment_id, e))?;

        self.lifecycle_service.validate_status_transition(
            &current.status,
            &AppointmentStatus::Completed,
        )?;

        let update = UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Completed),
            diagnosis: Some(diagnosis.to_string()),
        };
        let body = serde_json::to_value(&update)
            .map_err(|e| MutationError::Api(ApiError::Decode(e.to_string())))?;

        let path = format!("/appointments/{}", appointment_id);
        let updated: Value = self.client.put(&path, body).await
            .map_err(|e| mutation_error(appointment_id, e))?;

        let reported = updated.get("status").and_then(Value::as_str);
        if reported.is_some_and(|status| status != "completed") {
            warn!("Appointment {} reported status {:?} after completion", appointment_id, reported);
        }

        info!("Appointment {} completed", appointment_id);
        Ok(())
    }

    /// Read-through to the backend's availability lookup.
    pub async fn check_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<AvailabilityResult, QueryError> {
        let doctor = query.doctor.trim();
        if doctor.is_empty() {
            return Err(QueryError::InvalidInput("Doctor identifier is required".to_string()));
        }

        debug!("Checking availability for {}", doctor);

        let path = format!("/appointments/availability/{}", urlencoding::encode(doctor));
        Ok(self.client.get(&path, &query.to_query()).await?)
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle_service
    }
}

fn mutation_error(appointment_id: i64, error: ApiError) -> MutationError {
    match error {
        ApiError::NotFound(_) => MutationError::NotFound(appointment_id),
        other => MutationError::Api(other),
    }
}
