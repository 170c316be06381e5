// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentStatus, MutationError};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), MutationError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(MutationError::InvalidTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        current_status.allowed_transitions().to_vec()
    }

    pub fn can_cancel(&self, appointment: &Appointment) -> bool {
        self.get_valid_transitions(&appointment.status)
            .contains(&AppointmentStatus::Cancelled)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
