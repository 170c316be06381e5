// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

use shared_models::error::{ApiError, QueryError};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(rename = "appointment_time")]
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub calendar_event_id: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
}

impl Appointment {
    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Completed and cancelled appointments never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn allowed_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Scheduled => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Filters for `GET /appointments`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn for_doctor(doctor_id: i64) -> Self {
        Self { doctor_id: Some(doctor_id), ..Self::default() }
    }

    pub fn for_patient(patient_id: i64) -> Self {
        Self { patient_id: Some(patient_id), ..Self::default() }
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from_date: Option<NaiveDate>, to_date: Option<NaiveDate>) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
    }

    pub fn on(self, day: NaiveDate) -> Self {
        self.between(Some(day), Some(day))
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if from > to {
                return Err(QueryError::InvalidInput(format!(
                    "from_date {} is after to_date {}", from, to
                )));
            }
        }
        Ok(())
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if let Some(doctor_id) = self.doctor_id {
            query.push(("doctor_id", doctor_id.to_string()));
        }
        if let Some(patient_id) = self.patient_id {
            query.push(("patient_id", patient_id.to_string()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.to_string()));
        }
        if let Some(from_date) = self.from_date {
            query.push(("from_date", from_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(to_date) = self.to_date {
            query.push(("to_date", to_date.format("%Y-%m-%d").to_string()));
        }

        query
    }
}

/// Partial update body for `PUT /appointments/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateAppointmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    At(NaiveTime),
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "morning"),
            TimeOfDay::Afternoon => write!(f, "afternoon"),
            TimeOfDay::Evening => write!(f, "evening"),
            TimeOfDay::At(time) => write!(f, "{}", time.format("%H:%M")),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            other => NaiveTime::parse_from_str(other, "%H:%M")
                .map(TimeOfDay::At)
                .map_err(|_| format!("Expected morning, afternoon, evening or HH:MM, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityQuery {
    /// Doctor name as the backend resolves it.
    pub doctor: String,
    pub date: Option<NaiveDate>,
    pub time_of_day: Option<TimeOfDay>,
}

impl AvailabilityQuery {
    pub fn new(doctor: impl Into<String>) -> Self {
        Self { doctor: doctor.into(), date: None, time_of_day: None }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn at(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(date) = self.date {
            query.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(time_of_day) = self.time_of_day {
            query.push(("time_of_day", time_of_day.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySlot {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorAvailability {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub available_slots: Vec<AvailabilitySlot>,
}

/// Whatever the backend decided is open; never computed locally.
pub type AvailabilityResult = Vec<DoctorAvailability>;

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError {
    #[error("Appointment {0} not found")]
    NotFound(i64),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl MutationError {
    pub fn is_auth(&self) -> bool {
        matches!(self, MutationError::Api(e) if e.is_auth())
    }
}
