// libs/report-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Appointment counts as the backend tallies them for one doctor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentStats {
    pub total: u32,
    pub completed: u32,
    pub scheduled: u32,
    pub cancelled: u32,
}

impl AppointmentStats {
    pub fn view(&self) -> StatsView {
        StatsView::new(*self)
    }
}

/// Presentation-side percentages over a stats block. Nothing here is stored
/// or sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsView {
    stats: AppointmentStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatPart {
    Completed,
    Scheduled,
    Cancelled,
}

impl StatsView {
    pub fn new(stats: AppointmentStats) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &AppointmentStats {
        &self.stats
    }

    fn count(&self, part: StatPart) -> u32 {
        match part {
            StatPart::Completed => self.stats.completed,
            StatPart::Scheduled => self.stats.scheduled,
            StatPart::Cancelled => self.stats.cancelled,
        }
    }

    /// Share of `total` in percent. Zero when there are no appointments.
    pub fn rate(&self, part: StatPart) -> f64 {
        if self.stats.total == 0 {
            return 0.0;
        }
        f64::from(self.count(part)) / f64::from(self.stats.total) * 100.0
    }

    pub fn format_rate(&self, part: StatPart) -> String {
        if self.stats.total == 0 {
            return "0%".to_string();
        }
        format!("{:.1}%", self.rate(part))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportRequest {
    pub doctor_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ReportRequest {
    pub fn for_doctor(doctor_id: i64) -> Self {
        Self { doctor_id, ..Self::default() }
    }

    pub fn between(mut self, date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Self {
        self.date_from = date_from;
        self.date_to = date_to;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyAppointmentCount {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientCondition {
    pub condition: String,
    pub count: u32,
}

/// Server-generated report. Content and ordering are taken as returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorReport {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub report_date: NaiveDateTime,
    pub appointment_stats: AppointmentStats,
    #[serde(default)]
    pub daily_breakdown: Option<Vec<DailyAppointmentCount>>,
    #[serde(default)]
    pub common_conditions: Option<Vec<PatientCondition>>,
    pub summary: String,
}

impl DoctorReport {
    pub fn conditions(&self) -> &[PatientCondition] {
        self.common_conditions.as_deref().unwrap_or_default()
    }
}
