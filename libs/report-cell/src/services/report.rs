// libs/report-cell/src/services/report.rs
use std::sync::Arc;
use chrono::NaiveDate;
use tracing::{debug, info};

use shared_api::PortalClient;
use shared_models::error::{ApiError, QueryError};

use crate::models::{AppointmentStats, DoctorReport, ReportRequest};

pub struct ReportService {
    client: Arc<PortalClient>,
}

impl ReportService {
    pub fn new(client: Arc<PortalClient>) -> Self {
        Self { client }
    }

    pub async fn get_stats(
        &self,
        doctor_id: i64,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<AppointmentStats, QueryError> {
        check_range(from_date, to_date)?;
        debug!("Fetching stats for doctor {}", doctor_id);

        let mut query = Vec::new();
        if let Some(from) = from_date {
            query.push(("from_date", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = to_date {
            query.push(("to_date", to.format("%Y-%m-%d").to_string()));
        }

        let path = format!("/reports/stats/doctor/{}", doctor_id);
        Ok(self.client.get(&path, &query).await?)
    }

    /// Asks the backend to build a report. Nothing in it is computed locally.
    pub async fn generate_report(&self, request: &ReportRequest) -> Result<DoctorReport, QueryError> {
        check_range(request.date_from, request.date_to)?;
        debug!("Generating report for doctor {}", request.doctor_id);

        let body = serde_json::to_value(request)
            .map_err(|e| QueryError::Api(ApiError::Decode(e.to_string())))?;

        let report: DoctorReport = self.client.post("/reports/doctor-report", body).await?;

        info!(
            "Report for doctor {} covers {} appointments",
            report.doctor_id, report.appointment_stats.total
        );
        Ok(report)
    }
}

fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), QueryError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(QueryError::InvalidInput(format!(
            "from_date {} is after to_date {}", from, to
        ))),
        _ => Ok(()),
    }
}
