use std::sync::Arc;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use appointment_cell::{
    Appointment, AppointmentFilter, AppointmentService, AppointmentStatus, AvailabilityQuery,
    TimeOfDay,
};
use auth_cell::{AuthService, Dashboard};
use chat_cell::{ChatError, ConversationSession, RemoteAssistant};
use report_cell::{ReportRequest, ReportService, StatPart};
use shared_api::PortalClient;
use shared_models::auth::{PortalUser, UserRole};

/// Services sharing one client and one signed-in session.
pub struct Portal {
    pub client: Arc<PortalClient>,
    pub auth: AuthService,
    pub appointments: AppointmentService,
    pub reports: ReportService,
}

impl Portal {
    pub fn new(client: Arc<PortalClient>) -> Self {
        Self {
            auth: AuthService::new(client.clone()),
            appointments: AppointmentService::new(client.clone()),
            reports: ReportService::new(client.clone()),
            client,
        }
    }

    pub async fn sign_in(&self, email: Option<&str>, password: Option<&str>) -> Result<PortalUser> {
        let email = email.context("No email given, pass --email or set PORTAL_EMAIL")?;
        let password = password.context("No password given, pass --password or set PORTAL_PASSWORD")?;

        Ok(self.auth.login(email, password).await?)
    }
}

pub async fn login(portal: &Portal) -> Result<()> {
    let user = portal.auth.current_user().await.context("Not signed in")?;
    let dashboard = match portal.auth.dashboard().await {
        Some(Dashboard::Doctor) => "doctor",
        Some(Dashboard::Patient) | None => "patient",
    };

    println!("Signed in as {} <{}>", user.full_name, user.email);
    println!("User ID: {}  Dashboard: {}", user.id, dashboard);
    Ok(())
}

pub struct AppointmentsArgs {
    pub doctor: Option<i64>,
    pub patient: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub today: bool,
}

pub async fn appointments(portal: &Portal, user: &PortalUser, args: AppointmentsArgs) -> Result<()> {
    let filter = if args.today {
        todays_filter(user, args.doctor, Local::now().date_naive())
    } else {
        AppointmentFilter {
            doctor_id: args.doctor,
            patient_id: args.patient,
            status: args.status,
            from_date: args.from,
            to_date: args.to,
        }
    };
    let list = portal.appointments.list_appointments(&filter).await?;

    if list.is_empty() {
        println!("No appointments found.");
        return Ok(());
    }

    for appointment in &list {
        print_appointment(appointment);
    }
    println!("{} appointment(s)", list.len());
    Ok(())
}

/// Today's appointments from the signed-in user's side: a doctor's schedule,
/// or a patient's own bookings.
fn todays_filter(user: &PortalUser, doctor: Option<i64>, today: NaiveDate) -> AppointmentFilter {
    let filter = match user.role {
        UserRole::Doctor => AppointmentFilter::for_doctor(doctor.unwrap_or(user.id)),
        UserRole::Patient => AppointmentFilter {
            doctor_id: doctor,
            ..AppointmentFilter::for_patient(user.id)
        },
    };
    filter.on(today)
}

fn print_appointment(appointment: &Appointment) {
    let who = match (&appointment.doctor_name, &appointment.patient_name) {
        (Some(doctor), Some(patient)) => format!("{} with {}", patient, doctor),
        (Some(doctor), None) => doctor.clone(),
        (None, Some(patient)) => patient.clone(),
        (None, None) => format!("doctor #{} / patient #{}", appointment.doctor_id, appointment.patient_id),
    };

    println!(
        "#{:<6} {}  {:<10} {}",
        appointment.id,
        appointment.scheduled_at.format("%Y-%m-%d %H:%M"),
        appointment.status,
        who
    );
    if let Some(reason) = &appointment.reason {
        println!("        reason: {}", reason);
    }
    if let Some(diagnosis) = &appointment.diagnosis {
        println!("        diagnosis: {}", diagnosis);
    }
}

/// Cancels only scheduled appointments. The backend writes `cancelled`
/// unconditionally, so a completed visit must be stopped here.
pub async fn cancel(portal: &Portal, id: i64) -> Result<()> {
    let appointment = portal.appointments.get_appointment(id).await?;

    if appointment.status == AppointmentStatus::Cancelled {
        println!("Appointment #{} is already cancelled.", id);
        return Ok(());
    }
    if !portal.appointments.lifecycle().can_cancel(&appointment) {
        anyhow::bail!("Appointment #{} is {} and can no longer be cancelled", id, appointment.status);
    }

    portal.appointments.cancel(id).await?;
    println!("Appointment #{} cancelled.", id);
    Ok(())
}

pub async fn complete(portal: &Portal, id: i64, diagnosis: &str) -> Result<()> {
    portal.appointments.complete(id, diagnosis).await?;
    println!("Appointment #{} completed.", id);
    Ok(())
}

pub async fn availability(
    portal: &Portal,
    doctor: String,
    date: Option<NaiveDate>,
    time_of_day: Option<TimeOfDay>,
) -> Result<()> {
    let mut query = AvailabilityQuery::new(doctor);
    query.date = date;
    query.time_of_day = time_of_day;

    let result = portal.appointments.check_availability(&query).await?;
    if result.iter().all(|doctor| doctor.available_slots.is_empty()) {
        println!("No open slots.");
        return Ok(());
    }

    for doctor in &result {
        println!("{} (#{})", doctor.doctor_name, doctor.doctor_id);
        for slot in &doctor.available_slots {
            println!(
                "  {} - {}",
                slot.start_time.format("%Y-%m-%d %H:%M"),
                slot.end_time.format("%H:%M")
            );
        }
    }
    Ok(())
}

pub async fn stats(
    portal: &Portal,
    doctor_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let stats = portal.reports.get_stats(doctor_id, from, to).await?;
    let view = stats.view();

    println!("Total appointments: {}", stats.total);
    println!("  completed: {:>4}  ({})", stats.completed, view.format_rate(StatPart::Completed));
    println!("  scheduled: {:>4}  ({})", stats.scheduled, view.format_rate(StatPart::Scheduled));
    println!("  cancelled: {:>4}  ({})", stats.cancelled, view.format_rate(StatPart::Cancelled));
    Ok(())
}

pub async fn report(portal: &Portal, request: ReportRequest) -> Result<()> {
    let report = portal.reports.generate_report(&request).await?;
    let view = report.appointment_stats.view();

    println!("Report for {} ({})", report.doctor_name, report.report_date.format("%Y-%m-%d %H:%M"));
    println!(
        "Appointments: {} total, {} completed ({}), {} scheduled, {} cancelled",
        report.appointment_stats.total,
        report.appointment_stats.completed,
        view.format_rate(StatPart::Completed),
        report.appointment_stats.scheduled,
        report.appointment_stats.cancelled,
    );

    if let Some(days) = &report.daily_breakdown {
        println!("Daily breakdown:");
        for day in days {
            println!("  {}  {}", day.date, day.count);
        }
    }

    if !report.conditions().is_empty() {
        println!("Common conditions:");
        for condition in report.conditions() {
            println!("  {:<24} {}", condition.condition, condition.count);
        }
    }

    println!();
    println!("{}", report.summary);
    Ok(())
}

pub async fn chat(portal: &Portal, user: PortalUser) -> Result<()> {
    let backend = Arc::new(RemoteAssistant::new(portal.client.clone()));
    let session = ConversationSession::new(backend, Some(user));
    debug!("Started conversation {}", session.id());

    println!("Ask the assistant anything. /clear starts over, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_session();
                println!("Conversation cleared.");
            }
            text => match session.submit_turn(text).await {
                Ok(reply) => println!("{}", reply.content),
                Err(ChatError::Api(e)) if e.is_auth() => {
                    warn!("Chat stopped: {}", e);
                    anyhow::bail!("Session expired, sign in again");
                }
                Err(ChatError::Api(_)) => {
                    // The session has already recorded the failure for display.
                    if let Some(turn) = session.display().last() {
                        println!("{}", turn.content);
                    }
                }
                Err(e) => println!("{}", e),
            },
        }
    }

    Ok(())
}
