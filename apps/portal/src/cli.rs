use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use appointment_cell::{AppointmentStatus, TimeOfDay};

/// Command-line front end for the clinic portal.
#[derive(Parser)]
#[command(name = "clinic-portal", version, about)]
pub struct Cli {
    /// Account email
    #[arg(long, global = true, env = "PORTAL_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "PORTAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Backend base URL, overrides PORTAL_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and show the account
    Login,

    /// List appointments
    Appointments {
        #[arg(long)]
        doctor: Option<i64>,
        #[arg(long)]
        patient: Option<i64>,
        /// scheduled, completed or cancelled
        #[arg(long)]
        status: Option<AppointmentStatus>,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Only today's appointments for the signed-in doctor
        #[arg(long, conflicts_with_all = ["from", "to"])]
        today: bool,
    },

    /// Cancel an appointment
    Cancel {
        id: i64,
    },

    /// Complete a scheduled appointment with a diagnosis
    Complete {
        id: i64,
        #[arg(long)]
        diagnosis: String,
    },

    /// Look up a doctor's open slots
    Availability {
        /// Doctor name
        doctor: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// morning, afternoon, evening or HH:MM
        #[arg(long)]
        time_of_day: Option<TimeOfDay>,
    },

    /// Appointment counts for a doctor
    Stats {
        doctor_id: i64,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Generate a doctor report
    Report {
        doctor_id: i64,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        condition: Option<String>,
    },

    /// Talk to the assistant. `/clear` starts over, `/quit` exits.
    Chat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_appointments_filters() {
        let cli = Cli::try_parse_from([
            "clinic-portal", "appointments", "--doctor", "3", "--status", "scheduled",
            "--from", "2024-12-01", "--to", "2024-12-31",
        ]).unwrap();

        match cli.command {
            Commands::Appointments { doctor, status, from, today, .. } => {
                assert_eq!(doctor, Some(3));
                assert_eq!(status, Some(AppointmentStatus::Scheduled));
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 12, 1));
                assert!(!today);
            }
            _ => panic!("expected appointments command"),
        }
    }

    #[test]
    fn test_today_conflicts_with_range() {
        assert!(Cli::try_parse_from([
            "clinic-portal", "appointments", "--today", "--from", "2024-12-01",
        ]).is_err());
    }

    #[test]
    fn test_parse_availability_time() {
        let cli = Cli::try_parse_from([
            "clinic-portal", "availability", "Jane Smith", "--time-of-day", "afternoon",
        ]).unwrap();

        match cli.command {
            Commands::Availability { doctor, time_of_day, .. } => {
                assert_eq!(doctor, "Jane Smith");
                assert_eq!(time_of_day, Some(TimeOfDay::Afternoon));
            }
            _ => panic!("expected availability command"),
        }
    }
}
