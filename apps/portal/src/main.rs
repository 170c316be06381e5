use std::sync::Arc;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod handlers;

use cli::{Cli, Commands};
use handlers::{AppointmentsArgs, Portal};
use report_cell::ReportRequest;
use shared_api::{PortalClient, SessionContext};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::from_env();
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    info!("Using portal backend at {}", config.api_base_url);

    let client = Arc::new(PortalClient::new(&config, SessionContext::shared()));
    let portal = Portal::new(client);

    let user = portal.sign_in(cli.email.as_deref(), cli.password.as_deref()).await?;

    let result = match cli.command {
        Commands::Login => handlers::login(&portal).await,
        Commands::Appointments { doctor, patient, status, from, to, today } => {
            let args = AppointmentsArgs { doctor, patient, status, from, to, today };
            handlers::appointments(&portal, &user, args).await
        }
        Commands::Cancel { id } => handlers::cancel(&portal, id).await,
        Commands::Complete { id, diagnosis } => handlers::complete(&portal, id, &diagnosis).await,
        Commands::Availability { doctor, date, time_of_day } => {
            handlers::availability(&portal, doctor, date, time_of_day).await
        }
        Commands::Stats { doctor_id, from, to } => handlers::stats(&portal, doctor_id, from, to).await,
        Commands::Report { doctor_id, from, to, condition } => {
            let mut request = ReportRequest::for_doctor(doctor_id).between(from, to);
            request.condition = condition;
            handlers::report(&portal, request).await
        }
        Commands::Chat => handlers::chat(&portal, user).await,
    };

    portal.auth.logout().await;
    result
}
