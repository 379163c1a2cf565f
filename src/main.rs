use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gtrack_functions::api::{self, AppState, SecurityConfig};
use gtrack_functions::db::Database;
use gtrack_functions::delivery::{
    DisabledPush, DisabledSms, HttpPush, PushSink, SmsSink, TwilioSms,
};
use gtrack_functions::dispatch::{CooldownTracker, DispatchConfig, ProximityDispatcher};
use gtrack_functions::recovery::{RecoveryConfig, RecoveryService};

#[derive(Parser)]
#[command(name = "gtrackd")]
#[command(about = "Proximity notification and account-recovery backend for G-Track")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the G-Track backend server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "gtrack_functions=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn push_sink_from_env() -> Arc<dyn PushSink> {
    match HttpPush::from_env() {
        Some(push) => Arc::new(push),
        None => {
            tracing::warn!("push gateway not configured, notifications will fail per-send");
            Arc::new(DisabledPush)
        }
    }
}

fn sms_sink_from_env() -> Arc<dyn SmsSink> {
    match TwilioSms::from_env() {
        Some(sms) => Arc::new(sms),
        None => {
            tracing::warn!("SMS gateway not configured, OTP sends will fail");
            Arc::new(DisabledSms)
        }
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let db = Database::open_default()?;
    db.migrate()?;

    let dispatcher = Arc::new(ProximityDispatcher::new(
        db.clone(),
        CooldownTracker::new(db.clone()),
        push_sink_from_env(),
        DispatchConfig::default(),
    ));
    let recovery = Arc::new(RecoveryService::new(
        db.clone(),
        sms_sink_from_env(),
        RecoveryConfig::default(),
    ));

    let state = AppState {
        db,
        dispatcher,
        recovery,
    };
    let app = api::create_router(state, SecurityConfig::from_env());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("G-Track backend listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting G-Track backend on port {}", port);
            serve(port).await?;
        }
        None => {
            // Default: start server
            tracing::info!("Starting G-Track backend on port 3000");
            serve(3000).await?;
        }
    }

    Ok(())
}
