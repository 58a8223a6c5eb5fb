use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::sync::Arc;

use paysync::config::Config;
use paysync::db::{create_pool, init_db, queries, AppState};
use paysync::gateway::GatewayClient;
use paysync::handlers;
use paysync::models::NewPaidOrder;
use paysync::reconcile::{DriftScanner, VerificationCorrector};

#[derive(Parser, Debug)]
#[command(name = "paysync")]
#[command(about = "Refund state reconciliation between access codes, orders and the payment gateway")]
struct Cli {
    /// Seed the database with a few paid orders (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Run one drift sweep, print the report and exit
    #[arg(long, conflicts_with = "verify_hours")]
    sweep: bool,

    /// Verify refunds from the last N hours, print the report and exit
    #[arg(long, value_name = "N")]
    verify_hours: Option<i64>,
}

fn seed_dev_data(state: &AppState) {
    let mut conn = match state.db.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!("Failed to get db connection for seeding: {}", e);
            return;
        }
    };

    let now = queries::now();
    let fixtures = [
        ("DEV-ORDER-001", 990, now - 3600),
        ("DEV-ORDER-002", 1990, now - 3 * 86_400),
        // Outside the default 7 day refund window
        ("DEV-ORDER-003", 2990, now - 10 * 86_400),
    ];

    for (order_number, amount_cents, paid_at) in fixtures {
        let input = NewPaidOrder {
            order_number: order_number.to_string(),
            amount_cents,
            paid_at,
            code: None,
        };
        match queries::record_paid_order(&mut conn, &input) {
            Ok(paid) => tracing::info!(
                "Seeded order {} with access code {}",
                paid.order.order_number,
                paid.access_code.code
            ),
            Err(e) => tracing::warn!("Skipped seeding {}: {}", order_number, e),
        }
    }
}

/// Spawns the periodic drift sweep and verification jobs that are enabled
/// in config. Each job waits one full interval before its first run.
fn spawn_reconcile_tasks(state: AppState) {
    if let Some(interval) = state.reconcile.drift_sweep_interval {
        let scanner = DriftScanner::from_state(&state);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = scanner.sweep().await {
                    tracing::warn!("Scheduled drift sweep failed: {}", e);
                }
            }
        });
        tracing::info!(
            "Background drift sweep started (runs every {}s)",
            interval.as_secs()
        );
    }

    if let Some(interval) = state.reconcile.verify_interval {
        let corrector = VerificationCorrector::from_state(&state);
        let window_hours = state.reconcile.verify_window_hours;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = corrector.verify(window_hours).await {
                    tracing::warn!("Scheduled verification failed: {}", e);
                }
            }
        });
        tracing::info!(
            "Background verification started (runs every {}s, window {}h)",
            interval.as_secs(),
            window_hours
        );
    }
}

fn print_report<T: serde::Serialize>(report: &T) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render report: {}", e),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paysync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if !config.gateway.is_configured() {
        tracing::warn!("GATEWAY_PID/GATEWAY_KEY not set: every gateway call will fail closed");
    }
    if config.operator_api_key.is_none() {
        tracing::warn!("OPERATOR_API_KEY not set: operator endpoints will reject all requests");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let gateway = GatewayClient::new(config.gateway.clone()).expect("Failed to build gateway client");

    let state = AppState {
        db: db_pool,
        gateway: Arc::new(gateway),
        reconcile: config.reconcile.clone(),
        operator_api_key: config.operator_api_key.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set PAYSYNC_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // One-shot operator commands (don't start server)
    if cli.sweep {
        match DriftScanner::from_state(&state).sweep().await {
            Ok(report) => print_report(&report),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }
    if let Some(hours) = cli.verify_hours {
        match VerificationCorrector::from_state(&state).verify(hours).await {
            Ok(report) => print_report(&report),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    spawn_reconcile_tasks(state.clone());

    let app = Router::new()
        .merge(handlers::router(state.clone(), config.refund_rate_limit_rpm))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("PaySync server listening on {}", addr);

    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
