use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal::middleware::session::{SessionClaims, SessionKeys};
use portal::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // OTLP export only when an endpoint is configured
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "portal"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "portal=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let args = cli::Cli::parse();
    let cfg = config::load()?;

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Session { command }) => handle_session_command(&cfg, command),
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        tracing::error!("fatal: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!(config = ?cfg, "starting portal");
    let sweep_every = cfg.csrf_sweep_interval;
    let state = Arc::new(AppState::new(cfg)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = jobs::sweep::spawn(state.clone(), sweep_every, shutdown_rx);
    tracing::info!(every_secs = sweep_every.as_secs(), "csrf sweep job started");

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("portal listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!("sweep job ended abnormally: {}", e);
    }
    tracing::info!("portal stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

fn handle_session_command(
    cfg: &config::Config,
    cmd: cli::SessionCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::SessionCommands::Mint {
            user_id,
            email,
            roles,
            permissions,
            ttl,
        } => {
            let keys = SessionKeys::from_secret(cfg.session_secret.as_bytes());
            let mut claims = SessionClaims::new(user_id, ttl);
            claims.email = email;
            claims.roles = roles.unwrap_or_default();
            claims.permissions = permissions.unwrap_or_default();

            let jwt = keys.mint(&claims)?;
            println!(
                "Session minted:\n  Subject: {}\n  Expires: {}\n  Use:     Authorization: Bearer {}",
                claims.sub, claims.exp, jwt
            );
        }
    }
    Ok(())
}
