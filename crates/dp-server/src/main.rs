use clap::Parser;
use dp_server::audit::{AuditEntry, AuditEventType, AuditLogger};
use dp_server::config::Config;
use dp_server::metrics::PipelineMetrics;
use dp_server::pipeline::PipelineDriver;
use dp_server::router::{CrlEndpointValidator, Router};
use dp_server::storage::{self, ResponseProcessor};
use dp_server::{health, metrics};
use sas_proto::revocation::CrlValidator;
use sqlx::postgres::PgPoolOptions;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CBRS Domain Proxy worker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "domain-proxy")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit (doesn't start the worker)
    #[arg(short, long)]
    validate: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load or create configuration (logging comes up after the level is known)
    let config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing_subscriber::registry()
                .with(EnvFilter::new("info"))
                .with(tracing_subscriber::fmt::layer())
                .init();

            if cli.validate {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(1);
            }

            warn!("Could not load config file from: {}", cli.config_path);
            info!("Creating example configuration at: {}", cli.config_path);

            let example_config = Config::example();
            if let Err(e) = example_config.to_file(&cli.config_path) {
                error!("Error creating example config: {}", e);
                process::exit(1);
            }

            info!("Please edit {} and restart the worker", cli.config_path);
            process::exit(0);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully");
        println!();
        println!("Configuration summary:");
        println!("  SAS: {}", config.sas_url);
        println!("  Radio Controller: {}", config.rc_ingest_url);
        println!("  Processing limit: {}", config.request_processing_limit);
        println!("  Poll interval: {}s", config.poll_interval_secs);
        println!("  Revocation checking: {}", config.check_revocation);
        println!("  TLS verification: {}", config.ssl_verify);
        if let Some(ref listen) = config.monitoring_listen {
            println!("  Monitoring: {}", listen);
        }
        process::exit(0);
    }

    let log_level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        sas_url = %config.sas_url,
        "Starting Domain Proxy worker"
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    storage::migrate(&pool).await?;
    info!("Database schema ready");

    let metrics = Arc::new(PipelineMetrics::new());
    let audit = Arc::new(AuditLogger::new(config.audit_log_path.clone())?);
    audit.log(AuditEntry::new(AuditEventType::ServerStart)).await;

    let mut router = Router::new(
        &config.sas_url,
        &config.rc_ingest_url,
        config.request_mapping()?,
        config.tls_options()?,
        Duration::from_secs(config.request_timeout_secs),
        metrics.clone(),
    )?;

    if config.check_revocation {
        let validator = CrlValidator::new(config.crl.clone())?;
        router = router.with_validator(Arc::new(CrlEndpointValidator::new(validator)));
        info!("SAS certificate revocation checking enabled");
    }

    let processor = ResponseProcessor::new(config.grant_transitions()?);
    let driver = PipelineDriver::new(
        pool.clone(),
        router,
        processor,
        metrics.clone(),
        audit.clone(),
        config.request_processing_limit,
        Duration::from_secs(config.poll_interval_secs),
    );

    if let Some(listen) = config.monitoring_listen.clone() {
        let app = metrics::router(metrics.clone())
            .merge(health::router(pool.clone()))
            .layer(TraceLayer::new_for_http());
        let listener = tokio::net::TcpListener::bind(&listen).await?;
        info!(listen = %listen, "Monitoring listener started");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Monitoring listener failed: {}", e);
            }
        });
    }

    tokio::select! {
        _ = driver.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    audit.log(AuditEntry::new(AuditEventType::ServerStop)).await;
    info!("Domain Proxy worker stopped");
    Ok(())
}
