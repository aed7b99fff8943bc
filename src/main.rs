mod broadcast;
mod config;
mod db;
mod error;
mod gateway;
mod geo;
mod kafka;
mod models;
mod processor;
#[cfg(test)]
mod testing;

use broadcast::coordinator::BroadcastCoordinator;
use broadcast::dispatcher::ChannelDispatcher;
use broadcast::pool::WorkerPool;
use broadcast::recipients::GeoRecipientIndex;
use broadcast::suppression::WindowSuppressionStore;
use config::AppConfig;
use db::pg::PgPersistence;
use db::Persistence;
use gateway::email::HttpEmail;
use gateway::twilio::TwilioSms;
use processor::message_processor::Intake;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Disaster Broadcast Service...");

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    let pg = PgPersistence::new(pool);
    pg.ensure_schema().await?;
    let persistence: Arc<dyn Persistence> = Arc::new(pg);
    info!("Connected to database");

    // Gateways
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    if config.twilio.account_sid.is_empty() {
        warn!("TWILIO_ACCOUNT_SID is not set, SMS sends will be rejected by the gateway");
    }
    let sms = Arc::new(TwilioSms::new(http.clone(), config.twilio.clone()));
    let email = Arc::new(HttpEmail::new(http, config.email.clone()));

    // Broadcast engine
    let policy = config.policy.clone();
    let workers = WorkerPool::new(policy.worker_pool_size);
    info!(
        workers = workers.size(),
        suppression_radius_km = policy.suppression_radius_km,
        suppression_hours = policy.suppression_duration.num_hours(),
        dispatch_radius_km = policy.dispatch_radius_km,
        notification_radius_km = policy.notification_radius_km,
        "Broadcast policy loaded"
    );

    let coordinator = BroadcastCoordinator::new(
        policy.clone(),
        Arc::new(WindowSuppressionStore::new(
            persistence.clone(),
            policy.suppression_radius_km,
            policy.suppression_duration,
        )),
        Arc::new(GeoRecipientIndex::new(persistence.clone())),
        Arc::new(
            ChannelDispatcher::new(sms, email, policy.send_timeout)
                .with_country_code(config.twilio.default_country_code.clone()),
        ),
        persistence.clone(),
        workers,
    );

    // Start Kafka
    kafka::start_kafka_consumer(&config, Intake { persistence, coordinator }).await?;

    Ok(())
}
