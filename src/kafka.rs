use crate::config::AppConfig;
use crate::processor::message_processor::{self, Intake};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Consumes alert submissions until Ctrl-C, then waits for in-flight
/// broadcasts so every started dispatch unit is aggregated and persisted.
pub async fn start_kafka_consumer(config: &AppConfig, intake: Intake) -> anyhow::Result<()> {
    info!("Initializing Kafka consumer for topic: {}", config.kafka_topic);

    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_bootstrap_servers)
        .set("group.id", &config.kafka_group_id)
        .set("auto.offset.reset", &config.kafka_auto_offset_reset)
        // SASL Configuration
        .set("security.protocol", &config.kafka_security_protocol)
        .set("sasl.mechanism", &config.kafka_sasl_mechanism)
        .set("sasl.username", &config.kafka_username)
        .set("sasl.password", &config.kafka_password);

    let consumer: StreamConsumer = client_config.create()?;

    consumer.subscribe(&[&config.kafka_topic])?;
    info!("Subscribed to topic: {}", config.kafka_topic);

    let intake = Arc::new(intake);
    let mut in_flight = JoinSet::new();
    let mut consecutive_failures = 0;
    let max_retries = config.kafka_max_retries;
    let cooldown_duration = Duration::from_secs(config.kafka_circuit_breaker_cooldown);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        // Circuit Breaker Check
        if consecutive_failures >= max_retries {
            warn!(
                "Circuit breaker tripped ({} consecutive failures)! Sleeping for {} seconds...",
                consecutive_failures,
                config.kafka_circuit_breaker_cooldown
            );
            tokio::select! {
                _ = tokio::time::sleep(cooldown_duration) => {}
                _ = &mut shutdown => break,
            }
            consecutive_failures = 0;
            info!("Circuit breaker reset. Resuming consumption.");
        }

        let received = tokio::select! {
            r = consumer.recv() => r,
            _ = &mut shutdown => break,
            // Reap finished broadcasts so the set doesn't grow unbounded.
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Broadcast task failed: {}", e);
                }
                continue;
            }
        };

        match received {
            Ok(m) => {
                consecutive_failures = 0;

                let payload = match m.payload() {
                    None => {
                        warn!("Received empty payload from Kafka");
                        continue;
                    }
                    Some(p) => p.to_vec(),
                };

                let intake = intake.clone();
                in_flight.spawn(async move {
                    if let Err(e) = message_processor::process_message(&intake, &payload).await {
                        error!("Error processing alert submission: {}", e);
                    }
                });
            }
            Err(e) => {
                error!(
                    "Kafka error: {}. Incrementing failure count ({} / {})",
                    e,
                    consecutive_failures + 1,
                    max_retries
                );
                consecutive_failures += 1;

                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    info!(in_flight = in_flight.len(), "Shutdown requested, draining in-flight broadcasts");
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Broadcast task failed during shutdown: {}", e);
        }
    }
    info!("All broadcasts finalized");

    Ok(())
}
