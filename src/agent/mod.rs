//! Vehicle-side telemetry pipeline: read sensor captures, aggregate per tick,
//! classify road state, and uplink batches to the store.

pub mod aggregator;
pub mod classifier;
pub mod datasource;
pub mod uplink;

use crate::config::AgentConfig;
use crate::domain::ProcessedAgentData;
use anyhow::Result;
use datasource::FileDatasource;
use std::time::Duration;
use tracing::{error, info};
use uplink::UplinkClient;

/// Runs the pipeline to completion: one capture read up front, then one batch
/// delivered per timer tick until the data set is exhausted.
///
/// A batch that still fails after the uplink's bounded retries is dropped
/// with an error log; later batches are unaffected.
pub async fn run(config: &AgentConfig) -> Result<()> {
    let source = FileDatasource::new(
        &config.accelerometer_file,
        &config.gps_file,
        &config.parking_file,
    );
    let readings = source.read()?;

    let aggregated = aggregator::aggregate(
        &readings.accelerometer,
        &readings.gps,
        &readings.parking,
        config.user_id,
    );

    let processed: Vec<ProcessedAgentData> = aggregated
        .into_iter()
        .map(|agent_data| ProcessedAgentData {
            road_state: classifier::classify(&agent_data),
            agent_data,
        })
        .collect();

    info!(
        records = processed.len(),
        batch_size = config.batch_size,
        "pipeline loaded; starting delivery"
    );

    let client = UplinkClient::new(
        &config.store_url,
        config.retry_attempts,
        Duration::from_millis(config.retry_delay_ms),
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));
    let mut delivered = 0usize;
    let mut dropped = 0usize;

    for batch in processed.chunks(config.batch_size.max(1)) {
        ticker.tick().await;
        match client.send(batch).await {
            Ok(()) => {
                delivered += batch.len();
                info!(batch = batch.len(), total = delivered, "batch delivered");
            }
            Err(e) => {
                dropped += batch.len();
                error!(batch = batch.len(), error = %e, "dropping batch after retries");
            }
        }
    }

    info!(delivered, dropped, "pipeline finished");
    Ok(())
}
