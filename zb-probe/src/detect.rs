//! Detection flow: validate, call the backend, normalize its answer

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};
use zb_detect::{Adapter, AutoDetect, DetectConfig};

use crate::classify::classify_error;
use crate::report::{DetectionResult, ErrorReport, Outcome};

/// Validate `port` and probe it, producing the document to print
pub async fn probe_port<D>(
    detector: D,
    port: PathBuf,
    config: DetectConfig,
) -> anyhow::Result<Outcome>
where
    D: AutoDetect,
{
    // `port` is echoed back as a JSON string, which cannot carry it unchanged
    if port.to_str().is_none() {
        debug!("{} is not valid UTF-8, not probing", port.display());
        return Ok(Outcome::from_error(&ErrorReport::invalid_port(&port)));
    }

    if !port.exists() {
        debug!("{} does not exist, not probing", port.display());
        return Ok(Outcome::from_error(&ErrorReport::missing_port(&port)));
    }

    let result = detect(&detector, &port, &config).await;
    Outcome::from_result(&result).context("serializing detection result")
}

/// Run the backend against `port` and fold whatever happens into a result
pub async fn detect<D>(detector: &D, port: &Path, config: &DetectConfig) -> DetectionResult
where
    D: AutoDetect,
{
    let mut result = DetectionResult::new(port);

    match detector.auto_detect(port, config).await {
        Ok(Some(mut adapter)) => {
            result.is_zigbee = true;
            result.adapter_type = adapter.kind().map(|kind| kind.friendly_name().to_string());
            result.baud_rate = adapter.baud_rate();
            info!(
                "Zigbee adapter on {}: {}",
                result.port,
                result.adapter_type.as_deref().unwrap_or("unidentified")
            );

            // Best effort: a failed query is reported as null, never as an error
            result.network_info = match adapter.network_parameters().await {
                None => None,
                Some(Ok(params)) => Some(Some(params)),
                Some(Err(e)) => {
                    debug!("Ignoring network parameter failure on {}: {}", result.port, e);
                    Some(None)
                }
            };

            // Best effort: stop failures are dropped
            if let Some(Err(e)) = adapter.stop().await {
                debug!("Ignoring stop failure on {}: {}", result.port, e);
            }
        }
        Ok(None) => debug!("No Zigbee adapter recognized on {}", result.port),
        Err(e) => {
            debug!("Detection on {} failed: {}", result.port, e);
            result.error = Some(classify_error(&e));
        }
    }

    result
}
