//! Handshake probing for adapter detection
//!
//! This module writes each family's identification frame to a serial
//! stream and watches the replies to decide whether a Zigbee adapter is
//! present and which firmware family it runs.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tokio_serial::{ClearBuffer, FlowControl, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

use crate::adapter::{Adapter, AdapterKind, AutoDetect};
use crate::config::DetectConfig;
use crate::error::DetectError;
use crate::fingerprint::Fingerprint;

/// Replies longer than this without a match are treated as noise
const MAX_REPLY_LEN: usize = 256;

/// Fingerprint prober for a single open stream
pub struct HandshakeProber {
    response_timeout: Duration,
}

impl HandshakeProber {
    /// Create a prober that waits `response_timeout` for each reply
    pub fn new(response_timeout: Duration) -> Self {
        Self { response_timeout }
    }

    /// Probe a stream to detect any connected adapter
    pub async fn probe<S>(&self, stream: &mut S) -> Option<AdapterKind>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        for fingerprint in Fingerprint::ALL {
            if self.try_fingerprint(stream, fingerprint).await {
                return Some(fingerprint.kind());
            }
        }

        debug!("No adapter detected (tried all fingerprints)");
        None
    }

    async fn try_fingerprint<S>(&self, stream: &mut S, fingerprint: Fingerprint) -> bool
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = fingerprint.request();
        trace!("Sending {:?} probe: {:02X?}", fingerprint, request);

        if let Err(e) = stream.write_all(&request).await {
            warn!("Failed to write {:?} probe: {}", fingerprint, e);
            return false;
        }

        let deadline = Instant::now() + self.response_timeout;
        let mut reply = Vec::new();
        let mut buf = [0u8; 64];

        loop {
            match timeout_at(deadline, stream.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => {
                    reply.extend_from_slice(&buf[..n]);
                    trace!("{:?} reply so far: {:02X?}", fingerprint, reply);
                    if fingerprint.matches(&reply) {
                        return true;
                    }
                    if reply.len() > MAX_REPLY_LEN {
                        trace!("{:?} reply too long, giving up", fingerprint);
                        return false;
                    }
                }
                Ok(Ok(_)) => {
                    trace!("Stream closed during {:?} probe", fingerprint);
                    return false;
                }
                Ok(Err(e)) => {
                    trace!("{:?} read error: {}", fingerprint, e);
                    return false;
                }
                Err(_) => {
                    trace!("{:?} probe timeout", fingerprint);
                    return false;
                }
            }
        }
    }
}

/// Auto-detect backend that probes a local serial device
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialAutoDetect;

impl SerialAutoDetect {
    pub fn new() -> Self {
        Self
    }
}

impl AutoDetect for SerialAutoDetect {
    type Adapter = SerialAdapter;

    async fn auto_detect(
        &self,
        port: &Path,
        config: &DetectConfig,
    ) -> Result<Option<SerialAdapter>, DetectError> {
        let port_name = port.to_string_lossy().into_owned();

        match timeout(config.timeout, scan_baud_rates(&port_name, config)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Detection on {} hit the {:?} deadline", port_name, config.timeout);
                Err(DetectError::Timeout {
                    timeout_ms: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
                    port: port_name,
                })
            }
        }
    }
}

async fn scan_baud_rates(
    port: &str,
    config: &DetectConfig,
) -> Result<Option<SerialAdapter>, DetectError> {
    let prober = HandshakeProber::new(config.response_timeout);

    for &baud_rate in &config.baud_rates {
        debug!("Probing {} at {} baud", port, baud_rate);

        let mut stream = open_port(port, baud_rate, config.rtscts)?;

        // Give the port a moment to settle, then drop whatever the adapter
        // printed on its own before we started talking
        tokio::time::sleep(config.settle_delay).await;
        if let Err(e) = stream.clear(ClearBuffer::Input) {
            trace!("Could not clear input on {}: {}", port, e);
        }

        if let Some(kind) = prober.probe(&mut stream).await {
            info!("Identified {} adapter on {} at {} baud", kind, port, baud_rate);
            return Ok(Some(SerialAdapter {
                port: port.to_string(),
                kind,
                baud_rate,
                stream: Some(stream),
            }));
        }
    }

    debug!(
        "No Zigbee adapter on {} (tried {} baud rates)",
        port,
        config.baud_rates.len()
    );
    Ok(None)
}

fn open_port(port: &str, baud_rate: u32, rtscts: bool) -> Result<SerialStream, DetectError> {
    let flow_control = if rtscts {
        FlowControl::Hardware
    } else {
        FlowControl::None
    };

    tokio_serial::new(port, baud_rate)
        .flow_control(flow_control)
        .timeout(Duration::from_millis(100))
        .open_native_async()
        .map_err(|e| {
            warn!("Failed to open {}: {}", port, e);
            DetectError::from_open(port, e)
        })
}

/// An adapter identified on a local serial port
pub struct SerialAdapter {
    port: String,
    kind: AdapterKind,
    baud_rate: u32,
    stream: Option<SerialStream>,
}

impl Adapter for SerialAdapter {
    fn kind(&self) -> Option<AdapterKind> {
        Some(self.kind.clone())
    }

    fn baud_rate(&self) -> Option<u32> {
        Some(self.baud_rate)
    }

    async fn stop(&mut self) -> Option<Result<(), DetectError>> {
        let Some(mut stream) = self.stream.take() else {
            return Some(Ok(()));
        };

        let result = stream
            .flush()
            .await
            .map_err(|e| DetectError::io(&self.port, &e));
        debug!("Closed {}", self.port);
        Some(result)
    }
}
