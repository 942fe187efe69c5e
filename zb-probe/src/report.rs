//! JSON documents written by the probe and where they go

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use zb_detect::NetworkParameters;

use crate::cli::USAGE;
use crate::guard::PanicReport;

/// Outcome of probing one device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub port: String,
    pub is_zigbee: bool,
    pub adapter_type: Option<String>,
    pub error: Option<String>,
    #[serde(serialize_with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Outer `None`: the adapter has no network query. Inner `None`: the
    /// query failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_info: Option<Option<NetworkParameters>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
}

impl DetectionResult {
    /// A negative result for `port` stamped with the current time
    ///
    /// Non-UTF-8 bytes in `port` are replaced; callers reject such paths
    /// before probing so the echo stays exact.
    pub fn new(port: &Path) -> Self {
        Self {
            port: port.to_string_lossy().into_owned(),
            is_zigbee: false,
            adapter_type: None,
            error: None,
            timestamp: Utc::now(),
            network_info: None,
            baud_rate: None,
        }
    }
}

fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Diagnostic written to stderr on every failure path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub is_zigbee: bool,
}

impl ErrorReport {
    fn new(error: String) -> Self {
        Self {
            error,
            usage: None,
            stack: None,
            is_zigbee: false,
        }
    }

    pub fn usage(error: impl Into<String>) -> Self {
        Self {
            usage: Some(USAGE.to_string()),
            ..Self::new(error.into())
        }
    }

    pub fn missing_port(port: &Path) -> Self {
        Self::new(format!("Serial port {} does not exist", port.display()))
    }

    pub fn invalid_port(port: &Path) -> Self {
        Self::new(format!("Serial port {} is not valid UTF-8", port.display()))
    }

    pub fn uncaught(panic: PanicReport) -> Self {
        Self {
            stack: Some(panic.stack),
            ..Self::new(format!("Uncaught exception: {}", panic.message))
        }
    }

    pub fn unexpected(err: &anyhow::Error) -> Self {
        Self {
            stack: Some(format!("{err:?}")),
            ..Self::new(format!("Unexpected error: {err}"))
        }
    }

    pub fn rejected(reason: &str) -> Self {
        Self::new(format!("Unhandled rejection: {reason}"))
    }

    pub fn watchdog(limit: Duration) -> Self {
        Self::new(format!(
            "Detection timeout - process killed after {} seconds",
            limit.as_secs_f64()
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A serialized document, its destination, and the exit code to finish with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub stream: Stream,
    pub body: String,
    pub exit_code: i32,
}

impl Outcome {
    /// Completed detection: stdout, exit 0 only for a confirmed adapter
    pub fn from_result(result: &DetectionResult) -> serde_json::Result<Self> {
        Ok(Self {
            stream: Stream::Stdout,
            body: serde_json::to_string(result)?,
            exit_code: if result.is_zigbee { 0 } else { 1 },
        })
    }

    /// Any failure path: stderr, exit 1
    pub fn from_error(report: &ErrorReport) -> Self {
        let body = serde_json::to_string(report).unwrap_or_else(|_| {
            r#"{"error":"Unexpected error: failed to serialize report","isZigbee":false}"#
                .to_string()
        });
        Self {
            stream: Stream::Stderr,
            body,
            exit_code: 1,
        }
    }

    /// Write the document as one line and flush
    pub fn emit(&self) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => write_line(io::stdout().lock(), &self.body),
            Stream::Stderr => write_line(io::stderr().lock(), &self.body),
        }
    }
}

fn write_line(mut out: impl Write, body: &str) -> io::Result<()> {
    writeln!(out, "{body}")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn fixed_result() -> DetectionResult {
        DetectionResult {
            timestamp: Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap(),
            ..DetectionResult::new(Path::new("/dev/ttyUSB0"))
        }
    }

    #[test]
    fn test_negative_result_shape() {
        let outcome = Outcome::from_result(&fixed_result()).unwrap();
        assert_eq!(outcome.stream, Stream::Stdout);
        assert_eq!(outcome.exit_code, 1);

        let value: Value = serde_json::from_str(&outcome.body).unwrap();
        assert_eq!(
            value,
            json!({
                "port": "/dev/ttyUSB0",
                "isZigbee": false,
                "adapterType": null,
                "error": null,
                "timestamp": "2026-10-16T08:30:00.000Z",
            })
        );
    }

    #[test]
    fn test_network_info_absent_null_or_present() {
        let mut result = fixed_result();
        result.network_info = Some(None);
        let value: Value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["networkInfo"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("networkInfo"));

        result.network_info = Some(Some(NetworkParameters {
            pan_id: 0x1a62,
            extended_pan_id: "0xdddddddddddddddd".to_string(),
            channel: 15,
        }));
        let value: Value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["networkInfo"]["channel"], 15);
    }

    #[test]
    fn test_positive_result_exits_zero() {
        let result = DetectionResult {
            is_zigbee: true,
            adapter_type: Some("EZSP".to_string()),
            baud_rate: Some(115200),
            ..fixed_result()
        };
        let outcome = Outcome::from_result(&result).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.body.contains('\n'));
        assert!(outcome.body.contains(r#""baudRate":115200"#));
    }

    #[test]
    fn test_usage_report() {
        let outcome = Outcome::from_error(&ErrorReport::usage("No serial port specified"));
        assert_eq!(outcome.stream, Stream::Stderr);
        assert_eq!(outcome.exit_code, 1);
        let value: Value = serde_json::from_str(&outcome.body).unwrap();
        assert_eq!(
            value,
            json!({
                "error": "No serial port specified",
                "usage": "zb-probe <serial_port>",
                "isZigbee": false,
            })
        );
    }

    #[test]
    fn test_watchdog_message() {
        let report = ErrorReport::watchdog(Duration::from_secs(30));
        assert_eq!(
            report.error,
            "Detection timeout - process killed after 30 seconds"
        );
        assert!(report.stack.is_none());
    }

    #[test]
    fn test_unexpected_report_carries_context_chain() {
        let err = anyhow::anyhow!("disk on fire").context("serializing detection result");
        let report = ErrorReport::unexpected(&err);
        assert_eq!(report.error, "Unexpected error: serializing detection result");
        assert!(report.stack.unwrap().contains("disk on fire"));
    }
}
