//! Command-line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;
use zb_detect::{DetectConfig, DEFAULT_BAUD_RATES};

/// Usage line reported in JSON when the arguments are unusable
pub const USAGE: &str = "zb-probe <serial_port>";

/// Probe one serial device for a Zigbee adapter and print the result as JSON
#[derive(Debug, Parser)]
#[command(name = "zb-probe")]
#[command(version)]
pub struct Cli {
    /// Serial device to probe (e.g. /dev/ttyUSB0)
    pub port: Option<PathBuf>,

    /// Upper bound for the detection call, in milliseconds
    #[arg(long, env = "ZB_PROBE_TIMEOUT_MS", default_value_t = 15000)]
    pub timeout_ms: u64,

    /// Hard limit for the whole process, in milliseconds from start
    #[arg(long, env = "ZB_PROBE_WATCHDOG_MS", default_value_t = 30000)]
    pub watchdog_ms: u64,

    /// Baud rates to try, in order
    #[arg(
        long = "baud",
        env = "ZB_PROBE_BAUD_RATES",
        value_delimiter = ',',
        default_values_t = DEFAULT_BAUD_RATES
    )]
    pub baud_rates: Vec<u32>,

    /// Enable RTS/CTS hardware flow control
    #[arg(long, env = "ZB_PROBE_RTSCTS", value_parser = BoolishValueParser::new())]
    pub rtscts: bool,

    /// Log probe progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Detection configuration derived from the flags
    pub fn detect_config(&self) -> DetectConfig {
        DetectConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            baud_rates: self.baud_rates.clone(),
            rtscts: self.rtscts,
            ..DetectConfig::default()
        }
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }
}

/// First line of a clap error without its `error: ` prefix
pub fn parse_error_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}
