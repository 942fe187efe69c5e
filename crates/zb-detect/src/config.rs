//! Detection configuration

use std::time::Duration;

/// Baud rates tried when none are configured, in order
pub const DEFAULT_BAUD_RATES: [u32; 5] = [115200, 38400, 57600, 9600, 19200];

/// Configuration for a single auto-detect call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectConfig {
    /// Upper bound for the whole detection call
    pub timeout: Duration,
    /// Baud rates to try, in order
    pub baud_rates: Vec<u32>,
    /// Use RTS/CTS hardware flow control
    pub rtscts: bool,
    /// Timeout for each fingerprint reply
    pub response_timeout: Duration,
    /// Delay after opening the port before the first write
    pub settle_delay: Duration,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15000),
            baud_rates: DEFAULT_BAUD_RATES.to_vec(),
            rtscts: false,
            response_timeout: Duration::from_millis(500),
            settle_delay: Duration::from_millis(50),
        }
    }
}
