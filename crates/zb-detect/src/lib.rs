//! Zigbee Adapter Detection Library
//!
//! This crate defines the boundary between a caller that wants to know
//! "is there a Zigbee adapter on this serial port?" and the backend that
//! answers it, plus a built-in backend that fingerprints EZSP and Z-Stack
//! firmware over a local serial device.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zb_detect::{Adapter, AutoDetect, DetectConfig, SerialAutoDetect};
//!
//! # async fn run() -> Result<(), zb_detect::DetectError> {
//! let config = DetectConfig::default();
//! if let Some(mut adapter) = SerialAutoDetect::new()
//!     .auto_detect(Path::new("/dev/ttyUSB0"), &config)
//!     .await?
//! {
//!     println!("Found {:?}", adapter.kind());
//!     adapter.stop().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod probe;

pub use adapter::{Adapter, AdapterKind, AutoDetect, NetworkParameters};
pub use config::{DetectConfig, DEFAULT_BAUD_RATES};
pub use error::DetectError;
pub use probe::{HandshakeProber, SerialAdapter, SerialAutoDetect};
