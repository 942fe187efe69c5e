//! Adapter handles and the auto-detect boundary
//!
//! A detection backend implements [`AutoDetect`] and hands back something
//! implementing [`Adapter`]. Callers only ever depend on these two traits, so
//! the serial backend in [`crate::probe`] can be swapped for a stub in tests.

use std::fmt;
use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DetectConfig;
use crate::error::DetectError;

/// Zigbee adapter families a backend can identify
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Silicon Labs EmberZNet serial protocol (legacy driver)
    Ezsp,
    /// Texas Instruments Z-Stack monitor-and-test protocol
    Znp,
    /// dresden elektronik ConBee/RaspBee
    Deconz,
    /// ZiGate USB/PiZiGate
    Zigate,
    /// Silicon Labs EmberZNet serial protocol (current driver)
    Ember,
    /// Backend-specific type name with no friendly equivalent
    Other(String),
}

impl AdapterKind {
    /// Resolve a backend's adapter type name (e.g. `EzspAdapter`)
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "EzspAdapter" => Self::Ezsp,
            "ZnpAdapter" => Self::Znp,
            "DeconzAdapter" => Self::Deconz,
            "ZiGateAdapter" => Self::Zigate,
            "EmberAdapter" => Self::Ember,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable family label, or the raw type name for unknown kinds
    pub fn friendly_name(&self) -> &str {
        match self {
            Self::Ezsp => "EZSP",
            Self::Znp => "ZNP",
            Self::Deconz => "deCONZ",
            Self::Zigate => "ZiGate",
            Self::Ember => "Ember",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly_name())
    }
}

/// Network the adapter is currently commissioned on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    #[serde(rename = "panID")]
    pub pan_id: u16,
    /// Hex string, `0x` prefixed
    #[serde(rename = "extendedPanID")]
    pub extended_pan_id: String,
    pub channel: u8,
}

/// A live handle to an identified adapter
///
/// The optional capabilities return `None` when the adapter does not expose
/// them at all, and `Some(Err(_))` when it does but the call failed.
pub trait Adapter: Send {
    /// Concrete family of this adapter, if it can identify itself
    fn kind(&self) -> Option<AdapterKind>;

    /// Baud rate the adapter answered at, when known
    fn baud_rate(&self) -> Option<u32> {
        None
    }

    /// Query the network parameters the adapter is running with
    fn network_parameters(
        &mut self,
    ) -> impl Future<Output = Option<Result<NetworkParameters, DetectError>>> + Send {
        async { None }
    }

    /// Stop the adapter and release the underlying device
    fn stop(&mut self) -> impl Future<Output = Option<Result<(), DetectError>>> + Send {
        async { None }
    }
}

/// Something that can try to identify an adapter behind a device path
pub trait AutoDetect {
    type Adapter: Adapter;

    /// Probe `port` using `config`
    ///
    /// `Ok(None)` means every candidate was tried and nothing answered.
    fn auto_detect(
        &self,
        port: &Path,
        config: &DetectConfig,
    ) -> impl Future<Output = Result<Option<Self::Adapter>, DetectError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_type_names_resolve_to_friendly_names() {
        let table = [
            ("EzspAdapter", "EZSP"),
            ("ZnpAdapter", "ZNP"),
            ("DeconzAdapter", "deCONZ"),
            ("ZiGateAdapter", "ZiGate"),
            ("EmberAdapter", "Ember"),
        ];
        for (raw, friendly) in table {
            assert_eq!(AdapterKind::from_type_name(raw).friendly_name(), friendly);
        }
    }

    #[test]
    fn test_unknown_type_name_passes_through() {
        let kind = AdapterKind::from_type_name("BlzAdapter");
        assert_eq!(kind, AdapterKind::Other("BlzAdapter".to_string()));
        assert_eq!(kind.to_string(), "BlzAdapter");
    }

    #[test]
    fn test_network_parameters_wire_names() {
        let params = NetworkParameters {
            pan_id: 0x1a62,
            extended_pan_id: "0xdddddddddddddddd".to_string(),
            channel: 11,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(
            json,
            r#"{"panID":6754,"extendedPanID":"0xdddddddddddddddd","channel":11}"#
        );
    }
}
