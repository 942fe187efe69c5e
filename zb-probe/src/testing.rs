//! Stub detection backend for tests

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use zb_detect::{Adapter, AdapterKind, AutoDetect, DetectConfig, DetectError, NetworkParameters};

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return an adapter reporting this backend type name
    Found(String),
    /// Return an adapter that cannot tell what it is
    FoundUnidentified,
    Nothing,
    Fails(String),
    Busy,
    Hangs,
    /// Block the calling thread, as a stuck device close would
    Blocks(Duration),
    Panics,
}

#[derive(Debug, Clone)]
pub enum NetworkBehavior {
    Unsupported,
    Returns(NetworkParameters),
    Fails,
}

pub struct StubDetector {
    behavior: Behavior,
    network: NetworkBehavior,
    stop_fails: bool,
    calls: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
}

impl StubDetector {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            network: NetworkBehavior::Unsupported,
            stop_fails: false,
            calls: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn found(type_name: &str) -> Self {
        Self::new(Behavior::Found(type_name.to_string()))
    }

    pub fn with_network(mut self, network: NetworkBehavior) -> Self {
        self.network = network;
        self
    }

    pub fn with_failing_stop(mut self) -> Self {
        self.stop_fails = true;
        self
    }

    /// Number of `auto_detect` calls made so far
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Set once any returned adapter has been stopped
    pub fn stopped(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    fn adapter(&self, kind: Option<AdapterKind>) -> StubAdapter {
        StubAdapter {
            kind,
            network: self.network.clone(),
            stop_fails: self.stop_fails,
            stopped: Arc::clone(&self.stopped),
        }
    }
}

impl AutoDetect for StubDetector {
    type Adapter = StubAdapter;

    async fn auto_detect(
        &self,
        port: &Path,
        _config: &DetectConfig,
    ) -> Result<Option<StubAdapter>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Found(type_name) => {
                Ok(Some(self.adapter(Some(AdapterKind::from_type_name(type_name)))))
            }
            Behavior::FoundUnidentified => Ok(Some(self.adapter(None))),
            Behavior::Nothing => Ok(None),
            Behavior::Fails(message) => Err(DetectError::Backend(message.clone())),
            Behavior::Busy => Err(DetectError::PortBusy(port.display().to_string())),
            Behavior::Hangs => std::future::pending().await,
            Behavior::Blocks(duration) => {
                std::thread::sleep(*duration);
                Ok(None)
            }
            Behavior::Panics => panic!("stub detector exploded"),
        }
    }
}

pub struct StubAdapter {
    kind: Option<AdapterKind>,
    network: NetworkBehavior,
    stop_fails: bool,
    stopped: Arc<AtomicBool>,
}

impl Adapter for StubAdapter {
    fn kind(&self) -> Option<AdapterKind> {
        self.kind.clone()
    }

    async fn network_parameters(&mut self) -> Option<Result<NetworkParameters, DetectError>> {
        match &self.network {
            NetworkBehavior::Unsupported => None,
            NetworkBehavior::Returns(params) => Some(Ok(params.clone())),
            NetworkBehavior::Fails => Some(Err(DetectError::Backend(
                "getNetworkParameters: ZCL timeout".to_string(),
            ))),
        }
    }

    async fn stop(&mut self) -> Option<Result<(), DetectError>> {
        self.stopped.store(true, Ordering::SeqCst);
        if self.stop_fails {
            Some(Err(DetectError::Backend("port already closed".to_string())))
        } else {
            Some(Ok(()))
        }
    }
}
