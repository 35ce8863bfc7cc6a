//! Test helpers for haptics-engine integration tests
//!
//! Provides:
//! - TestRig: engine on a simulated backend plus a temporary asset root
//! - Event waiting with timeout
//! - Journal queries

#![allow(dead_code)]

use haptics_common::config::EngineConfig;
use haptics_common::events::EngineEvent;
use haptics_engine::asset::FsAssetSource;
use haptics_engine::backend::{BackendCall, SimulatedBackend};
use haptics_engine::HapticEngine;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Upper bound for anything a test waits on
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

/// Minimal external pattern with one transient and one continuous event
pub const SAMPLE_AHAP: &str = r#"{
    "Version": 1.0,
    "Pattern": [
        { "Event": { "Time": 0.0, "EventType": "HapticTransient",
            "EventParameters": [ { "ParameterID": "HapticIntensity", "ParameterValue": 1.0 } ] } },
        { "Event": { "Time": 0.1, "EventType": "HapticContinuous", "EventDuration": 0.2,
            "EventParameters": [ { "ParameterID": "HapticIntensity", "ParameterValue": 0.5 } ] } }
    ]
}"#;

/// Engine wired to a simulated backend
pub struct TestRig {
    pub engine: HapticEngine,
    pub backend: SimulatedBackend,
    pub assets: TempDir,
}

impl TestRig {
    /// Rig with default configuration
    pub fn new(backend: SimulatedBackend) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: SimulatedBackend, config: EngineConfig) -> Self {
        let assets = TempDir::new().expect("Failed to create asset dir");
        let engine = HapticEngine::new(
            Arc::new(backend.clone()),
            Arc::new(FsAssetSource::new(assets.path())),
            config,
        )
        .expect("Failed to create engine");
        Self {
            engine,
            backend,
            assets,
        }
    }

    /// Write a file under the asset root
    pub fn write_asset(&self, name: &str, content: &str) {
        std::fs::write(self.assets.path().join(name), content).expect("Failed to write asset");
    }

    pub fn journal(&self) -> Vec<BackendCall> {
        self.backend.journal()
    }
}

/// Full-tier backend that never completes on its own
pub fn manual_backend() -> SimulatedBackend {
    SimulatedBackend::new().with_auto_complete(false)
}

/// Durations from millisecond values
pub fn ms(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|&v| Duration::from_millis(v)).collect()
}

/// Index of the first journal entry matching `pred`
pub fn position(journal: &[BackendCall], pred: impl Fn(&BackendCall) -> bool) -> Option<usize> {
    journal.iter().position(pred)
}

pub fn count(journal: &[BackendCall], pred: impl Fn(&BackendCall) -> bool) -> usize {
    journal.iter().filter(|c| pred(c)).count()
}

/// Wait for the first event matching `matches`, skipping others
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<EngineEvent>,
    mut matches: F,
) -> EngineEvent
where
    F: FnMut(&EngineEvent) -> bool,
{
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("Event bus closed"),
            }
        }
    })
    .await
    .expect("Timed out waiting for event")
}
