//! Execution scenarios: named (backend, noise, shots) configurations.

use serde::{Deserialize, Serialize};

use qfuzz_core::HardwareErrorProfile;

use crate::error::Result;
use crate::noise_cache::NoiseProfileCache;
use crate::service::{NoiseProfile, NoiseProvider};

/// Scenario name for noiseless simulation.
pub const IDEAL: &str = "ideal";
/// Scenario name for noise-injected simulation.
pub const NOISY: &str = "noisy";
/// Scenario name for physical hardware.
pub const HARDWARE: &str = "hardware";

/// Whether a backend is a local simulator or remote hardware.
///
/// Decides the poll interval of the wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local or fast simulator.
    Simulator,
    /// Queued physical device.
    Hardware,
}

/// A named execution configuration. Scenarios are identified by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Grouping key in the feature table.
    pub name: String,
    /// Backend identifier handed to the execution service.
    pub backend: String,
    /// Simulator or hardware.
    pub kind: BackendKind,
    /// Noise model used to bias a simulated execution.
    pub noise: Option<NoiseProfile>,
    /// Calibration data whose averages are attached to feature records.
    pub calibration: Option<HardwareErrorProfile>,
    /// Shots per execution.
    pub shots: u32,
}

impl Scenario {
    /// Scenario with an arbitrary name.
    pub fn new(
        name: impl Into<String>,
        backend: impl Into<String>,
        kind: BackendKind,
        shots: u32,
    ) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            kind,
            noise: None,
            calibration: None,
            shots,
        }
    }

    /// Noiseless simulation on `simulator`.
    pub fn ideal(simulator: impl Into<String>, shots: u32) -> Self {
        Self::new(IDEAL, simulator, BackendKind::Simulator, shots)
    }

    /// Simulation on `simulator` biased by `profile`.
    ///
    /// The profile's properties, if any, become the scenario's calibration.
    pub fn noisy(simulator: impl Into<String>, profile: NoiseProfile, shots: u32) -> Self {
        let calibration = profile.properties.clone();
        Self {
            noise: Some(profile),
            calibration,
            ..Self::new(NOISY, simulator, BackendKind::Simulator, shots)
        }
    }

    /// Execution on the physical device `backend`.
    pub fn hardware(backend: impl Into<String>, shots: u32) -> Self {
        Self::new(HARDWARE, backend, BackendKind::Hardware, shots)
    }

    /// Attach calibration data for the hardware error columns.
    pub fn with_calibration(mut self, calibration: Option<HardwareErrorProfile>) -> Self {
        self.calibration = calibration;
        self
    }

    /// Rename the scenario.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Build the `noisy` scenario, consulting `cache` before asking `provider`.
pub fn noisy_scenario<P: NoiseProvider + ?Sized>(
    cache: &NoiseProfileCache,
    provider: &P,
    simulator: &str,
    noise_backend: &str,
    shots: u32,
) -> Result<Scenario> {
    let profile = cache.get(noise_backend, |b| provider.fetch_profile(b))?;
    Ok(Scenario::noisy(simulator, profile, shots))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let s = Scenario::ideal("aer", 1024);
        assert_eq!(s.name, IDEAL);
        assert_eq!(s.kind, BackendKind::Simulator);
        assert!(s.noise.is_none());

        let profile = NoiseProfile {
            backend: "fake_device".into(),
            payload: serde_json::json!({"model": 1}),
            properties: Some(HardwareErrorProfile {
                t1: vec![50.0],
                ..Default::default()
            }),
        };
        let s = Scenario::noisy("aer", profile, 512);
        assert_eq!(s.name, NOISY);
        assert_eq!(s.calibration.as_ref().map(|c| c.t1.len()), Some(1));

        let s = Scenario::hardware("device", 100).named("hw-a");
        assert_eq!(s.kind, BackendKind::Hardware);
        assert_eq!(s.name, "hw-a");
    }
}
