//! Run configuration for fuzzing batches.
//!
//! One explicit [`Config`] value is handed to the generator, harness and
//! pipeline at construction time. Presets cover common budgets; builder
//! methods panic on nonsensical values, and [`Config::validate`] reports the
//! same problems as errors for configurations loaded from a file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use qfuzz_core::constants::{
    DEFAULT_OPERATION_COUNT, DEFAULT_PROGRAM_COUNT, DEFAULT_REPETITIONS, DEFAULT_SHOTS,
    DEFAULT_SLOT_COUNT, DEFAULT_SPREAD_KIND,
};
use qfuzz_core::{InvalidInput, OutlierPolicy};

use crate::scenario::{BackendKind, IDEAL};

/// Program generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Programs per batch.
    pub program_count: usize,
    /// Resource slots per program.
    pub slot_count: usize,
    /// Random operations per program (excluding the spread prologue).
    pub operation_count: usize,
    /// Prepend one spread operation on every slot.
    pub random_init: bool,
    /// Single-slot kind used by the spread prologue.
    pub spread_kind: String,
    /// Seed for reproducible batches. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            program_count: DEFAULT_PROGRAM_COUNT,
            slot_count: DEFAULT_SLOT_COUNT,
            operation_count: DEFAULT_OPERATION_COUNT,
            random_init: false,
            spread_kind: DEFAULT_SPREAD_KIND.to_string(),
            seed: None,
        }
    }
}

/// Minimum time between two status queries of a pending job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Interval for simulator jobs.
    #[serde(rename = "simulator_interval_ms", with = "millis")]
    pub simulator_interval: Duration,
    /// Interval for hardware jobs, which sit in remote queues.
    #[serde(rename = "hardware_interval_ms", with = "millis")]
    pub hardware_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            simulator_interval: Duration::from_millis(1),
            hardware_interval: Duration::from_secs(5),
        }
    }
}

impl PollConfig {
    /// Interval for a backend of `kind`.
    pub fn interval_for(&self, kind: BackendKind) -> Duration {
        match kind {
            BackendKind::Simulator => self.simulator_interval,
            BackendKind::Hardware => self.hardware_interval,
        }
    }
}

/// Configuration for a fuzzing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Generation
    // =========================================================================
    /// Program generation settings.
    pub fuzz: FuzzConfig,

    // =========================================================================
    // Execution
    // =========================================================================
    /// Shots per execution.
    pub shots: u32,

    /// Repetitions per (program, scenario) pair.
    ///
    /// Each repetition compiles, submits and waits once; the timing filter
    /// works on the resulting samples.
    pub repetitions: usize,

    /// Poll intervals of the wait loop.
    pub poll: PollConfig,

    /// Wait budget per (program, scenario) pair. `None` waits indefinitely.
    #[serde(rename = "timeout_ms", with = "opt_millis")]
    pub timeout: Option<Duration>,

    // =========================================================================
    // Aggregation
    // =========================================================================
    /// Outlier policy applied to timing samples.
    pub outlier_policy: OutlierPolicy,

    /// Scenario whose histogram is the fidelity reference for the others.
    pub reference_scenario: Option<String>,

    /// Directory of the noise profile cache.
    pub cache_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fuzz: FuzzConfig::default(),
            shots: DEFAULT_SHOTS,
            repetitions: DEFAULT_REPETITIONS,
            poll: PollConfig::default(),
            timeout: None,
            outlier_policy: OutlierPolicy::default(),
            reference_scenario: Some(IDEAL.to_string()),
            cache_dir: PathBuf::from("noise_models"),
        }
    }
}

impl Config {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small batch for development:
    /// - 5 programs
    /// - 2 repetitions
    /// - 256 shots
    pub fn quick() -> Self {
        Self {
            fuzz: FuzzConfig {
                program_count: 5,
                ..FuzzConfig::default()
            },
            shots: 256,
            repetitions: 2,
            ..Self::default()
        }
    }

    /// Large batch for data collection:
    /// - 100 programs
    /// - 20 repetitions
    /// - 8192 shots
    /// - 10 minute budget per pair
    pub fn thorough() -> Self {
        Self {
            fuzz: FuzzConfig {
                program_count: 100,
                ..FuzzConfig::default()
            },
            shots: 8192,
            repetitions: 20,
            timeout: Some(Duration::from_secs(600)),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file and validate it.
    pub fn from_json_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the number of programs per batch.
    pub fn program_count(mut self, n: usize) -> Self {
        assert!(n > 0, "program_count must be positive");
        self.fuzz.program_count = n;
        self
    }

    /// Set the number of resource slots per program.
    pub fn slot_count(mut self, n: usize) -> Self {
        assert!(n > 0, "slot_count must be positive");
        self.fuzz.slot_count = n;
        self
    }

    /// Set the number of random operations per program.
    pub fn operation_count(mut self, n: usize) -> Self {
        self.fuzz.operation_count = n;
        self
    }

    /// Enable or disable the spread prologue.
    pub fn random_init(mut self, enabled: bool) -> Self {
        self.fuzz.random_init = enabled;
        self
    }

    /// Set the spread prologue kind.
    pub fn spread_kind(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        assert!(!kind.is_empty(), "spread_kind must not be empty");
        self.fuzz.spread_kind = kind;
        self
    }

    /// Fix the generator seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.fuzz.seed = Some(seed);
        self
    }

    /// Set the shots per execution.
    pub fn shots(mut self, shots: u32) -> Self {
        assert!(shots > 0, "shots must be positive");
        self.shots = shots;
        self
    }

    /// Set the repetitions per pair.
    pub fn repetitions(mut self, n: usize) -> Self {
        assert!(n > 0, "repetitions must be positive");
        self.repetitions = n;
        self
    }

    /// Set the simulator poll interval.
    pub fn simulator_poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be positive");
        self.poll.simulator_interval = interval;
        self
    }

    /// Set the hardware poll interval.
    pub fn hardware_poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be positive");
        self.poll.hardware_interval = interval;
        self
    }

    /// Set the wait budget per pair.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "timeout must be positive");
        self.timeout = Some(timeout);
        self
    }

    /// Set the outlier policy.
    pub fn outlier_policy(mut self, policy: OutlierPolicy) -> Self {
        if let Err(e) = policy.validate() {
            panic!("{e}");
        }
        self.outlier_policy = policy;
        self
    }

    /// Use the scenario named `name` as the fidelity reference.
    pub fn reference_scenario(mut self, name: impl Into<String>) -> Self {
        self.reference_scenario = Some(name.into());
        self
    }

    /// Compute no fidelity.
    pub fn no_reference(mut self) -> Self {
        self.reference_scenario = None;
        self
    }

    /// Set the noise cache directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        let invalid = |msg: &str| Err(InvalidInput::InvalidConfig(msg.to_string()));

        if self.fuzz.program_count == 0 {
            return invalid("program_count must be positive");
        }
        if self.fuzz.slot_count == 0 {
            return invalid("slot_count must be positive");
        }
        if self.fuzz.random_init && self.fuzz.spread_kind.is_empty() {
            return invalid("spread_kind must not be empty");
        }
        if self.shots == 0 {
            return invalid("shots must be positive");
        }
        if self.repetitions == 0 {
            return invalid("repetitions must be positive");
        }
        if self.poll.simulator_interval.is_zero() || self.poll.hardware_interval.is_zero() {
            return invalid("poll interval must be positive");
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return invalid("timeout must be positive");
        }
        if let Some(name) = &self.reference_scenario {
            if name.is_empty() {
                return invalid("reference_scenario must not be empty");
            }
        }
        self.outlier_policy.validate()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}
