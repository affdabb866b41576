use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use rtim_nls::Encoding;
use serde::{Deserialize, Serialize};

/// Logger configuration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggerConfig {
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::Info,
        }
    }
}

impl LoggerConfig {
    /// Install `env_logger` with this filter. `RUST_LOG` still overrides it.
    #[cfg(feature = "logger")]
    pub fn init(&self) {
        let _ = env_logger::Builder::new()
            .filter_level(self.level_filter)
            .parse_default_env()
            .try_init();
    }
}

/// Runtime configuration for a [`Sequencer`](crate::vm::Sequencer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Host milliseconds per tick. Record delays are multiples of this.
    pub tick_length: u32,
    /// Records one function may execute in a single step before it is
    /// forcibly yielded.
    pub max_burst: usize,
    /// Seed for loop jitter. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    pub encoding: Encoding,
    pub diagnostics_capacity: usize,
    pub record_trace: bool,
    pub logger: Option<LoggerConfig>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            tick_length: 16,
            max_burst: 128,
            rng_seed: None,
            encoding: Encoding::default(),
            diagnostics_capacity: 64,
            record_trace: false,
            logger: None,
        }
    }
}

/// Convenience builder for a `SequencerConfig` from code.
#[derive(Default)]
pub struct SequencerConfigBuilder {
    config: SequencerConfig,
}

impl SequencerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick_length(mut self, tick_length: u32) -> Self {
        self.config.tick_length = tick_length;
        self
    }

    pub fn with_max_burst(mut self, max_burst: usize) -> Self {
        self.config.max_burst = max_burst;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = Some(seed);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    pub fn with_diagnostics_capacity(mut self, cap: usize) -> Self {
        self.config.diagnostics_capacity = cap;
        self
    }

    pub fn with_trace(mut self, record: bool) -> Self {
        self.config.record_trace = record;
        self
    }

    pub fn with_logger_config(mut self, logger: LoggerConfig) -> Self {
        self.config.logger = Some(logger);
        self
    }

    /// Retrieves the configuration built
    pub fn get(self) -> SequencerConfig {
        self.config
    }
}

pub struct SequencerConfigReader;

impl SequencerConfigReader {
    pub fn read_json(path: impl AsRef<Path>) -> Result<SequencerConfig> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
        Self::from_json_slice(&bytes).with_context(|| format!("parse {:?}", path))
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<SequencerConfig> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = SequencerConfigReader::from_json_slice(
            br#"{ "tick_length": 20, "rng_seed": 7, "encoding": "shift_jis" }"#,
        )
        .unwrap();
        assert_eq!(cfg.tick_length, 20);
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.encoding, Encoding::ShiftJis);
        assert_eq!(cfg.max_burst, 128);
        assert!(!cfg.record_trace);
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = SequencerConfigBuilder::new()
            .with_tick_length(10)
            .with_max_burst(4)
            .with_rng_seed(1)
            .with_trace(true)
            .with_logger_config(LoggerConfig {
                level_filter: LevelFilter::Debug,
            })
            .get();
        assert_eq!(cfg.tick_length, 10);
        assert_eq!(cfg.max_burst, 4);
        assert_eq!(cfg.rng_seed, Some(1));
        assert!(cfg.record_trace);
        assert_eq!(cfg.logger.map(|l| l.level_filter), Some(LevelFilter::Debug));
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(SequencerConfigReader::from_json_slice(b"{ tick_length: }").is_err());
    }
}
