//! Engine configuration (the "one PRNG seed" and generator bounds).

use std::ops::Range;

/// Tunables for one plan run.
///
/// Built with [`RunnerConfig::builder`], a fluent builder style.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Seed for the deterministic value generator.
    pub(crate) seed: u64,
    /// Depth cap for `$ref` cycle detection.
    pub(crate) max_ref_depth: u8,
    /// Default `[min, max)` range used for array length when the schema
    /// declares neither `minItems` nor `maxItems`.
    pub(crate) default_array_range: Range<usize>,
    /// Default maximum used for integers when neither `minimum` nor
    /// `maximum` is supplied.
    pub(crate) default_integer_max: i64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_ref_depth: 8,
            default_array_range: 0..10,
            default_integer_max: 10_000,
        }
    }
}

impl RunnerConfig {
    /// Starts a new builder with default values.
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::default()
    }

    /// The configured seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The configured `$ref` depth cap.
    pub fn max_ref_depth(&self) -> u8 {
        self.max_ref_depth
    }

    /// The default `[min, max)` array-length range used when a schema
    /// declares neither `minItems` nor `maxItems`.
    pub fn default_array_range(&self) -> Range<usize> {
        self.default_array_range.clone()
    }

    /// The default integer maximum used when a schema declares neither
    /// `minimum` nor `maximum`.
    pub fn default_integer_max(&self) -> i64 {
        self.default_integer_max
    }
}

/// Fluent builder for [`RunnerConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Sets the PRNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the `$ref` cycle depth cap.
    pub fn with_max_ref_depth(mut self, depth: u8) -> Self {
        self.config.max_ref_depth = depth;
        self
    }

    /// Sets the default array-length range used when the schema is silent.
    pub fn with_default_array_range(mut self, range: Range<usize>) -> Self {
        self.config.default_array_range = range;
        self
    }

    /// Sets the default integer maximum used when the schema is silent.
    pub fn with_default_integer_max(mut self, max: i64) -> Self {
        self.config.default_integer_max = max;
        self
    }

    /// Finishes building.
    pub fn build(self) -> RunnerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_ref_depth(), 8);
        assert_eq!(config.default_array_range, 0..10);
        assert_eq!(config.default_integer_max, 10_000);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = RunnerConfig::builder()
            .with_seed(7)
            .with_max_ref_depth(3)
            .with_default_array_range(1..5)
            .with_default_integer_max(100)
            .build();

        assert_eq!(config.seed(), 7);
        assert_eq!(config.max_ref_depth(), 3);
        assert_eq!(config.default_array_range, 1..5);
        assert_eq!(config.default_integer_max, 100);
    }
}
