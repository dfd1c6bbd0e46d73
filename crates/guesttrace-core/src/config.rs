//! Tracer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TracerError, TracerResult};
use crate::stack::CALL_STACK_DEPTH;
use crate::tag::MAX_CORES;

/// What a protocol violation halts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Stop tracing on the offending core only.
    #[default]
    HaltCore,
    /// Stop tracing on every core.
    HaltTracer,
}

/// Tracer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Number of cores that may call into the tracer.
    pub max_cores: u16,
    /// Largest thread stack depth at which a page fault still opens a frame.
    pub fault_depth_cap: usize,
    /// What a protocol violation halts.
    pub fault_policy: FaultPolicy,
    /// Only record accesses while the core has a running call extent.
    pub require_call_window: bool,
    /// Emit a sched record on every context switch.
    pub record_scheduling: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_cores: MAX_CORES as u16,
            fault_depth_cap: 1,
            fault_policy: FaultPolicy::HaltCore,
            require_call_window: true,
            record_scheduling: true,
        }
    }
}

impl TracerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> TracerResult<()> {
        if self.max_cores == 0 {
            return Err(TracerError::invalid_configuration(
                "max_cores must be greater than 0",
            ));
        }
        if usize::from(self.max_cores) > MAX_CORES {
            return Err(TracerError::invalid_configuration(format!(
                "max_cores must be at most {MAX_CORES}"
            )));
        }
        if self.fault_depth_cap == 0 {
            return Err(TracerError::invalid_configuration(
                "fault_depth_cap must be greater than 0",
            ));
        }
        if self.fault_depth_cap > CALL_STACK_DEPTH {
            return Err(TracerError::invalid_configuration(format!(
                "fault_depth_cap must be at most {CALL_STACK_DEPTH}"
            )));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> TracerConfigBuilder {
        TracerConfigBuilder::default()
    }
}

/// Builder for [`TracerConfig`].
#[derive(Debug, Default)]
pub struct TracerConfigBuilder {
    config: TracerConfig,
}

impl TracerConfigBuilder {
    /// Set the number of cores.
    #[must_use]
    pub fn max_cores(mut self, cores: u16) -> Self {
        self.config.max_cores = cores;
        self
    }

    /// Set the page-fault depth cap.
    #[must_use]
    pub fn fault_depth_cap(mut self, cap: usize) -> Self {
        self.config.fault_depth_cap = cap;
        self
    }

    /// Set the fault policy.
    #[must_use]
    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.config.fault_policy = policy;
        self
    }

    /// Gate access recording on the per-core call window.
    #[must_use]
    pub fn require_call_window(mut self, require: bool) -> Self {
        self.config.require_call_window = require;
        self
    }

    /// Emit sched records on context switches.
    #[must_use]
    pub fn record_scheduling(mut self, record: bool) -> Self {
        self.config.record_scheduling = record;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> TracerResult<TracerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TracerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_cores, 16);
        assert_eq!(config.fault_depth_cap, 1);
        assert_eq!(config.fault_policy, FaultPolicy::HaltCore);
    }

    #[test]
    fn test_builder() -> TracerResult<()> {
        let config = TracerConfig::builder()
            .max_cores(4)
            .fault_depth_cap(3)
            .fault_policy(FaultPolicy::HaltTracer)
            .require_call_window(false)
            .record_scheduling(false)
            .build()?;

        assert_eq!(config.max_cores, 4);
        assert_eq!(config.fault_depth_cap, 3);
        assert_eq!(config.fault_policy, FaultPolicy::HaltTracer);
        assert!(!config.require_call_window);
        assert!(!config.record_scheduling);
        Ok(())
    }

    #[test]
    fn test_partial_json_fills_defaults() -> Result<(), serde_json::Error> {
        let config: TracerConfig =
            serde_json::from_str(r#"{ "max_cores": 2, "fault_policy": "halt_tracer" }"#)?;
        assert_eq!(config.max_cores, 2);
        assert_eq!(config.fault_policy, FaultPolicy::HaltTracer);
        assert_eq!(config.fault_depth_cap, 1);
        assert!(config.record_scheduling);
        Ok(())
    }

    #[test]
    fn test_invalid_core_counts() {
        assert!(TracerConfig::builder().max_cores(0).build().is_err());
        assert!(TracerConfig::builder().max_cores(17).build().is_err());
        assert!(TracerConfig::builder().max_cores(16).build().is_ok());
    }

    #[test]
    fn test_invalid_fault_depth_cap() {
        assert!(TracerConfig::builder().fault_depth_cap(0).build().is_err());
        assert!(
            TracerConfig::builder()
                .fault_depth_cap(CALL_STACK_DEPTH + 1)
                .build()
                .is_err()
        );
        assert!(
            TracerConfig::builder()
                .fault_depth_cap(CALL_STACK_DEPTH)
                .build()
                .is_ok()
        );
    }
}
