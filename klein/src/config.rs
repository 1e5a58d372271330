use crate::error::Result;
use crate::topology::Topology;

pub const DEFAULT_WIDTH: u32 = 256;
pub const DEFAULT_HEIGHT: u32 = 64;

/// How a generation is computed. Both produce identical results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    Serial,
    /// Rows are split across the rayon thread pool.
    #[default]
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub width: u32,
    pub height: u32,
    pub execution: Execution,
    /// Seed for the randomized patterns; `None` draws one from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            execution: Execution::default(),
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn topology(&self) -> Result<Topology> {
        Topology::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KleinError;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        let topology = config.topology().unwrap();
        assert_eq!((topology.width(), topology.height()), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert_eq!(config.execution, Execution::Parallel);
    }

    #[test]
    fn builders_override_fields() {
        let config = SimulationConfig::new(32, 8)
            .with_execution(Execution::Serial)
            .with_rng_seed(42);
        assert_eq!(config.execution, Execution::Serial);
        assert_eq!(config.rng_seed, Some(42));
        assert!(config.topology().is_ok());
        assert_eq!(
            SimulationConfig::new(30, 8).topology(),
            Err(KleinError::InvalidDimensions { width: 30, height: 8 })
        );
    }
}
