//! Random batch generation.
//!
//! Produces `PendingRequest`s with operands drawn uniformly from an inclusive
//! range and operators drawn uniformly from the registry. A fixed seed makes
//! the batch reproducible.
//!
//! # Examples
//!
//! ```
//! use batch_calc_lib::{BatchGenerator, GenerateConfig, OperationRegistry};
//!
//! let config = GenerateConfig { count: 3, seed: Some(42), ..Default::default() };
//! let registry = OperationRegistry::new();
//!
//! let first = BatchGenerator::new(config.clone()).unwrap().generate(&registry);
//! let second = BatchGenerator::new(config).unwrap().generate(&registry);
//! assert_eq!(first, second);
//! assert_eq!(first.len(), 3);
//! ```

use crate::error::CalcError;
use crate::registry::OperationRegistry;
use crate::types::{GenerateConfig, PendingRequest, MAX_BATCH_SIZE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Builds random batches from a `GenerateConfig`.
#[derive(Debug, Clone)]
pub struct BatchGenerator {
    config: GenerateConfig,
}

impl BatchGenerator {
    /// # Errors
    ///
    /// `CalcError::ConfigError` for an empty operand range or an oversized batch.
    pub fn new(config: GenerateConfig) -> Result<Self, CalcError> {
        if config.min_operand > config.max_operand {
            return Err(CalcError::config(format!(
                "Operand range is empty: min {} > max {}",
                config.min_operand, config.max_operand
            )));
        }
        if config.count > MAX_BATCH_SIZE {
            return Err(CalcError::config(format!(
                "Batch size {} exceeds the limit of {}",
                config.count, MAX_BATCH_SIZE
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// Generate `count` requests indexed `0..count`.
    ///
    /// Operators come from `registry.symbols()`; an empty registry yields
    /// an empty batch.
    pub fn generate(&self, registry: &OperationRegistry) -> Vec<PendingRequest> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.generate_with(&mut rng, &registry.symbols())
    }

    fn generate_with<R: Rng>(&self, rng: &mut R, symbols: &[char]) -> Vec<PendingRequest> {
        if symbols.is_empty() {
            return Vec::new();
        }

        let range = self.config.min_operand..=self.config.max_operand;
        (0..self.config.count)
            .filter_map(|index| {
                let a = rng.gen_range(range.clone());
                let operator = *symbols.choose(&mut *rng)?;
                let b = rng.gen_range(range.clone());
                Some(PendingRequest::new(index, a, operator, b))
            })
            .collect()
    }
}
