//! Identifier generation.
//!
//! Ids follow the template `xxxxxxxx-xxxx-4xxx-xxxx-xxxxxxxxxxxx`, where each
//! `x` is drawn uniformly from lowercase ASCII letters and digits.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use crate::error::{ConvertError, ConvertResult};

/// Template every generated id follows.
pub const ID_TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-xxxx-xxxxxxxxxxxx";

const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates unique opaque ids.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    /// Create a generator seeded from the operating system.
    pub fn from_entropy() -> ConvertResult<Self> {
        let rng = StdRng::from_rng(OsRng).map_err(|e| ConvertError::Entropy(e.to_string()))?;
        Ok(Self { rng })
    }

    /// Create a deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Generate the next id.
    pub fn generate(&mut self) -> String {
        ID_TEMPLATE
            .chars()
            .map(|c| {
                if c == 'x' {
                    char::from(ALPHANUMERIC[self.rng.gen_range(0..ALPHANUMERIC.len())])
                } else {
                    c
                }
            })
            .collect()
    }
}
