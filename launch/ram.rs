//! Rough memory sizing for the variant-filter stage, used to pick an instance type.

/// Samples in the full cohort.
pub const DEFAULT_NUM_SAMPLES: u64 = 330_000;
/// Variants kept by the default `--max-variants`.
pub const DEFAULT_NUM_FEATURES: u64 = 80_000;

const FLOAT_SIZE_BYTES: f64 = 8.0;
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RamEstimate {
    /// Dense `f64` genotype matrix, samples by features.
    pub genotype_gib: f64,
    /// The `XᵀX` matrix of a linear regression over all features.
    pub xtx_gib: f64,
}

pub fn estimate(num_samples: u64, num_features: u64) -> RamEstimate {
    let samples = num_samples as f64;
    let features = num_features as f64;
    RamEstimate {
        genotype_gib: samples * features * FLOAT_SIZE_BYTES / BYTES_PER_GIB,
        xtx_gib: features * features * FLOAT_SIZE_BYTES / BYTES_PER_GIB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_sizes() {
        let estimate = estimate(DEFAULT_NUM_SAMPLES, DEFAULT_NUM_FEATURES);
        assert_abs_diff_eq!(estimate.genotype_gib, 196.695, epsilon = 1e-3);
        assert_abs_diff_eq!(estimate.xtx_gib, 47.684, epsilon = 1e-3);
    }

    #[test]
    fn one_gib_matrix() {
        // 2^27 eight-byte values.
        let estimate = estimate(1 << 14, 1 << 13);
        assert_abs_diff_eq!(estimate.genotype_gib, 1.0, epsilon = 1e-12);
    }
}
