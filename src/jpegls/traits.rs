//! Sample arithmetic shared by the scan encoder and decoder.

use crate::jpegls::coding_parameters::{compute_limit_parameter, log2_ceil};
use std::cmp::max;

/// Derived parameters that control quantization and reconstruction for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTraits {
    pub maximum_sample_value: i32,
    pub near_lossless: i32,
    pub range: i32,
    pub quantized_bits_per_sample: i32,
    pub limit: i32,
    pub reset_threshold: i32,
}

impl SampleTraits {
    pub fn new(maximum_sample_value: i32, near_lossless: i32, reset_threshold: i32) -> Self {
        let range = (maximum_sample_value + 2 * near_lossless) / (2 * near_lossless + 1) + 1;
        let bits_per_sample = max(2, log2_ceil(maximum_sample_value + 1));
        Self {
            maximum_sample_value,
            near_lossless,
            range,
            quantized_bits_per_sample: log2_ceil(range),
            limit: compute_limit_parameter(bits_per_sample),
            reset_threshold,
        }
    }

    pub fn is_near(&self, lhs: i32, rhs: i32) -> bool {
        (lhs - rhs).abs() <= self.near_lossless
    }

    pub fn correct_prediction(&self, predicted: i32) -> i32 {
        predicted.clamp(0, self.maximum_sample_value)
    }

    /// Quantizes a prediction error and reduces it modulo RANGE (A.4.4, A.4.5).
    pub fn compute_error_value(&self, error_value: i32) -> i32 {
        self.modulo_range(self.quantize(error_value))
    }

    pub fn compute_reconstructed_sample(&self, predicted_value: i32, error_value: i32) -> i32 {
        self.fix_reconstructed_value(predicted_value + error_value * (2 * self.near_lossless + 1))
    }

    fn quantize(&self, error_value: i32) -> i32 {
        if self.near_lossless == 0 {
            return error_value;
        }

        if error_value > 0 {
            (error_value + self.near_lossless) / (2 * self.near_lossless + 1)
        } else {
            -(self.near_lossless - error_value) / (2 * self.near_lossless + 1)
        }
    }

    fn modulo_range(&self, mut error_value: i32) -> i32 {
        if error_value < 0 {
            error_value += self.range;
        }
        if error_value >= (self.range + 1) / 2 {
            error_value -= self.range;
        }
        error_value
    }

    fn fix_reconstructed_value(&self, mut value: i32) -> i32 {
        let step = 2 * self.near_lossless + 1;
        if value < -self.near_lossless {
            value += self.range * step;
        } else if value > self.maximum_sample_value + self.near_lossless {
            value -= self.range * step;
        }
        self.correct_prediction(value)
    }
}

/// Returns -1 for negative values and 0 otherwise.
pub fn bit_wise_sign(i: i32) -> i32 {
    i >> (i32::BITS - 1)
}

/// Returns -1 for negative values and 1 otherwise.
pub fn sign(n: i32) -> i32 {
    if n < 0 { -1 } else { 1 }
}

/// Median edge detector prediction (A.4.1).
pub fn compute_predicted_value(ra: i32, rb: i32, rc: i32) -> i32 {
    if rc >= max(ra, rb) {
        ra.min(rb)
    } else if rc <= ra.min(rb) {
        max(ra, rb)
    } else {
        ra + rb - rc
    }
}

pub fn map_error_value(error_value: i32) -> i32 {
    if error_value >= 0 {
        2 * error_value
    } else {
        -2 * error_value - 1
    }
}

pub fn unmap_error_value(mapped_error_value: i32) -> i32 {
    let sign = -(mapped_error_value & 1);
    sign ^ (mapped_error_value >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossless_traits_for_8_bit() {
        let traits = SampleTraits::new(255, 0, 64);
        assert_eq!(traits.range, 256);
        assert_eq!(traits.quantized_bits_per_sample, 8);
        assert_eq!(traits.limit, 32);
    }

    #[test]
    fn test_modulo_range_wraps_into_half_open_interval() {
        let traits = SampleTraits::new(255, 0, 64);
        assert_eq!(traits.compute_error_value(255), -1);
        assert_eq!(traits.compute_error_value(-255), 1);
        assert_eq!(traits.compute_error_value(127), 127);
        assert_eq!(traits.compute_error_value(128), -128);
    }

    #[test]
    fn test_reconstruction_inverts_lossless_error() {
        let traits = SampleTraits::new(255, 0, 64);
        for predicted in [0, 17, 128, 255] {
            for sample in [0, 1, 77, 200, 255] {
                let error_value = traits.compute_error_value(sample - predicted);
                assert_eq!(traits.compute_reconstructed_sample(predicted, error_value), sample);
            }
        }
    }

    #[test]
    fn test_near_lossless_reconstruction_stays_within_bound() {
        let traits = SampleTraits::new(255, 3, 64);
        for predicted in [0, 40, 255] {
            for sample in 0..=255 {
                let error_value = traits.compute_error_value(sample - predicted);
                let reconstructed = traits.compute_reconstructed_sample(predicted, error_value);
                assert!((reconstructed - sample).abs() <= 3, "{sample} -> {reconstructed}");
            }
        }
    }

    #[test]
    fn test_map_unmap() {
        for error_value in -300..300 {
            assert_eq!(unmap_error_value(map_error_value(error_value)), error_value);
        }
        assert_eq!(map_error_value(-1), 1);
        assert_eq!(map_error_value(1), 2);
    }

    #[test]
    fn test_predicted_value() {
        assert_eq!(compute_predicted_value(10, 20, 30), 10);
        assert_eq!(compute_predicted_value(10, 20, 5), 20);
        assert_eq!(compute_predicted_value(10, 20, 15), 15);
        assert_eq!(bit_wise_sign(-5), -1);
        assert_eq!(bit_wise_sign(5), 0);
    }
}
