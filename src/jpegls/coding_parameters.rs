use crate::constants::DEFAULT_RESET_THRESHOLD;
use crate::error::JpeglsErrc;
use crate::jpegls::InterleaveMode;
use std::cmp::{max, min};

/// Scan level coding parameters read from or written to the SOS segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodingParameters {
    pub near_lossless: i32,
    pub restart_interval: u32,
    pub interleave_mode: InterleaveMode,
}

/// JPEG-LS preset coding parameters (LSE type 1). A zero field means "use the
/// default value" defined by ISO/IEC 14495-1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JpeglsPcParameters {
    pub maximum_sample_value: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
    pub reset_value: i32,
}

// Clamping function as defined by ISO/IEC 14495-1, Figure C.3
const fn clamp(i: i32, j: i32, maximum_sample_value: i32) -> i32 {
    if i > maximum_sample_value || i < j { j } else { i }
}

pub fn compute_maximum_near_lossless(maximum_sample_value: i32) -> i32 {
    debug_assert!(maximum_sample_value >= 1);
    min(crate::constants::MAXIMUM_NEAR_LOSSLESS, maximum_sample_value / 2)
}

// Default coding threshold values as defined by ISO/IEC 14495-1, C.2.4.1.1.1
pub fn compute_default(maximum_sample_value: i32, near_lossless: i32) -> JpeglsPcParameters {
    debug_assert!(maximum_sample_value <= u16::MAX as i32);
    debug_assert!(near_lossless >= 0 && near_lossless <= compute_maximum_near_lossless(maximum_sample_value));

    // Default threshold values for JPEG-LS statistical modeling as defined in ISO/IEC 14495-1, table C.3
    // for the case MAXVAL = 255 and NEAR = 0.
    const DEFAULT_THRESHOLD1: i32 = 3; // BASIC_T1
    const DEFAULT_THRESHOLD2: i32 = 7; // BASIC_T2
    const DEFAULT_THRESHOLD3: i32 = 21; // BASIC_T3

    if maximum_sample_value >= 128 {
        let factor = (min(maximum_sample_value, 4095) + 128) / 256;
        let threshold1 = clamp(
            factor * (DEFAULT_THRESHOLD1 - 2) + 2 + 3 * near_lossless,
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            factor * (DEFAULT_THRESHOLD2 - 3) + 3 + 5 * near_lossless,
            threshold1,
            maximum_sample_value,
        );

        JpeglsPcParameters {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                factor * (DEFAULT_THRESHOLD3 - 4) + 4 + 7 * near_lossless,
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    } else {
        let factor = 256 / (maximum_sample_value + 1);
        let threshold1 = clamp(
            max(2, DEFAULT_THRESHOLD1 / factor + 3 * near_lossless),
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            max(3, DEFAULT_THRESHOLD2 / factor + 5 * near_lossless),
            threshold1,
            maximum_sample_value,
        );

        JpeglsPcParameters {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                max(4, DEFAULT_THRESHOLD3 / factor + 7 * near_lossless),
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    }
}

/// True when writing `preset_coding_parameters` would not change anything
/// compared to the defaults, so no LSE segment is needed.
pub fn is_default(preset_coding_parameters: &JpeglsPcParameters, defaults: &JpeglsPcParameters) -> bool {
    if *preset_coding_parameters == JpeglsPcParameters::default() {
        return true;
    }

    preset_coding_parameters == defaults
}

/// Validates `pc_parameters` against Table C.1 and fills in defaults for the
/// fields left at zero.
pub fn is_valid(
    pc_parameters: &JpeglsPcParameters,
    maximum_component_value: i32,
    near_lossless: i32,
) -> Result<JpeglsPcParameters, JpeglsErrc> {
    debug_assert!(maximum_component_value >= 3 && maximum_component_value <= u16::MAX as i32);

    // ISO/IEC 14495-1, C.2.4.1.1, Table C.1 defines the valid JPEG-LS preset coding parameters values.
    if pc_parameters.maximum_sample_value != 0
        && (pc_parameters.maximum_sample_value < 1 || pc_parameters.maximum_sample_value > maximum_component_value)
    {
        return Err(JpeglsErrc::InvalidArgumentJpeglsPcParameters);
    }

    let maximum_sample_value = if pc_parameters.maximum_sample_value != 0 {
        pc_parameters.maximum_sample_value
    } else {
        maximum_component_value
    };

    if near_lossless > compute_maximum_near_lossless(maximum_sample_value) {
        return Err(JpeglsErrc::InvalidArgumentNearLossless);
    }

    if pc_parameters.threshold1 != 0
        && (pc_parameters.threshold1 < near_lossless + 1 || pc_parameters.threshold1 > maximum_sample_value)
    {
        return Err(JpeglsErrc::InvalidArgumentJpeglsPcParameters);
    }

    let defaults = compute_default(maximum_sample_value, near_lossless);

    let threshold1 = if pc_parameters.threshold1 != 0 {
        pc_parameters.threshold1
    } else {
        defaults.threshold1
    };

    if pc_parameters.threshold2 != 0
        && (pc_parameters.threshold2 < threshold1 || pc_parameters.threshold2 > maximum_sample_value)
    {
        return Err(JpeglsErrc::InvalidArgumentJpeglsPcParameters);
    }

    let threshold2 = if pc_parameters.threshold2 != 0 {
        pc_parameters.threshold2
    } else {
        defaults.threshold2
    };

    if pc_parameters.threshold3 != 0
        && (pc_parameters.threshold3 < threshold2 || pc_parameters.threshold3 > maximum_sample_value)
    {
        return Err(JpeglsErrc::InvalidArgumentJpeglsPcParameters);
    }

    if pc_parameters.reset_value != 0
        && (pc_parameters.reset_value < 3 || pc_parameters.reset_value > max(255, maximum_sample_value))
    {
        return Err(JpeglsErrc::InvalidArgumentJpeglsPcParameters);
    }

    Ok(JpeglsPcParameters {
        maximum_sample_value,
        threshold1,
        threshold2,
        threshold3: if pc_parameters.threshold3 != 0 {
            pc_parameters.threshold3
        } else {
            defaults.threshold3
        },
        reset_value: if pc_parameters.reset_value != 0 {
            pc_parameters.reset_value
        } else {
            defaults.reset_value
        },
    })
}

pub fn compute_limit_parameter(bits_per_sample: i32) -> i32 {
    2 * (bits_per_sample + max(8, bits_per_sample))
}

/// Smallest `x` such that `2^x >= value`.
pub fn log2_ceil(value: i32) -> i32 {
    debug_assert!(value > 0);
    (u32::BITS - ((value - 1) as u32).leading_zeros()) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_for_8_bit_lossless() {
        let pc = compute_default(255, 0);
        assert_eq!(
            pc,
            JpeglsPcParameters {
                maximum_sample_value: 255,
                threshold1: 3,
                threshold2: 7,
                threshold3: 21,
                reset_value: 64,
            }
        );
    }

    #[test]
    fn test_default_thresholds_for_2_bit() {
        let pc = compute_default(3, 0);
        assert_eq!((pc.threshold1, pc.threshold2, pc.threshold3), (2, 3, 3));
    }

    #[test]
    fn test_default_thresholds_for_16_bit_near_lossless() {
        let pc = compute_default(65535, 3);
        assert_eq!((pc.threshold1, pc.threshold2, pc.threshold3), (27, 82, 297));
    }

    #[test]
    fn test_is_valid_fills_defaults() {
        let pc = is_valid(&JpeglsPcParameters::default(), 255, 0).unwrap();
        assert_eq!(pc, compute_default(255, 0));
    }

    #[test]
    fn test_is_valid_rejects_inverted_thresholds() {
        let pc = JpeglsPcParameters {
            threshold1: 10,
            threshold2: 5,
            ..Default::default()
        };
        assert_eq!(is_valid(&pc, 255, 0), Err(JpeglsErrc::InvalidArgumentJpeglsPcParameters));
    }

    #[test]
    fn test_is_valid_rejects_near_lossless_above_half_range() {
        assert_eq!(
            is_valid(&JpeglsPcParameters::default(), 3, 2),
            Err(JpeglsErrc::InvalidArgumentNearLossless)
        );
    }

    #[test]
    fn test_is_default() {
        let defaults = compute_default(255, 0);
        assert!(is_default(&JpeglsPcParameters::default(), &defaults));
        assert!(is_default(&defaults, &defaults));
        assert!(!is_default(
            &JpeglsPcParameters {
                reset_value: 32,
                ..defaults
            },
            &defaults
        ));
    }

    #[test]
    fn test_log2_ceil() {
        assert_eq!(log2_ceil(1), 0);
        assert_eq!(log2_ceil(4), 2);
        assert_eq!(log2_ceil(5), 3);
        assert_eq!(log2_ceil(256), 8);
        assert_eq!(log2_ceil(65536), 16);
    }
}
