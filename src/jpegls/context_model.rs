use crate::constants::J;
use crate::jpegls::JpeglsPcParameters;
use crate::jpegls::regular_mode_context::RegularModeContext;
use crate::jpegls::run_mode_context::RunModeContext;
use crate::jpegls::traits::SampleTraits;

const CONTEXT_COUNT: usize = 365;

/// Context modelling state of one scan, shared by every component of the scan.
pub struct ContextModel {
    pub traits: SampleTraits,
    t1: i32,
    t2: i32,
    t3: i32,
    pub regular_mode_contexts: Vec<RegularModeContext>,
    pub run_mode_contexts: [RunModeContext; 2],
    pub run_index: usize,
}

impl ContextModel {
    /// `pc_parameters` must already be validated and completed with defaults.
    pub fn new(pc_parameters: &JpeglsPcParameters, near_lossless: i32) -> Self {
        let traits = SampleTraits::new(
            pc_parameters.maximum_sample_value,
            near_lossless,
            pc_parameters.reset_value,
        );
        Self {
            traits,
            t1: pc_parameters.threshold1,
            t2: pc_parameters.threshold2,
            t3: pc_parameters.threshold3,
            regular_mode_contexts: vec![RegularModeContext::new(traits.range); CONTEXT_COUNT],
            run_mode_contexts: [
                RunModeContext::new(0, traits.range),
                RunModeContext::new(1, traits.range),
            ],
            run_index: 0,
        }
    }

    // Code segment A.4
    pub fn quantize_gradient(&self, di: i32) -> i32 {
        let near_lossless = self.traits.near_lossless;
        if di <= -self.t3 {
            -4
        } else if di <= -self.t2 {
            -3
        } else if di <= -self.t1 {
            -2
        } else if di < -near_lossless {
            -1
        } else if di <= near_lossless {
            0
        } else if di < self.t1 {
            1
        } else if di < self.t2 {
            2
        } else if di < self.t3 {
            3
        } else {
            4
        }
    }

    /// Maps the neighbourhood (Ra, Rb, Rc, Rd) to a signed context id. Zero
    /// selects run mode.
    pub fn compute_context_id(&self, ra: i32, rb: i32, rc: i32, rd: i32) -> i32 {
        (self.quantize_gradient(rd - rb) * 9 + self.quantize_gradient(rb - rc)) * 9 + self.quantize_gradient(rc - ra)
    }

    pub fn run_length_order(&self) -> i32 {
        J[self.run_index]
    }

    pub fn increment_run_index(&mut self) {
        self.run_index = (self.run_index + 1).min(J.len() - 1);
    }

    pub fn decrement_run_index(&mut self) {
        self.run_index = self.run_index.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpegls::coding_parameters::compute_default;

    #[test]
    fn test_flat_neighbourhood_selects_run_mode() {
        let model = ContextModel::new(&compute_default(255, 0), 0);
        assert_eq!(model.compute_context_id(7, 7, 7, 7), 0);
        assert_ne!(model.compute_context_id(7, 9, 7, 7), 0);
    }

    #[test]
    fn test_quantize_gradient_regions() {
        let model = ContextModel::new(&compute_default(255, 0), 0);
        assert_eq!(model.quantize_gradient(-21), -4);
        assert_eq!(model.quantize_gradient(-1), -1);
        assert_eq!(model.quantize_gradient(0), 0);
        assert_eq!(model.quantize_gradient(2), 1);
        assert_eq!(model.quantize_gradient(6), 2);
        assert_eq!(model.quantize_gradient(20), 3);
        assert_eq!(model.quantize_gradient(21), 4);
    }

    #[test]
    fn test_run_index_saturates() {
        let mut model = ContextModel::new(&compute_default(255, 0), 0);
        model.decrement_run_index();
        assert_eq!(model.run_index, 0);
        for _ in 0..40 {
            model.increment_run_index();
        }
        assert_eq!(model.run_index, 31);
        assert_eq!(model.run_length_order(), 15);
    }
}
