//! Decoder for the entropy coded segment of one JPEG-LS scan.

use crate::constants::{MAX_K_VALUE, MAXIMUM_COMPONENT_COUNT_IN_SCAN};
use crate::error::JpeglsErrc;
use crate::jpeg_marker_code::JPEG_MARKER_START_BYTE;
use crate::jpegls::InterleaveMode;
use crate::jpegls::JpeglsPcParameters;
use crate::jpegls::context_model::ContextModel;
use crate::jpegls::traits::{compute_predicted_value, sign, unmap_error_value};

/// Decodes one scan into samples laid out line interleaved (the layout
/// [`super::scan_encoder::ScanEncoder`] consumes).
pub struct ScanDecoder<'a> {
    model: ContextModel,
    width: usize,
    height: usize,
    source: &'a [u8],
    position: usize,
    bit_buffer: u32,
    valid_bits: u32,
    last_byte_was_ff: bool,
}

impl<'a> ScanDecoder<'a> {
    pub fn new(
        width: usize,
        height: usize,
        pc_parameters: &JpeglsPcParameters,
        near_lossless: i32,
        source: &'a [u8],
    ) -> Self {
        Self {
            model: ContextModel::new(pc_parameters, near_lossless),
            width,
            height,
            source,
            position: 0,
            bit_buffer: 0,
            valid_bits: 0,
            last_byte_was_ff: false,
        }
    }

    /// Decodes the scan into `samples` and returns the number of source bytes
    /// consumed. On success the source position is at the marker that follows
    /// the scan.
    pub fn decode_scan(
        mut self,
        samples: &mut [i32],
        component_count: usize,
        interleave_mode: InterleaveMode,
    ) -> Result<usize, JpeglsErrc> {
        debug_assert!(samples.len() >= self.width * self.height * component_count);

        if interleave_mode == InterleaveMode::Sample && component_count > 1 {
            debug_assert!(component_count <= MAXIMUM_COMPONENT_COUNT_IN_SCAN as usize);
            self.decode_sample_interleaved(samples, component_count)?;
        } else {
            self.decode_line_interleaved(samples, component_count)?;
        }
        self.end_scan()
    }

    fn decode_line_interleaved(&mut self, samples: &mut [i32], component_count: usize) -> Result<(), JpeglsErrc> {
        let width = self.width;
        let stride = width + 2;
        let mut previous = vec![0i32; stride * component_count];
        let mut current = vec![0i32; stride * component_count];
        let mut run_indices = vec![0usize; component_count];

        for row in 0..self.height {
            for component in 0..component_count {
                let previous_line = &mut previous[component * stride..(component + 1) * stride];
                let current_line = &mut current[component * stride..(component + 1) * stride];
                previous_line[width + 1] = previous_line[width];
                current_line[0] = previous_line[1];

                self.model.run_index = run_indices[component];
                self.decode_line(previous_line, current_line)?;
                run_indices[component] = self.model.run_index;

                let target_offset = (row * component_count + component) * width;
                samples[target_offset..target_offset + width].copy_from_slice(&current_line[1..=width]);
            }
            std::mem::swap(&mut previous, &mut current);
        }
        Ok(())
    }

    fn decode_sample_interleaved(&mut self, samples: &mut [i32], component_count: usize) -> Result<(), JpeglsErrc> {
        let width = self.width;
        let stride = (width + 2) * component_count;
        let mut previous = vec![0i32; stride];
        let mut current = vec![0i32; stride];

        for row in 0..self.height {
            for component in 0..component_count {
                previous[(width + 1) * component_count + component] = previous[width * component_count + component];
                current[component] = previous[component_count + component];
            }

            self.decode_sample_line(&previous, &mut current, component_count)?;

            for component in 0..component_count {
                let target_offset = (row * component_count + component) * width;
                for x in 0..width {
                    samples[target_offset + x] = current[(x + 1) * component_count + component];
                }
            }
            std::mem::swap(&mut previous, &mut current);
        }
        Ok(())
    }

    fn decode_line(&mut self, previous_line: &[i32], current_line: &mut [i32]) -> Result<(), JpeglsErrc> {
        let mut index = 1;
        while index <= self.width {
            let ra = current_line[index - 1];
            let rb = previous_line[index];
            let rc = previous_line[index - 1];
            let rd = previous_line[index + 1];

            let qs = self.model.compute_context_id(ra, rb, rc, rd);
            if qs != 0 {
                current_line[index] = self.decode_regular(qs, compute_predicted_value(ra, rb, rc))?;
                index += 1;
            } else {
                index += self.decode_run_mode(index, previous_line, current_line)?;
            }
        }
        Ok(())
    }

    fn decode_sample_line(
        &mut self,
        previous_line: &[i32],
        current_line: &mut [i32],
        component_count: usize,
    ) -> Result<(), JpeglsErrc> {
        let mut qs = [0i32; MAXIMUM_COMPONENT_COUNT_IN_SCAN as usize];
        let mut index = 1;
        while index <= self.width {
            let mut all_zero = true;
            for component in 0..component_count {
                let ra = current_line[(index - 1) * component_count + component];
                let rb = previous_line[index * component_count + component];
                let rc = previous_line[(index - 1) * component_count + component];
                let rd = previous_line[(index + 1) * component_count + component];
                qs[component] = self.model.compute_context_id(ra, rb, rc, rd);
                all_zero &= qs[component] == 0;
            }

            if all_zero {
                index += self.decode_sample_run_mode(index, previous_line, current_line, component_count)?;
                continue;
            }

            for component in 0..component_count {
                let ra = current_line[(index - 1) * component_count + component];
                let rb = previous_line[index * component_count + component];
                let rc = previous_line[(index - 1) * component_count + component];
                current_line[index * component_count + component] =
                    self.decode_regular(qs[component], compute_predicted_value(ra, rb, rc))?;
            }
            index += 1;
        }
        Ok(())
    }

    fn decode_regular(&mut self, qs: i32, predicted: i32) -> Result<i32, JpeglsErrc> {
        let sign = sign(qs);
        let context_index = (qs * sign) as usize;
        let traits = self.model.traits;

        let (k, predicted_value, error_correction) = {
            let context = &self.model.regular_mode_contexts[context_index];
            let k = context.compute_golomb_coding_parameter(MAX_K_VALUE)?;
            (
                k,
                traits.correct_prediction(predicted + sign * context.c()),
                context.get_error_correction(traits.near_lossless),
            )
        };

        let mut error_value = unmap_error_value(self.decode_value(k, traits.limit)?);
        if error_value.abs() > 65535 {
            return Err(JpeglsErrc::InvalidEncodedData);
        }
        if k == 0 {
            error_value ^= error_correction;
        }

        self.model.regular_mode_contexts[context_index].update_variables_and_bias(
            error_value,
            traits.near_lossless,
            traits.reset_threshold,
        )?;
        Ok(traits.compute_reconstructed_sample(predicted_value, sign * error_value))
    }

    fn decode_run_mode(
        &mut self,
        index: usize,
        previous_line: &[i32],
        current_line: &mut [i32],
    ) -> Result<usize, JpeglsErrc> {
        let ra = current_line[index - 1];
        let count_type_remain = self.width + 1 - index;
        let run_length = self.decode_run_pixels(count_type_remain)?;
        current_line[index..index + run_length].fill(ra);

        if run_length == count_type_remain {
            return Ok(run_length);
        }

        let position = index + run_length;
        current_line[position] = self.decode_run_interruption_pixel(ra, previous_line[position])?;
        self.model.decrement_run_index();
        Ok(run_length + 1)
    }

    fn decode_sample_run_mode(
        &mut self,
        index: usize,
        previous_line: &[i32],
        current_line: &mut [i32],
        component_count: usize,
    ) -> Result<usize, JpeglsErrc> {
        let ra_offset = (index - 1) * component_count;
        let count_type_remain = self.width + 1 - index;
        let run_length = self.decode_run_pixels(count_type_remain)?;

        for pixel in index..index + run_length {
            for component in 0..component_count {
                current_line[pixel * component_count + component] = current_line[ra_offset + component];
            }
        }

        if run_length == count_type_remain {
            return Ok(run_length);
        }

        let offset = (index + run_length) * component_count;
        for component in 0..component_count {
            let ra = current_line[ra_offset + component];
            let rb = previous_line[offset + component];
            let error_value = self.decode_run_interruption_error(0)?;
            current_line[offset + component] = self
                .model
                .traits
                .compute_reconstructed_sample(rb, error_value * sign(rb - ra));
        }
        self.model.decrement_run_index();
        Ok(run_length + 1)
    }

    fn decode_run_pixels(&mut self, count_type_remain: usize) -> Result<usize, JpeglsErrc> {
        let mut index = 0;
        while self.read_bit()? {
            let run_block = 1usize << self.model.run_length_order();
            let count = run_block.min(count_type_remain - index);
            index += count;

            if count == run_block {
                self.model.increment_run_index();
            }
            if index == count_type_remain {
                break;
            }
        }

        if index != count_type_remain {
            // The leading 0 bit has been consumed by the loop above.
            let order = self.model.run_length_order();
            if order > 0 {
                index += self.read_value(order as u32)? as usize;
            }
        }

        if index > count_type_remain {
            return Err(JpeglsErrc::InvalidEncodedData);
        }
        Ok(index)
    }

    fn decode_run_interruption_pixel(&mut self, ra: i32, rb: i32) -> Result<i32, JpeglsErrc> {
        let traits = self.model.traits;
        if (ra - rb).abs() <= traits.near_lossless {
            let error_value = self.decode_run_interruption_error(1)?;
            return Ok(traits.compute_reconstructed_sample(ra, error_value));
        }

        let error_value = self.decode_run_interruption_error(0)?;
        Ok(traits.compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
    }

    fn decode_run_interruption_error(&mut self, context_index: usize) -> Result<i32, JpeglsErrc> {
        let context = self.model.run_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter();
        let limit = self.model.traits.limit - self.model.run_length_order() - 1;
        let e_mapped_error_value = self.decode_value(k, limit)?;
        let error_value = context.decode_error_value(e_mapped_error_value + context.run_interruption_type(), k);

        self.model.run_mode_contexts[context_index].update_variables(
            error_value,
            e_mapped_error_value,
            self.model.traits.reset_threshold,
        );
        Ok(error_value)
    }

    fn decode_value(&mut self, k: i32, limit: i32) -> Result<i32, JpeglsErrc> {
        let quantized_bits_per_sample = self.model.traits.quantized_bits_per_sample;
        let escape_length = limit - quantized_bits_per_sample - 1;

        let mut high_bits = 0;
        while !self.read_bit()? {
            high_bits += 1;
            if high_bits > escape_length {
                return Err(JpeglsErrc::InvalidEncodedData);
            }
        }

        if high_bits == escape_length {
            return Ok(self.read_value(quantized_bits_per_sample as u32)? as i32 + 1);
        }

        if k == 0 {
            return Ok(high_bits);
        }
        Ok((high_bits << k) + self.read_value(k as u32)? as i32)
    }

    fn read_bit(&mut self) -> Result<bool, JpeglsErrc> {
        Ok(self.read_value(1)? == 1)
    }

    fn read_value(&mut self, bit_count: u32) -> Result<u32, JpeglsErrc> {
        debug_assert!(bit_count > 0 && bit_count <= 16);
        while self.valid_bits < bit_count {
            self.fill_byte()?;
        }

        self.valid_bits -= bit_count;
        let value = (self.bit_buffer >> self.valid_bits) & ((1 << bit_count) - 1);
        self.bit_buffer &= (1 << self.valid_bits) - 1;
        Ok(value)
    }

    // A 0xFF followed by a byte with the high bit set is a marker and ends the scan data.
    fn fill_byte(&mut self) -> Result<(), JpeglsErrc> {
        let byte = *self.source.get(self.position).ok_or(JpeglsErrc::SourceBufferTooSmall)?;
        if byte == JPEG_MARKER_START_BYTE && self.is_marker_at(self.position) {
            return Err(JpeglsErrc::InvalidEncodedData);
        }

        if self.last_byte_was_ff {
            self.bit_buffer = (self.bit_buffer << 7) | u32::from(byte & 0x7F);
            self.valid_bits += 7;
        } else {
            self.bit_buffer = (self.bit_buffer << 8) | u32::from(byte);
            self.valid_bits += 8;
        }
        self.last_byte_was_ff = byte == JPEG_MARKER_START_BYTE;
        self.position += 1;
        Ok(())
    }

    fn is_marker_at(&self, position: usize) -> bool {
        self.source.get(position) == Some(&JPEG_MARKER_START_BYTE)
            && self.source.get(position + 1).is_none_or(|&next| next >= 0x80)
    }

    fn end_scan(mut self) -> Result<usize, JpeglsErrc> {
        if self.position >= self.source.len() {
            return Err(JpeglsErrc::SourceBufferTooSmall);
        }

        // Skip the stuffed byte the encoder adds after a trailing 0xFF.
        if self.last_byte_was_ff && self.source[self.position] < 0x80 {
            self.position += 1;
        }

        if !self.is_marker_at(self.position) {
            return Err(JpeglsErrc::TooMuchEncodedData);
        }
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpegls::coding_parameters::compute_default;
    use crate::jpegls::scan_encoder::ScanEncoder;

    fn round_trip(
        samples: &[i32],
        width: usize,
        height: usize,
        component_count: usize,
        maximum_sample_value: i32,
        near_lossless: i32,
        interleave_mode: InterleaveMode,
    ) -> Vec<i32> {
        let pc = compute_default(maximum_sample_value, near_lossless);
        let mut destination = vec![0u8; samples.len() * 8 + 64];
        let length = ScanEncoder::new(width, height, &pc, near_lossless, &mut destination)
            .encode_scan(samples, component_count, interleave_mode)
            .unwrap();
        destination.truncate(length);
        destination.extend_from_slice(&[0xFF, 0xD9]);

        let mut decoded = vec![0i32; samples.len()];
        let consumed = ScanDecoder::new(width, height, &pc, near_lossless, &destination)
            .decode_scan(&mut decoded, component_count, interleave_mode)
            .unwrap();
        assert_eq!(consumed, length);
        decoded
    }

    #[test]
    fn test_lossless_gradient() {
        let samples: Vec<i32> = (0..16 * 8).map(|i| (i * 7 % 256) as i32).collect();
        assert_eq!(round_trip(&samples, 16, 8, 1, 255, 0, InterleaveMode::None), samples);
    }

    #[test]
    fn test_lossless_flat_image_uses_run_mode() {
        let samples = vec![42; 64 * 4];
        assert_eq!(round_trip(&samples, 64, 4, 1, 255, 0, InterleaveMode::None), samples);
    }

    #[test]
    fn test_sample_interleaved_rgb() {
        let samples: Vec<i32> = (0..5 * 3 * 3).map(|i| ((i * 31) % 256) as i32).collect();
        assert_eq!(round_trip(&samples, 5, 3, 3, 255, 0, InterleaveMode::Sample), samples);
        assert_eq!(round_trip(&samples, 5, 3, 3, 255, 0, InterleaveMode::Line), samples);
    }

    #[test]
    fn test_near_lossless_error_is_bounded() {
        let samples: Vec<i32> = (0..32 * 4).map(|i| ((i * 13) % 4096) as i32).collect();
        let decoded = round_trip(&samples, 32, 4, 1, 4095, 2, InterleaveMode::None);
        for (expected, actual) in samples.iter().zip(&decoded) {
            assert!((expected - actual).abs() <= 2);
        }
    }

    #[test]
    fn test_missing_marker_after_scan_is_rejected() {
        let pc = compute_default(255, 0);
        let samples = [10, 200, 30, 40];
        let mut destination = vec![0u8; 64];
        let length = ScanEncoder::new(4, 1, &pc, 0, &mut destination)
            .encode_scan(&samples, 1, InterleaveMode::None)
            .unwrap();
        destination.truncate(length);
        destination.extend_from_slice(&[0x12, 0x34, 0xFF, 0xD9]);

        let mut decoded = [0i32; 4];
        let result = ScanDecoder::new(4, 1, &pc, 0, &destination).decode_scan(&mut decoded, 1, InterleaveMode::None);
        assert_eq!(result, Err(JpeglsErrc::TooMuchEncodedData));
    }
}
