//! Encoder for the entropy coded segment of one JPEG-LS scan (ISO/IEC 14495-1, Annex A).

use crate::constants::{MAX_K_VALUE, MAXIMUM_COMPONENT_COUNT_IN_SCAN};
use crate::error::JpeglsErrc;
use crate::jpeg_marker_code::JPEG_MARKER_START_BYTE;
use crate::jpegls::InterleaveMode;
use crate::jpegls::JpeglsPcParameters;
use crate::jpegls::context_model::ContextModel;
use crate::jpegls::traits::{compute_predicted_value, map_error_value, sign};

/// Encodes samples of one scan. Input samples are laid out line interleaved:
/// for each row, `component_count` lines of `width` samples.
pub struct ScanEncoder<'a> {
    model: ContextModel,
    width: usize,
    height: usize,
    destination: &'a mut [u8],
    position: usize,
    bit_buffer: u64,
    bit_count: u32,
    is_ff_written: bool,
    overflow: bool,
}

impl<'a> ScanEncoder<'a> {
    pub fn new(
        width: usize,
        height: usize,
        pc_parameters: &JpeglsPcParameters,
        near_lossless: i32,
        destination: &'a mut [u8],
    ) -> Self {
        Self {
            model: ContextModel::new(pc_parameters, near_lossless),
            width,
            height,
            destination,
            position: 0,
            bit_buffer: 0,
            bit_count: 0,
            is_ff_written: false,
            overflow: false,
        }
    }

    /// Encodes the scan and returns the number of bytes written.
    pub fn encode_scan(
        mut self,
        samples: &[i32],
        component_count: usize,
        interleave_mode: InterleaveMode,
    ) -> Result<usize, JpeglsErrc> {
        debug_assert!(samples.len() >= self.width * self.height * component_count);

        if interleave_mode == InterleaveMode::Sample && component_count > 1 {
            debug_assert!(component_count <= MAXIMUM_COMPONENT_COUNT_IN_SCAN as usize);
            self.encode_sample_interleaved(samples, component_count)?;
        } else {
            self.encode_line_interleaved(samples, component_count)?;
        }
        self.end_scan();

        if self.overflow {
            return Err(JpeglsErrc::DestinationBufferTooSmall);
        }
        Ok(self.position)
    }

    fn encode_line_interleaved(&mut self, samples: &[i32], component_count: usize) -> Result<(), JpeglsErrc> {
        let width = self.width;
        let stride = width + 2;
        let mut previous = vec![0i32; stride * component_count];
        let mut current = vec![0i32; stride * component_count];
        let mut run_indices = vec![0usize; component_count];

        for row in 0..self.height {
            for component in 0..component_count {
                let previous_line = &mut previous[component * stride..(component + 1) * stride];
                let current_line = &mut current[component * stride..(component + 1) * stride];
                let source_offset = (row * component_count + component) * width;
                current_line[1..=width].copy_from_slice(&samples[source_offset..source_offset + width]);

                previous_line[width + 1] = previous_line[width];
                current_line[0] = previous_line[1];

                self.model.run_index = run_indices[component];
                self.encode_line(previous_line, current_line)?;
                run_indices[component] = self.model.run_index;
            }
            std::mem::swap(&mut previous, &mut current);
        }
        Ok(())
    }

    fn encode_sample_interleaved(&mut self, samples: &[i32], component_count: usize) -> Result<(), JpeglsErrc> {
        let width = self.width;
        let stride = (width + 2) * component_count;
        let mut previous = vec![0i32; stride];
        let mut current = vec![0i32; stride];

        for row in 0..self.height {
            for component in 0..component_count {
                let source_offset = (row * component_count + component) * width;
                for x in 0..width {
                    current[(x + 1) * component_count + component] = samples[source_offset + x];
                }
                previous[(width + 1) * component_count + component] = previous[width * component_count + component];
                current[component] = previous[component_count + component];
            }

            self.encode_sample_line(&previous, &mut current, component_count)?;
            std::mem::swap(&mut previous, &mut current);
        }
        Ok(())
    }

    /// Encodes one line of a single component. Both lines carry one extra
    /// sample on each side; index 1 is the first pixel.
    fn encode_line(&mut self, previous_line: &[i32], current_line: &mut [i32]) -> Result<(), JpeglsErrc> {
        let mut index = 1;
        while index <= self.width {
            let ra = current_line[index - 1];
            let rb = previous_line[index];
            let rc = previous_line[index - 1];
            let rd = previous_line[index + 1];

            let qs = self.model.compute_context_id(ra, rb, rc, rd);
            if qs != 0 {
                current_line[index] =
                    self.encode_regular(qs, current_line[index], compute_predicted_value(ra, rb, rc))?;
                index += 1;
            } else {
                index += self.encode_run_mode(index, previous_line, current_line)?;
            }
        }
        Ok(())
    }

    fn encode_sample_line(
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
                index += self.encode_sample_run_mode(index, previous_line, current_line, component_count)?;
                continue;
            }

            for component in 0..component_count {
                let ra = current_line[(index - 1) * component_count + component];
                let rb = previous_line[index * component_count + component];
                let rc = previous_line[(index - 1) * component_count + component];
                let position = index * component_count + component;
                current_line[position] =
                    self.encode_regular(qs[component], current_line[position], compute_predicted_value(ra, rb, rc))?;
            }
            index += 1;
        }
        Ok(())
    }

    // Code segments A.5 to A.13
    fn encode_regular(&mut self, qs: i32, x: i32, predicted: i32) -> Result<i32, JpeglsErrc> {
        let sign = sign(qs);
        let context_index = (qs * sign) as usize;
        let context = self.model.regular_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter(MAX_K_VALUE)?;
        let traits = self.model.traits;

        let predicted_value = traits.correct_prediction(predicted + sign * context.c());
        let error_value = traits.compute_error_value(sign * (x - predicted_value));

        self.encode_mapped_value(
            k,
            map_error_value(context.get_error_correction(k | traits.near_lossless) ^ error_value),
            traits.limit,
        );
        self.model.regular_mode_contexts[context_index].update_variables_and_bias(
            error_value,
            traits.near_lossless,
            traits.reset_threshold,
        )?;

        Ok(traits.compute_reconstructed_sample(predicted_value, sign * error_value))
    }

    // Code segments A.14 to A.20
    fn encode_run_mode(
        &mut self,
        index: usize,
        previous_line: &[i32],
        current_line: &mut [i32],
    ) -> Result<usize, JpeglsErrc> {
        let count_type_remain = self.width + 1 - index;
        let ra = current_line[index - 1];

        let mut run_length = 0;
        while self.model.traits.is_near(current_line[index + run_length], ra) {
            current_line[index + run_length] = ra;
            run_length += 1;
            if run_length == count_type_remain {
                break;
            }
        }

        self.encode_run_pixels(run_length, run_length == count_type_remain);
        if run_length == count_type_remain {
            return Ok(run_length);
        }

        let position = index + run_length;
        current_line[position] =
            self.encode_run_interruption_pixel(current_line[position], ra, previous_line[position])?;
        self.model.decrement_run_index();
        Ok(run_length + 1)
    }

    fn encode_sample_run_mode(
        &mut self,
        index: usize,
        previous_line: &[i32],
        current_line: &mut [i32],
        component_count: usize,
    ) -> Result<usize, JpeglsErrc> {
        let count_type_remain = self.width + 1 - index;
        let ra_offset = (index - 1) * component_count;

        let mut run_length = 0;
        loop {
            let offset = (index + run_length) * component_count;
            let traits = self.model.traits;
            let is_near = (0..component_count)
                .all(|component| traits.is_near(current_line[offset + component], current_line[ra_offset + component]));
            if !is_near {
                break;
            }

            for component in 0..component_count {
                current_line[offset + component] = current_line[ra_offset + component];
            }
            run_length += 1;
            if run_length == count_type_remain {
                break;
            }
        }

        self.encode_run_pixels(run_length, run_length == count_type_remain);
        if run_length == count_type_remain {
            return Ok(run_length);
        }

        let offset = (index + run_length) * component_count;
        for component in 0..component_count {
            let ra = current_line[ra_offset + component];
            let rb = previous_line[offset + component];
            let sign = sign(rb - ra);
            let traits = self.model.traits;
            let error_value = traits.compute_error_value(sign * (current_line[offset + component] - rb));
            self.encode_run_interruption_error(0, error_value);
            current_line[offset + component] = traits.compute_reconstructed_sample(rb, error_value * sign);
        }
        self.model.decrement_run_index();
        Ok(run_length + 1)
    }

    fn encode_run_pixels(&mut self, mut run_length: usize, end_of_line: bool) {
        while run_length >= 1 << self.model.run_length_order() {
            self.append_to_bit_stream(1, 1);
            run_length -= 1 << self.model.run_length_order();
            self.model.increment_run_index();
        }

        if end_of_line {
            if run_length != 0 {
                self.append_to_bit_stream(1, 1);
            }
        } else {
            // Leading 0 bit followed by the remaining run length.
            self.append_to_bit_stream(run_length as u32, (self.model.run_length_order() + 1) as u32);
        }
    }

    fn encode_run_interruption_pixel(&mut self, x: i32, ra: i32, rb: i32) -> Result<i32, JpeglsErrc> {
        let traits = self.model.traits;
        if (ra - rb).abs() <= traits.near_lossless {
            let error_value = traits.compute_error_value(x - ra);
            self.encode_run_interruption_error(1, error_value);
            return Ok(traits.compute_reconstructed_sample(ra, error_value));
        }

        let sign = sign(rb - ra);
        let error_value = traits.compute_error_value((x - rb) * sign);
        self.encode_run_interruption_error(0, error_value);
        Ok(traits.compute_reconstructed_sample(rb, error_value * sign))
    }

    fn encode_run_interruption_error(&mut self, context_index: usize, error_value: i32) {
        let context = self.model.run_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter();
        let map = context.compute_map(error_value, k);
        let e_mapped_error_value = 2 * error_value.abs() - context.run_interruption_type() - i32::from(map);

        debug_assert_eq!(
            error_value,
            context.decode_error_value(e_mapped_error_value + context.run_interruption_type(), k)
        );
        let limit = self.model.traits.limit - self.model.run_length_order() - 1;
        self.encode_mapped_value(k, e_mapped_error_value, limit);
        self.model.run_mode_contexts[context_index].update_variables(
            error_value,
            e_mapped_error_value,
            self.model.traits.reset_threshold,
        );
    }

    // Code segment A.11 (Golomb coding with the escape code of length LIMIT)
    fn encode_mapped_value(&mut self, k: i32, mapped_error_value: i32, limit: i32) {
        let quantized_bits_per_sample = self.model.traits.quantized_bits_per_sample;
        let high_bits = mapped_error_value >> k;

        if high_bits < limit - quantized_bits_per_sample - 1 {
            self.append_zeros(high_bits as u32);
            self.append_to_bit_stream(1, 1);
            if k > 0 {
                self.append_to_bit_stream((mapped_error_value & ((1 << k) - 1)) as u32, k as u32);
            }
            return;
        }

        self.append_zeros((limit - quantized_bits_per_sample - 1) as u32);
        self.append_to_bit_stream(1, 1);
        self.append_to_bit_stream(
            ((mapped_error_value - 1) & ((1 << quantized_bits_per_sample) - 1)) as u32,
            quantized_bits_per_sample as u32,
        );
    }

    fn append_zeros(&mut self, mut bit_count: u32) {
        while bit_count > 0 {
            let chunk = bit_count.min(31);
            self.append_to_bit_stream(0, chunk);
            bit_count -= chunk;
        }
    }

    fn append_to_bit_stream(&mut self, bits: u32, bit_count: u32) {
        debug_assert!(bit_count <= 32);
        if bit_count == 0 {
            return;
        }

        let mask = (1u64 << bit_count) - 1;
        self.bit_buffer = (self.bit_buffer << bit_count) | (u64::from(bits) & mask);
        self.bit_count += bit_count;
        self.flush();
    }

    // A byte following 0xFF carries only 7 bits; its high bit is a stuffed 0 (A.1).
    fn flush(&mut self) {
        loop {
            let width = if self.is_ff_written { 7 } else { 8 };
            if self.bit_count < width {
                break;
            }
            self.bit_count -= width;
            let byte = ((self.bit_buffer >> self.bit_count) & ((1 << width) - 1)) as u8;
            self.write_byte(byte);
            self.is_ff_written = byte == JPEG_MARKER_START_BYTE;
        }
    }

    fn end_scan(&mut self) {
        if self.bit_count > 0 {
            let width = if self.is_ff_written { 7 } else { 8 };
            self.append_to_bit_stream(0, width - self.bit_count);
        }

        // A trailing 0xFF would merge with the next marker.
        if self.is_ff_written {
            self.append_to_bit_stream(0, 7);
        }
    }

    fn write_byte(&mut self, value: u8) {
        match self.destination.get_mut(self.position) {
            Some(slot) => {
                *slot = value;
                self.position += 1;
            }
            None => self.overflow = true,
        }
    }
}
