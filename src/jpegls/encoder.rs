//! Frame level JPEG-LS encoding: marker segments around the scans.

use crate::constants::{
    DESTINATION_SIZE_SLACK, MAXIMUM_COMPONENT_COUNT_IN_SCAN, SPIFF_END_OF_DIRECTORY_SIZE_IN_BYTES,
    SPIFF_HEADER_SIZE_IN_BYTES,
};
use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::jpegls::coding_parameters::{compute_default, compute_limit_parameter, is_default, is_valid};
use crate::jpegls::pixel_layout::PixelLayout;
use crate::jpegls::scan_encoder::ScanEncoder;
use crate::jpegls::{InterleaveMode, JpeglsPcParameters};

/// Encoding parameters of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoder {
    pub frame_info: FrameInfo,
    pub near_lossless: i32,
    pub interleave_mode: InterleaveMode,
    pub preset_coding_parameters: JpeglsPcParameters,
}

impl FrameEncoder {
    pub fn new(frame_info: FrameInfo) -> Self {
        Self {
            frame_info,
            near_lossless: 0,
            interleave_mode: InterleaveMode::None,
            preset_coding_parameters: JpeglsPcParameters::default(),
        }
    }

    fn maximum_sample_value(&self) -> i32 {
        (1 << self.frame_info.bits_per_sample()) - 1
    }

    /// Upper bound of the encoded size: every sample coded with the escape
    /// code (LIMIT bits) and every byte losing one bit to stuffing, plus
    /// marker segments and the SPIFF header.
    pub fn estimated_destination_size(&self) -> Result<usize, JpeglsErrc> {
        let frame_info = &self.frame_info;
        let limit = compute_limit_parameter(frame_info.bits_per_sample()) as usize;
        let component_count = frame_info.component_count() as usize;

        (frame_info.width() as usize)
            .checked_mul(frame_info.height() as usize)
            .and_then(|pixels| pixels.checked_mul(component_count))
            .and_then(|samples| samples.checked_mul(limit + 1))
            .map(|bits| bits / 7)
            .and_then(|size| size.checked_add(component_count * 16))
            .and_then(|size| {
                size.checked_add(DESTINATION_SIZE_SLACK + SPIFF_HEADER_SIZE_IN_BYTES + SPIFF_END_OF_DIRECTORY_SIZE_IN_BYTES)
            })
            .ok_or(JpeglsErrc::InvalidArgumentSize)
    }

    /// Checks parameters that depend on each other and returns the preset
    /// coding parameters completed with defaults.
    pub fn validate(&self) -> Result<JpeglsPcParameters, JpeglsErrc> {
        let component_count = self.frame_info.component_count();
        if self.interleave_mode != InterleaveMode::None
            && !(2..=MAXIMUM_COMPONENT_COUNT_IN_SCAN).contains(&component_count)
        {
            return Err(JpeglsErrc::InvalidArgumentInterleaveMode);
        }
        is_valid(
            &self.preset_coding_parameters,
            self.maximum_sample_value(),
            self.near_lossless,
        )
    }

    /// Writes SOF55, the optional LSE segment, all scans and EOI. SOI must
    /// already be in the stream.
    pub fn encode(&self, source: &[u8], stride: u32, writer: &mut JpegStreamWriter<'_>) -> Result<(), JpeglsErrc> {
        let pc_parameters = self.validate()?;
        let layout = PixelLayout::new(&self.frame_info, self.interleave_mode, stride)?;
        if source.len() < layout.required_size() {
            return Err(JpeglsErrc::InvalidArgumentSize);
        }

        writer.write_start_of_frame_jpegls(&self.frame_info)?;
        let defaults = compute_default(self.maximum_sample_value(), self.near_lossless);
        if !is_default(&self.preset_coding_parameters, &defaults) {
            writer.write_jpegls_preset_parameters_segment(&pc_parameters)?;
        }

        let component_count = self.frame_info.component_count() as usize;
        if self.interleave_mode == InterleaveMode::None {
            for component in 0..component_count {
                let samples = layout.gather(source, &[component], pc_parameters.maximum_sample_value)?;
                self.encode_scan(writer, &pc_parameters, &samples, component, 1)?;
            }
        } else {
            let components: Vec<usize> = (0..component_count).collect();
            let samples = layout.gather(source, &components, pc_parameters.maximum_sample_value)?;
            self.encode_scan(writer, &pc_parameters, &samples, 0, component_count)?;
        }

        writer.write_end_of_image()
    }

    fn encode_scan(
        &self,
        writer: &mut JpegStreamWriter<'_>,
        pc_parameters: &JpeglsPcParameters,
        samples: &[i32],
        first_component: usize,
        component_count: usize,
    ) -> Result<(), JpeglsErrc> {
        writer.write_start_of_scan_segment(
            first_component as u8 + 1,
            component_count as u8,
            self.near_lossless,
            self.interleave_mode,
        )?;

        let bytes_written = ScanEncoder::new(
            self.frame_info.width() as usize,
            self.frame_info.height() as usize,
            pc_parameters,
            self.near_lossless,
            writer.remaining_slice(),
        )
        .encode_scan(samples, component_count, self.interleave_mode)?;
        writer.advance(bytes_written);

        log::trace!(
            "encoded scan of {component_count} component(s) starting at {first_component}: {bytes_written} bytes"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel_stream_layout() {
        let frame_encoder = FrameEncoder::new(FrameInfo::new(1, 1, 8, 1).unwrap());
        let mut destination = vec![0u8; frame_encoder.estimated_destination_size().unwrap()];
        let mut writer = JpegStreamWriter::new(&mut destination);
        writer.write_start_of_image().unwrap();
        frame_encoder.encode(&[77], 0, &mut writer).unwrap();
        let length = writer.len();

        assert_eq!(&destination[..2], &[0xFF, 0xD8]);
        assert_eq!(&destination[2..4], &[0xFF, 0xF7]);
        assert_eq!(&destination[15..17], &[0xFF, 0xDA]);
        assert_eq!(&destination[length - 2..length], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_preset_parameters_segment_only_when_not_default() {
        let mut frame_encoder = FrameEncoder::new(FrameInfo::new(2, 2, 8, 1).unwrap());
        frame_encoder.preset_coding_parameters = JpeglsPcParameters {
            reset_value: 32,
            ..Default::default()
        };
        let mut destination = vec![0u8; frame_encoder.estimated_destination_size().unwrap()];
        let mut writer = JpegStreamWriter::new(&mut destination);
        frame_encoder.encode(&[1, 2, 3, 4], 0, &mut writer).unwrap();

        // SOF55 (2 + 11 bytes) is followed by LSE.
        assert_eq!(&destination[13..15], &[0xFF, 0xF8]);
        assert_eq!(&destination[16..24], &[13, 1, 0, 255, 0, 3, 0, 7]);
    }

    #[test]
    fn test_interleave_mode_requires_two_to_four_components() {
        let mut frame_encoder = FrameEncoder::new(FrameInfo::new(1, 1, 8, 5).unwrap());
        frame_encoder.interleave_mode = InterleaveMode::Sample;
        assert_eq!(frame_encoder.validate(), Err(JpeglsErrc::InvalidArgumentInterleaveMode));
    }

    #[test]
    fn test_source_too_small() {
        let frame_encoder = FrameEncoder::new(FrameInfo::new(2, 2, 8, 1).unwrap());
        let mut destination = vec![0u8; 1024];
        let mut writer = JpegStreamWriter::new(&mut destination);
        assert_eq!(
            frame_encoder.encode(&[1, 2, 3], 0, &mut writer),
            Err(JpeglsErrc::InvalidArgumentSize)
        );
    }

    #[test]
    fn test_near_lossless_above_limit() {
        let mut frame_encoder = FrameEncoder::new(FrameInfo::new(1, 1, 2, 1).unwrap());
        frame_encoder.near_lossless = 2;
        assert_eq!(frame_encoder.validate(), Err(JpeglsErrc::InvalidArgumentNearLossless));
    }
}
