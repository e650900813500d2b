//! JPEG-LS codestream writer.
//!
//! `JpegStreamWriter` emits the marker segments of a JPEG-LS interchange
//! stream (SOI, SPIFF, SOF55, LSE, SOS, EOI) into a caller-owned buffer.
//! Entropy coded data is written by the scan encoder straight into
//! [`JpegStreamWriter::remaining_slice`].

use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpegls::{InterleaveMode, JpeglsPcParameters};
use crate::spiff::{SpiffHeader, SpiffHeaderCodec};

/// A writer for JPEG-LS codestreams that tracks the write position.
pub struct JpegStreamWriter<'a> {
    destination: &'a mut [u8],
    position: usize,
}

impl<'a> JpegStreamWriter<'a> {
    pub fn new(destination: &'a mut [u8]) -> Self {
        Self {
            destination,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.position
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), JpeglsErrc> {
        let slot = self
            .destination
            .get_mut(self.position)
            .ok_or(JpeglsErrc::DestinationBufferTooSmall)?;
        *slot = value;
        self.position += 1;
        Ok(())
    }

    pub fn write_bytes(&mut self, values: &[u8]) -> Result<(), JpeglsErrc> {
        let end = self.position + values.len();
        self.destination
            .get_mut(self.position..end)
            .ok_or(JpeglsErrc::DestinationBufferTooSmall)?
            .copy_from_slice(values);
        self.position = end;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), JpeglsErrc> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) -> Result<(), JpeglsErrc> {
        self.write_byte(JPEG_MARKER_START_BYTE)?;
        self.write_byte(marker as u8)
    }

    /// Writes a marker followed by the segment length (which counts itself).
    fn write_segment_header(&mut self, marker: JpegMarkerCode, payload_size: usize) -> Result<(), JpeglsErrc> {
        let length = u16::try_from(payload_size + 2).map_err(|_| JpeglsErrc::InvalidMarkerSegmentSize)?;
        self.write_marker(marker)?;
        self.write_u16(length)
    }

    pub fn write_start_of_image(&mut self) -> Result<(), JpeglsErrc> {
        self.write_marker(JpegMarkerCode::StartOfImage)
    }

    pub fn write_end_of_image(&mut self) -> Result<(), JpeglsErrc> {
        self.write_marker(JpegMarkerCode::EndOfImage)
    }

    pub fn write_spiff_header_segment(&mut self, spiff_header: &SpiffHeader) -> Result<(), JpeglsErrc> {
        self.write_bytes(&SpiffHeaderCodec::encode(spiff_header)?)
    }

    /// Writes the SPIFF end-of-directory entry. The entry ends with the SOI
    /// of the wrapped stream, so no separate SOI follows it.
    pub fn write_spiff_end_of_directory_entry(&mut self) -> Result<(), JpeglsErrc> {
        self.write_bytes(&SpiffHeaderCodec::END_OF_DIRECTORY)
    }

    pub fn write_start_of_frame_jpegls(&mut self, frame_info: &FrameInfo) -> Result<(), JpeglsErrc> {
        let component_count = frame_info.component_count();
        self.write_segment_header(JpegMarkerCode::StartOfFrameJpegls, 6 + component_count as usize * 3)?;

        self.write_byte(frame_info.bits_per_sample() as u8)?;
        self.write_u16(frame_info.height() as u16)?;
        self.write_u16(frame_info.width() as u16)?;
        self.write_byte(component_count as u8)?;

        for component_id in 1..=component_count {
            self.write_byte(component_id as u8)?;
            self.write_byte(0x11)?; // H=1, V=1
            self.write_byte(0)?; // Tq
        }
        Ok(())
    }

    pub fn write_jpegls_preset_parameters_segment(&mut self, pc: &JpeglsPcParameters) -> Result<(), JpeglsErrc> {
        self.write_segment_header(JpegMarkerCode::JpeglsPresetParameters, 1 + 5 * 2)?;
        self.write_byte(1)?; // Type 1: preset coding parameters

        self.write_u16(pc.maximum_sample_value as u16)?;
        self.write_u16(pc.threshold1 as u16)?;
        self.write_u16(pc.threshold2 as u16)?;
        self.write_u16(pc.threshold3 as u16)?;
        self.write_u16(pc.reset_value as u16)
    }

    /// Writes an SOS segment for `component_count` consecutive components,
    /// the first one with id `first_component_id`.
    pub fn write_start_of_scan_segment(
        &mut self,
        first_component_id: u8,
        component_count: u8,
        near_lossless: i32,
        interleave_mode: InterleaveMode,
    ) -> Result<(), JpeglsErrc> {
        self.write_segment_header(JpegMarkerCode::StartOfScan, 1 + component_count as usize * 2 + 3)?;

        self.write_byte(component_count)?;
        for offset in 0..component_count {
            self.write_byte(first_component_id + offset)?;
            self.write_byte(0)?; // Mapping table selector
        }

        self.write_byte(near_lossless as u8)?;
        self.write_byte(interleave_mode.into())?;
        self.write_byte(0) // Ah, Al point transform
    }

    pub fn remaining_slice(&mut self) -> &mut [u8] {
        let position = self.position.min(self.destination.len());
        &mut self.destination[position..]
    }

    pub fn advance(&mut self, count: usize) {
        self.position += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_frame_segment() {
        let mut buffer = [0u8; 32];
        let mut writer = JpegStreamWriter::new(&mut buffer);
        let frame_info = FrameInfo::new(0x0102, 0x0304, 8, 2).unwrap();
        writer.write_start_of_frame_jpegls(&frame_info).unwrap();
        let length = writer.len();
        assert_eq!(
            &buffer[..length],
            &[0xFF, 0xF7, 0x00, 0x0E, 8, 0x03, 0x04, 0x01, 0x02, 2, 1, 0x11, 0, 2, 0x11, 0]
        );
    }

    #[test]
    fn test_start_of_scan_segment() {
        let mut buffer = [0u8; 16];
        let mut writer = JpegStreamWriter::new(&mut buffer);
        writer
            .write_start_of_scan_segment(2, 1, 3, InterleaveMode::None)
            .unwrap();
        let length = writer.len();
        assert_eq!(&buffer[..length], &[0xFF, 0xDA, 0x00, 0x08, 1, 2, 0, 3, 0, 0]);
    }

    #[test]
    fn test_write_past_end_fails() {
        let mut buffer = [0u8; 3];
        let mut writer = JpegStreamWriter::new(&mut buffer);
        writer.write_start_of_image().unwrap();
        assert_eq!(writer.write_end_of_image(), Err(JpeglsErrc::DestinationBufferTooSmall));
    }
}
