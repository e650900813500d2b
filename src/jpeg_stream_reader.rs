//! JPEG-LS codestream reader: marker segments up to and between scans.

use crate::constants::SPIFF_END_OF_DIRECTORY_ENTRY_TYPE;
use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpegls::coding_parameters::{CodingParameters, JpeglsPcParameters};
use crate::jpegls::InterleaveMode;
use crate::spiff::{SpiffHeader, SpiffHeaderCodec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegStreamReaderState {
    BeforeStartOfImage,
    SpiffHeaderSection,
    HeaderSection,
    ScanSection,
    EndOfImage,
}

/// Components and parameters of one SOS segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    /// Indices into the frame's component list, in scan order.
    pub component_indices: Vec<usize>,
    pub near_lossless: i32,
    pub interleave_mode: InterleaveMode,
}

pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    state: JpegStreamReaderState,
    frame_info: Option<FrameInfo>,
    component_ids: Vec<u8>,
    parameters: CodingParameters,
    preset_coding_parameters: JpeglsPcParameters,
    spiff_header: Option<SpiffHeader>,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            state: JpegStreamReaderState::BeforeStartOfImage,
            frame_info: None,
            component_ids: Vec::new(),
            parameters: CodingParameters::default(),
            preset_coding_parameters: JpeglsPcParameters::default(),
            spiff_header: None,
        }
    }

    pub fn state(&self) -> JpegStreamReaderState {
        self.state
    }

    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.frame_info
    }

    /// Coding parameters of the first scan.
    pub fn parameters(&self) -> CodingParameters {
        self.parameters
    }

    /// Preset coding parameters as stored in the stream; all zero when the
    /// stream has no LSE segment.
    pub fn preset_coding_parameters(&self) -> JpeglsPcParameters {
        self.preset_coding_parameters
    }

    pub fn spiff_header(&self) -> Option<SpiffHeader> {
        self.spiff_header
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position.min(self.source.len())..]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, count: usize) {
        self.position += count;
    }

    /// Reads SOI and, when one directly follows it, the SPIFF header and its
    /// directory.
    pub fn read_spiff_header(&mut self) -> Result<Option<SpiffHeader>, JpeglsErrc> {
        if self.state != JpegStreamReaderState::BeforeStartOfImage {
            return Err(JpeglsErrc::InvalidOperation);
        }
        self.read_start_of_image()?;

        let segment_start = self.position;
        if self.try_read_marker()? == Some(JpegMarkerCode::ApplicationData8) {
            let payload = self.read_segment_payload()?;
            if let Some(header) = SpiffHeaderCodec::decode_payload(payload)? {
                self.state = JpegStreamReaderState::SpiffHeaderSection;
                self.read_spiff_directory()?;
                self.spiff_header = Some(header);
                return Ok(Some(header));
            }
        }

        // Not a SPIFF header: leave the segment to the header parser.
        self.position = segment_start;
        self.state = JpegStreamReaderState::HeaderSection;
        Ok(None)
    }

    /// Reads the marker segments up to and including the first SOS. On
    /// success the position is at the first byte of entropy coded data.
    pub fn read_header(&mut self) -> Result<ScanHeader, JpeglsErrc> {
        if self.state == JpegStreamReaderState::BeforeStartOfImage {
            self.read_spiff_header()?;
        }
        if self.state != JpegStreamReaderState::HeaderSection {
            return Err(JpeglsErrc::InvalidOperation);
        }

        loop {
            match self.read_marker()? {
                JpegMarkerCode::StartOfFrameJpegls => self.read_start_of_frame_segment()?,
                JpegMarkerCode::StartOfScan => {
                    if self.frame_info.is_none() {
                        return Err(JpeglsErrc::UnexpectedStartOfScanMarker);
                    }
                    let scan_header = self.read_start_of_scan_segment()?;
                    self.parameters.near_lossless = scan_header.near_lossless;
                    self.parameters.interleave_mode = scan_header.interleave_mode;
                    return Ok(scan_header);
                }
                marker => self.read_table_or_misc_segment(marker)?,
            }
        }
    }

    /// Reads the SOS of the next scan. The position must be at the marker that
    /// ended the previous scan.
    pub fn read_next_start_of_scan(&mut self) -> Result<ScanHeader, JpeglsErrc> {
        if self.state != JpegStreamReaderState::ScanSection {
            return Err(JpeglsErrc::InvalidOperation);
        }

        loop {
            match self.read_marker()? {
                JpegMarkerCode::StartOfScan => return self.read_start_of_scan_segment(),
                JpegMarkerCode::StartOfFrameJpegls => return Err(JpeglsErrc::DuplicateStartOfFrameMarker),
                marker => self.read_table_or_misc_segment(marker)?,
            }
        }
    }

    pub fn read_end_of_image(&mut self) -> Result<(), JpeglsErrc> {
        match self.read_marker() {
            Ok(JpegMarkerCode::EndOfImage) => {
                self.state = JpegStreamReaderState::EndOfImage;
                Ok(())
            }
            Err(JpeglsErrc::SourceBufferTooSmall) | Ok(_) => Err(JpeglsErrc::EndOfImageMarkerNotFound),
            Err(error) => Err(error),
        }
    }

    fn read_table_or_misc_segment(&mut self, marker: JpegMarkerCode) -> Result<(), JpeglsErrc> {
        match marker {
            JpegMarkerCode::JpeglsPresetParameters => self.read_jpegls_preset_parameters_segment(),
            JpegMarkerCode::DefineRestartInterval => self.read_define_restart_interval_segment(),
            JpegMarkerCode::StartOfImage => Err(JpeglsErrc::DuplicateStartOfImageMarker),
            JpegMarkerCode::EndOfImage => Err(JpeglsErrc::UnexpectedEndOfImageMarker),
            JpegMarkerCode::DefineNumberOfLines => Err(JpeglsErrc::UnexpectedDefineNumberOfLinesMarker),
            JpegMarkerCode::Comment => self.skip_segment(),
            marker if marker.is_application_data() => self.skip_segment(),
            marker if marker.is_unsupported_start_of_frame() => Err(JpeglsErrc::EncodingNotSupported),
            _ => Err(JpeglsErrc::UnexpectedMarkerFound),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, JpeglsErrc> {
        let value = *self
            .source
            .get(self.position)
            .ok_or(JpeglsErrc::SourceBufferTooSmall)?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, JpeglsErrc> {
        Ok(u16::from_be_bytes([self.read_u8()?, self.read_u8()?]))
    }

    pub fn read_u32(&mut self) -> Result<u32, JpeglsErrc> {
        Ok(u32::from_be_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    /// Reads a marker, skipping fill bytes (extra 0xFF) before the marker code.
    pub fn read_marker(&mut self) -> Result<JpegMarkerCode, JpeglsErrc> {
        if self.read_u8()? != JPEG_MARKER_START_BYTE {
            return Err(JpeglsErrc::JpegMarkerStartByteNotFound);
        }

        let mut code = self.read_u8()?;
        while code == JPEG_MARKER_START_BYTE {
            code = self.read_u8()?;
        }
        JpegMarkerCode::try_from(code)
    }

    fn try_read_marker(&mut self) -> Result<Option<JpegMarkerCode>, JpeglsErrc> {
        match self.read_marker() {
            Ok(marker) => Ok(Some(marker)),
            Err(JpeglsErrc::UnknownJpegMarkerFound) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn read_start_of_image(&mut self) -> Result<(), JpeglsErrc> {
        if self.read_marker()? != JpegMarkerCode::StartOfImage {
            return Err(JpeglsErrc::StartOfImageMarkerNotFound);
        }
        self.state = JpegStreamReaderState::HeaderSection;
        Ok(())
    }

    /// Returns the bytes of a segment after its length field.
    fn read_segment_payload(&mut self) -> Result<&'a [u8], JpeglsErrc> {
        let length = usize::from(self.read_u16()?);
        if length < 2 {
            return Err(JpeglsErrc::InvalidMarkerSegmentSize);
        }
        let end = self.position + length - 2;
        let source = self.source;
        let payload = source
            .get(self.position..end)
            .ok_or(JpeglsErrc::SourceBufferTooSmall)?;
        self.position = end;
        Ok(payload)
    }

    fn skip_segment(&mut self) -> Result<(), JpeglsErrc> {
        self.read_segment_payload().map(|_| ())
    }

    // SPIFF directory entries are APP8 segments; the end-of-directory entry
    // carries the SOI of the wrapped stream as its last two bytes.
    fn read_spiff_directory(&mut self) -> Result<(), JpeglsErrc> {
        loop {
            if self.read_marker()? != JpegMarkerCode::ApplicationData8 {
                return Err(JpeglsErrc::MissingEndOfSpiffDirectory);
            }

            let payload = self.read_segment_payload()?;
            if payload.len() < 4 {
                return Err(JpeglsErrc::InvalidMarkerSegmentSize);
            }
            let entry_type = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
            if entry_type == SPIFF_END_OF_DIRECTORY_ENTRY_TYPE {
                if payload[4..] != [JPEG_MARKER_START_BYTE, JpegMarkerCode::StartOfImage as u8] {
                    return Err(JpeglsErrc::InvalidMarkerSegmentSize);
                }
                self.state = JpegStreamReaderState::HeaderSection;
                return Ok(());
            }
            log::trace!("skipping SPIFF directory entry of type {entry_type}");
        }
    }

    fn read_start_of_frame_segment(&mut self) -> Result<(), JpeglsErrc> {
        if self.frame_info.is_some() {
            return Err(JpeglsErrc::DuplicateStartOfFrameMarker);
        }

        let payload = self.read_segment_payload()?;
        if payload.len() < 6 {
            return Err(JpeglsErrc::InvalidMarkerSegmentSize);
        }

        let bits_per_sample = i32::from(payload[0]);
        let height = u32::from(u16::from_be_bytes([payload[1], payload[2]]));
        let width = u32::from(u16::from_be_bytes([payload[3], payload[4]]));
        let component_count = usize::from(payload[5]);

        if !(2..=16).contains(&bits_per_sample) {
            return Err(JpeglsErrc::InvalidParameterBitsPerSample);
        }
        if height == 0 {
            return Err(JpeglsErrc::InvalidParameterHeight);
        }
        if width == 0 {
            return Err(JpeglsErrc::InvalidParameterWidth);
        }
        if component_count == 0 {
            return Err(JpeglsErrc::InvalidParameterComponentCount);
        }
        if payload.len() != 6 + component_count * 3 {
            return Err(JpeglsErrc::InvalidMarkerSegmentSize);
        }

        let mut component_ids = Vec::with_capacity(component_count);
        for component in payload[6..].chunks_exact(3) {
            if component_ids.contains(&component[0]) {
                return Err(JpeglsErrc::DuplicateComponentIdInSofSegment);
            }
            component_ids.push(component[0]);
        }

        let frame_info = FrameInfo::new(width, height, bits_per_sample, component_count as i32)
            .map_err(|_| JpeglsErrc::InvalidEncodedData)?;
        log::trace!("read SOF55: {frame_info:?}");
        self.frame_info = Some(frame_info);
        self.component_ids = component_ids;
        Ok(())
    }

    fn read_jpegls_preset_parameters_segment(&mut self) -> Result<(), JpeglsErrc> {
        let payload = self.read_segment_payload()?;
        let parameter_type = *payload.first().ok_or(JpeglsErrc::InvalidMarkerSegmentSize)?;
        match parameter_type {
            1 => {
                if payload.len() != 11 {
                    return Err(JpeglsErrc::InvalidMarkerSegmentSize);
                }
                let field = |index: usize| i32::from(u16::from_be_bytes([payload[1 + index * 2], payload[2 + index * 2]]));
                self.preset_coding_parameters = JpeglsPcParameters {
                    maximum_sample_value: field(0),
                    threshold1: field(1),
                    threshold2: field(2),
                    threshold3: field(3),
                    reset_value: field(4),
                };
                Ok(())
            }
            // Mapping tables and oversize image dimensions.
            2..=4 => Err(JpeglsErrc::ParameterValueNotSupported),
            // ISO/IEC 14495-2 extensions.
            5..=0xD => Err(JpeglsErrc::JpeglsPresetExtendedParameterTypeNotSupported),
            _ => Err(JpeglsErrc::InvalidJpeglsPresetParameterType),
        }
    }

    fn read_define_restart_interval_segment(&mut self) -> Result<(), JpeglsErrc> {
        let payload = self.read_segment_payload()?;
        let restart_interval = match payload.len() {
            2 => u32::from(u16::from_be_bytes([payload[0], payload[1]])),
            3 => u32::from_be_bytes([0, payload[0], payload[1], payload[2]]),
            4 => u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
            _ => return Err(JpeglsErrc::InvalidMarkerSegmentSize),
        };
        self.parameters.restart_interval = restart_interval;
        Ok(())
    }

    fn read_start_of_scan_segment(&mut self) -> Result<ScanHeader, JpeglsErrc> {
        let payload = self.read_segment_payload()?;
        let component_count = usize::from(*payload.first().ok_or(JpeglsErrc::InvalidMarkerSegmentSize)?);
        if component_count == 0 || component_count > 4 {
            return Err(JpeglsErrc::InvalidParameterComponentCount);
        }
        if payload.len() != 1 + component_count * 2 + 3 {
            return Err(JpeglsErrc::InvalidMarkerSegmentSize);
        }

        let mut component_indices = Vec::with_capacity(component_count);
        for selector in payload[1..1 + component_count * 2].chunks_exact(2) {
            let index = self
                .component_ids
                .iter()
                .position(|&id| id == selector[0])
                .ok_or(JpeglsErrc::UnknownComponentId)?;
            component_indices.push(index);
        }

        let parameters = &payload[1 + component_count * 2..];
        let near_lossless = i32::from(parameters[0]);
        let interleave_mode = InterleaveMode::try_from(parameters[1])?;
        if component_count == 1 && interleave_mode != InterleaveMode::None {
            return Err(JpeglsErrc::InvalidParameterInterleaveMode);
        }
        if parameters[2] != 0 {
            // Point transform
            return Err(JpeglsErrc::ParameterValueNotSupported);
        }

        self.state = JpegStreamReaderState::ScanSection;
        Ok(ScanHeader {
            component_indices,
            near_lossless,
            interleave_mode,
        })
    }
}
