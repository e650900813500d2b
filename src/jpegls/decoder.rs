//! Frame level JPEG-LS decoding.

use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpeg_stream_reader::{JpegStreamReader, ScanHeader};
use crate::jpegls::coding_parameters::is_valid;
use crate::jpegls::pixel_layout::PixelLayout;
use crate::jpegls::scan_decoder::ScanDecoder;
use crate::jpegls::{InterleaveMode, JpeglsPcParameters};
use crate::spiff::SpiffHeader;

pub struct FrameDecoder<'a> {
    reader: JpegStreamReader<'a>,
    first_scan: Option<ScanHeader>,
}

impl<'a> FrameDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
            first_scan: None,
        }
    }

    pub fn read_spiff_header(&mut self) -> Result<Option<SpiffHeader>, JpeglsErrc> {
        self.reader.read_spiff_header()
    }

    /// Reads the frame header and the first SOS segment and checks them
    /// against each other and against the SPIFF header, if any.
    pub fn read_header(&mut self) -> Result<(), JpeglsErrc> {
        let scan_header = self.reader.read_header()?;
        let frame_info = self.frame_info()?;

        if let Some(spiff_header) = self.reader.spiff_header() {
            spiff_header.validate_for_frame(&frame_info)?;
        }
        if self.reader.parameters().restart_interval != 0 {
            return Err(JpeglsErrc::ParameterValueNotSupported);
        }
        if scan_header.interleave_mode != InterleaveMode::None
            && scan_header.component_indices.len() != frame_info.component_count() as usize
        {
            return Err(JpeglsErrc::ParameterValueNotSupported);
        }
        self.validated_preset_coding_parameters(scan_header.near_lossless)?;

        self.first_scan = Some(scan_header);
        Ok(())
    }

    pub fn frame_info(&self) -> Result<FrameInfo, JpeglsErrc> {
        self.reader.frame_info().ok_or(JpeglsErrc::InvalidOperation)
    }

    fn first_scan(&self) -> Result<&ScanHeader, JpeglsErrc> {
        self.first_scan.as_ref().ok_or(JpeglsErrc::InvalidOperation)
    }

    pub fn near_lossless(&self) -> Result<i32, JpeglsErrc> {
        Ok(self.first_scan()?.near_lossless)
    }

    pub fn interleave_mode(&self) -> Result<InterleaveMode, JpeglsErrc> {
        Ok(self.first_scan()?.interleave_mode)
    }

    /// The preset coding parameters as stored in the stream (all zero when
    /// absent).
    pub fn preset_coding_parameters(&self) -> JpeglsPcParameters {
        self.reader.preset_coding_parameters()
    }

    fn validated_preset_coding_parameters(&self, near_lossless: i32) -> Result<JpeglsPcParameters, JpeglsErrc> {
        let maximum_sample_value = (1 << self.frame_info()?.bits_per_sample()) - 1;
        is_valid(
            &self.reader.preset_coding_parameters(),
            maximum_sample_value,
            near_lossless,
        )
        .map_err(|error| match error {
            JpeglsErrc::InvalidArgumentNearLossless => JpeglsErrc::InvalidParameterNearLossless,
            _ => JpeglsErrc::InvalidParameterJpeglsPresetParameters,
        })
    }

    /// Size of the buffer [`FrameDecoder::decode`] needs for `stride`.
    pub fn destination_size(&self, stride: u32) -> Result<usize, JpeglsErrc> {
        let layout = PixelLayout::new(&self.frame_info()?, self.interleave_mode()?, stride)?;
        Ok(layout.required_size())
    }

    /// Decodes every scan into `destination` and checks that the stream ends
    /// with EOI.
    pub fn decode(&mut self, destination: &mut [u8], stride: u32) -> Result<(), JpeglsErrc> {
        let frame_info = self.frame_info()?;
        let first_scan = self.first_scan()?.clone();
        let layout = PixelLayout::new(&frame_info, first_scan.interleave_mode, stride)?;
        if destination.len() < layout.required_size() {
            return Err(JpeglsErrc::DestinationBufferTooSmall);
        }

        let component_count = frame_info.component_count() as usize;
        let mut decoded = vec![false; component_count];
        let mut scan_header = first_scan;
        loop {
            for &index in &scan_header.component_indices {
                if std::mem::replace(&mut decoded[index], true) {
                    return Err(JpeglsErrc::InvalidEncodedData);
                }
            }
            if scan_header.interleave_mode != InterleaveMode::None
                && scan_header.component_indices.len() != component_count
            {
                return Err(JpeglsErrc::ParameterValueNotSupported);
            }

            let samples = self.decode_scan(&frame_info, &scan_header)?;
            layout.scatter(&samples, &scan_header.component_indices, destination);

            if decoded.iter().all(|&done| done) {
                break;
            }
            scan_header = self.reader.read_next_start_of_scan()?;
        }

        self.reader.read_end_of_image()
    }

    fn decode_scan(&mut self, frame_info: &FrameInfo, scan_header: &ScanHeader) -> Result<Vec<i32>, JpeglsErrc> {
        let pc_parameters = self.validated_preset_coding_parameters(scan_header.near_lossless)?;
        let width = frame_info.width() as usize;
        let height = frame_info.height() as usize;
        let component_count = scan_header.component_indices.len();

        let mut samples = vec![0i32; width * height * component_count];
        let consumed = ScanDecoder::new(
            width,
            height,
            &pc_parameters,
            scan_header.near_lossless,
            self.reader.remaining_data(),
        )
        .decode_scan(&mut samples, component_count, scan_header.interleave_mode)?;
        self.reader.advance(consumed);

        log::trace!("decoded scan of {component_count} component(s): {consumed} bytes");
        Ok(samples)
    }
}
