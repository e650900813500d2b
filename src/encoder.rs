//! JPEG-LS encoder session over a native codec context.

use crate::constants::{AUTO_CALCULATE_STRIDE, MAXIMUM_NEAR_LOSSLESS};
use crate::error::CodecError;
use crate::frame_info::FrameInfo;
use crate::handle::{Encoder, NativeCodecHandle};
use crate::jpegls::{InterleaveMode, JpeglsPcParameters};
use crate::spiff::{SpiffColorSpace, SpiffHeader, SpiffResolutionUnits};
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Created,
    FrameInfoSet,
    HeaderWritten,
    DestinationBound,
    Encoded,
}

/// A SPIFF header accepted before the destination is bound. The native codec
/// writes it as soon as it has somewhere to write to.
#[derive(Debug, Clone, Copy)]
enum PendingSpiffHeader {
    Standard {
        color_space: SpiffColorSpace,
        resolution_units: SpiffResolutionUnits,
        vertical_resolution: u32,
        horizontal_resolution: u32,
    },
    Custom(SpiffHeader),
}

/// Optional settings for [`crate::encode_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub interleave_mode: InterleaveMode,
    pub near_lossless: i32,
    /// Writes a standard SPIFF header with this colour space.
    pub spiff_color_space: Option<SpiffColorSpace>,
    pub preset_coding_parameters: Option<JpeglsPcParameters>,
    /// Row stride of the source; 0 for tightly packed rows.
    pub stride: u32,
}

/// Encodes one image into a caller-provided buffer.
///
/// Calls must follow the session order `set_frame_info`, optionally a SPIFF
/// header, `set_destination`, `encode`, `bytes_written`. Near-lossless,
/// interleave mode and preset coding parameters may be set at any point
/// before `encode`. A call out of order fails with
/// [`CodecError::InvalidOperationOrder`].
///
/// The destination stays mutably borrowed for `'a`, the lifetime of the
/// binding.
pub struct JpegLsEncoder<'a> {
    handle: NativeCodecHandle<Encoder>,
    state: EncoderState,
    frame_info: Option<FrameInfo>,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
    preset_coding_parameters: Option<JpeglsPcParameters>,
    pending_spiff_header: Option<PendingSpiffHeader>,
    bytes_written: Option<usize>,
    destination: PhantomData<&'a mut [u8]>,
}

impl<'a> JpegLsEncoder<'a> {
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            handle: NativeCodecHandle::create()?,
            state: EncoderState::Created,
            frame_info: None,
            near_lossless: 0,
            interleave_mode: InterleaveMode::None,
            preset_coding_parameters: None,
            pending_spiff_header: None,
            bytes_written: None,
            destination: PhantomData,
        })
    }

    pub fn with_frame_info(frame_info: FrameInfo) -> Result<Self, CodecError> {
        let mut encoder = Self::new()?;
        encoder.set_frame_info(frame_info)?;
        Ok(encoder)
    }

    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.frame_info
    }

    pub fn near_lossless(&self) -> i32 {
        self.near_lossless
    }

    pub fn interleave_mode(&self) -> InterleaveMode {
        self.interleave_mode
    }

    pub fn preset_coding_parameters(&self) -> Option<JpeglsPcParameters> {
        self.preset_coding_parameters
    }

    fn transition(&mut self, state: EncoderState) {
        log::trace!("encoder state {:?} -> {state:?}", self.state);
        self.state = state;
    }

    fn require_frame_info(&self) -> Result<FrameInfo, CodecError> {
        self.frame_info
            .ok_or(CodecError::InvalidOperationOrder("frame info has not been set", None))
    }

    fn require_not_encoded(&self) -> Result<(), CodecError> {
        if self.state == EncoderState::Encoded {
            return Err(CodecError::InvalidOperationOrder("the image has already been encoded", None));
        }
        Ok(())
    }

    /// Sets or replaces the frame info. Only valid before a SPIFF header is
    /// written or a destination is bound.
    pub fn set_frame_info(&mut self, frame_info: FrameInfo) -> Result<(), CodecError> {
        if !matches!(self.state, EncoderState::Created | EncoderState::FrameInfoSet) {
            return Err(CodecError::InvalidOperationOrder(
                "frame info must be set before the SPIFF header and destination",
                None,
            ));
        }

        let native = frame_info.to_native();
        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_set_frame_info)(raw, &native) })?;
        self.frame_info = Some(frame_info);
        self.transition(EncoderState::FrameInfoSet);
        Ok(())
    }

    pub fn set_near_lossless(&mut self, near_lossless: i32) -> Result<(), CodecError> {
        self.require_not_encoded()?;
        if !(0..=MAXIMUM_NEAR_LOSSLESS).contains(&near_lossless) {
            return Err(CodecError::invalid_argument("near lossless must be in 0..=255"));
        }

        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_set_near_lossless)(raw, near_lossless) })?;
        self.near_lossless = near_lossless;
        Ok(())
    }

    pub fn set_interleave_mode(&mut self, interleave_mode: InterleaveMode) -> Result<(), CodecError> {
        self.require_not_encoded()?;

        let value = i32::from(u8::from(interleave_mode));
        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_set_interleave_mode)(raw, value) })?;
        self.interleave_mode = interleave_mode;
        Ok(())
    }

    /// Overrides the JPEG-LS preset coding parameters. Zero fields keep their
    /// standard default.
    pub fn set_preset_coding_parameters(&mut self, pc_parameters: JpeglsPcParameters) -> Result<(), CodecError> {
        self.require_not_encoded()?;

        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_set_preset_coding_parameters)(raw, &pc_parameters) })?;
        self.preset_coding_parameters = Some(pc_parameters);
        Ok(())
    }

    /// Upper bound of the encoded size, for sizing the destination.
    pub fn estimated_destination_size(&mut self) -> Result<usize, CodecError> {
        self.require_frame_info()?;

        let mut size = 0usize;
        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_get_estimated_destination_size)(raw, &mut size) })?;
        Ok(size)
    }

    fn require_header_slot(&self) -> Result<FrameInfo, CodecError> {
        match self.state {
            EncoderState::FrameInfoSet => self.require_frame_info(),
            EncoderState::Created => Err(CodecError::InvalidOperationOrder(
                "frame info must be set before writing a SPIFF header",
                None,
            )),
            EncoderState::HeaderWritten => Err(CodecError::InvalidOperationOrder(
                "a SPIFF header has already been written",
                None,
            )),
            EncoderState::DestinationBound | EncoderState::Encoded => Err(CodecError::InvalidOperationOrder(
                "a SPIFF header must be written before the destination is bound",
                None,
            )),
        }
    }

    /// Writes a SPIFF header derived from the frame info.
    pub fn write_standard_spiff_header(
        &mut self,
        color_space: SpiffColorSpace,
        resolution_units: SpiffResolutionUnits,
        vertical_resolution: u32,
        horizontal_resolution: u32,
    ) -> Result<(), CodecError> {
        let frame_info = self.require_header_slot()?;
        if !color_space.accepts_component_count(frame_info.component_count()) {
            return Err(CodecError::invalid_argument(
                "SPIFF colour space does not match the component count",
            ));
        }

        self.pending_spiff_header = Some(PendingSpiffHeader::Standard {
            color_space,
            resolution_units,
            vertical_resolution,
            horizontal_resolution,
        });
        self.transition(EncoderState::HeaderWritten);
        Ok(())
    }

    /// Writes a caller-supplied SPIFF header. It must describe the frame.
    pub fn write_spiff_header(&mut self, spiff_header: &SpiffHeader) -> Result<(), CodecError> {
        let frame_info = self.require_header_slot()?;
        spiff_header.validate()?;
        if spiff_header.validate_for_frame(&frame_info).is_err() {
            return Err(CodecError::invalid_argument("SPIFF header does not describe the frame"));
        }

        self.pending_spiff_header = Some(PendingSpiffHeader::Custom(*spiff_header));
        self.transition(EncoderState::HeaderWritten);
        Ok(())
    }

    /// Binds all of `destination` as the output buffer.
    pub fn set_destination(&mut self, destination: &'a mut [u8]) -> Result<(), CodecError> {
        let length = destination.len();
        self.set_destination_with_length(destination, length)
    }

    /// Binds the first `length` bytes of `destination`. A length of 0 is
    /// accepted and leaves no room for output.
    pub fn set_destination_with_length(&mut self, destination: &'a mut [u8], length: usize) -> Result<(), CodecError> {
        if !matches!(self.state, EncoderState::FrameInfoSet | EncoderState::HeaderWritten) {
            return Err(CodecError::InvalidOperationOrder(
                "the destination must be bound once, after the frame info",
                None,
            ));
        }
        if length > destination.len() {
            return Err(CodecError::invalid_argument("destination length exceeds the buffer"));
        }

        let pointer = destination.as_mut_ptr().cast();
        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_set_destination_buffer)(raw, pointer, length) })?;
        self.flush_pending_spiff_header()?;
        self.transition(EncoderState::DestinationBound);
        Ok(())
    }

    fn flush_pending_spiff_header(&mut self) -> Result<(), CodecError> {
        match self.pending_spiff_header.take() {
            None => Ok(()),
            Some(PendingSpiffHeader::Standard {
                color_space,
                resolution_units,
                vertical_resolution,
                horizontal_resolution,
            }) => {
                let color_space = i32::from(u8::from(color_space));
                let resolution_units = i32::from(u8::from(resolution_units));
                self.handle.invoke(|api, raw| unsafe {
                    (api.encoder_write_standard_spiff_header)(
                        raw,
                        color_space,
                        resolution_units,
                        vertical_resolution,
                        horizontal_resolution,
                    )
                })
            }
            Some(PendingSpiffHeader::Custom(spiff_header)) => {
                let native = spiff_header.to_native();
                self.handle
                    .invoke(|api, raw| unsafe { (api.encoder_write_spiff_header)(raw, &native) })
            }
        }
    }

    /// Encodes tightly packed pixels.
    pub fn encode(&mut self, source: &[u8]) -> Result<(), CodecError> {
        self.encode_with_stride(source, AUTO_CALCULATE_STRIDE)
    }

    /// Encodes pixels whose rows are `stride` bytes apart (0: tightly packed).
    /// With interleave mode `None` the source holds one plane per component.
    /// Every sample must fit the frame's bits per sample; the built-in codec
    /// rejects larger values with [`CodecError::InvalidArgument`].
    pub fn encode_with_stride(&mut self, source: &[u8], stride: u32) -> Result<(), CodecError> {
        if self.state != EncoderState::DestinationBound {
            return Err(CodecError::InvalidOperationOrder(
                "encode requires a bound destination and may only run once",
                None,
            ));
        }
        let frame_info = self.require_frame_info()?;
        let required = frame_info.buffer_size(self.interleave_mode, stride)?;
        if source.len() < required {
            return Err(CodecError::invalid_argument("source is smaller than the frame"));
        }

        self.handle.invoke(|api, raw| unsafe {
            (api.encoder_encode_from_buffer)(raw, source.as_ptr().cast(), source.len(), stride)
        })?;

        let mut bytes_written = 0usize;
        self.handle
            .invoke(|api, raw| unsafe { (api.encoder_get_bytes_written)(raw, &mut bytes_written) })?;
        self.bytes_written = Some(bytes_written);
        self.transition(EncoderState::Encoded);
        Ok(())
    }

    /// Exact number of bytes written to the destination by `encode`.
    pub fn bytes_written(&self) -> Result<usize, CodecError> {
        self.bytes_written
            .ok_or(CodecError::InvalidOperationOrder("nothing has been encoded yet", None))
    }

    /// Releases the native context. Further calls fail; closing again is a
    /// no-op.
    pub fn close(&mut self) {
        self.handle.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> FrameInfo {
        FrameInfo::new(width, height, 8, 1).unwrap()
    }

    #[test]
    fn test_encode_before_destination() {
        let mut encoder = JpegLsEncoder::with_frame_info(gray(1, 1)).unwrap();
        assert!(matches!(
            encoder.encode(&[0]),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_frame_info_cannot_change_after_header() {
        let mut encoder = JpegLsEncoder::with_frame_info(gray(1, 1)).unwrap();
        encoder
            .write_standard_spiff_header(SpiffColorSpace::Grayscale, SpiffResolutionUnits::AspectRatio, 1, 1)
            .unwrap();
        assert!(matches!(
            encoder.set_frame_info(gray(2, 2)),
            Err(CodecError::InvalidOperationOrder(..))
        ));
        assert!(matches!(
            encoder.write_standard_spiff_header(SpiffColorSpace::Grayscale, SpiffResolutionUnits::AspectRatio, 1, 1),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }

    #[test]
    fn test_negative_near_lossless_is_rejected() {
        let mut encoder = JpegLsEncoder::new().unwrap();
        assert!(matches!(
            encoder.set_near_lossless(-1),
            Err(CodecError::InvalidArgument(..))
        ));
        assert_eq!(encoder.near_lossless(), 0);
    }

    #[test]
    fn test_standard_header_colour_space_must_fit() {
        let mut encoder = JpegLsEncoder::with_frame_info(gray(4, 4)).unwrap();
        assert!(matches!(
            encoder.write_standard_spiff_header(SpiffColorSpace::Rgb, SpiffResolutionUnits::AspectRatio, 1, 1),
            Err(CodecError::InvalidArgument(..))
        ));
    }

    #[test]
    fn test_zero_length_destination_fails_natively() {
        let mut encoder = JpegLsEncoder::with_frame_info(gray(2, 2)).unwrap();
        let mut destination = [0u8; 64];
        encoder.set_destination_with_length(&mut destination, 0).unwrap();
        let error = encoder.encode(&[1, 2, 3, 4]).unwrap_err();
        assert_eq!(error.native_code(), Some(3));
    }

    #[test]
    fn test_close_twice() {
        let mut encoder = JpegLsEncoder::new().unwrap();
        encoder.close();
        encoder.close();
        assert!(matches!(
            encoder.set_frame_info(gray(1, 1)),
            Err(CodecError::InvalidOperationOrder(..))
        ));
    }
}
