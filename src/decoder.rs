//! JPEG-LS decoder session over a native codec context.

use crate::constants::AUTO_CALCULATE_STRIDE;
use crate::error::CodecError;
use crate::frame_info::FrameInfo;
use crate::handle::{Decoder, NativeCodecHandle};
use crate::jpegls::{InterleaveMode, JpeglsPcParameters};
use crate::native::{FrameInfoNative, SpiffHeaderNative};
use crate::spiff::SpiffHeader;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    SourceBound,
    HeaderRead,
    Decoded,
}

/// Everything `read_header` learns about the stream.
#[derive(Debug, Clone, Copy)]
struct StreamHeader {
    frame_info: FrameInfo,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
    preset_coding_parameters: JpeglsPcParameters,
    spiff_header: Option<SpiffHeader>,
}

/// Decodes one JPEG-LS stream held in memory.
///
/// The source is bound on construction. `read_header` must run exactly once
/// before `decode` (or `decode_into`), which may also run only once.
pub struct JpegLsDecoder<'a> {
    handle: NativeCodecHandle<Decoder>,
    state: DecoderState,
    header: Option<StreamHeader>,
    source: PhantomData<&'a [u8]>,
}

impl<'a> JpegLsDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Result<Self, CodecError> {
        let mut handle = NativeCodecHandle::create()?;
        handle.invoke(|api, raw| unsafe {
            (api.decoder_set_source_buffer)(raw, source.as_ptr().cast(), source.len())
        })?;

        Ok(Self {
            handle,
            state: DecoderState::SourceBound,
            header: None,
            source: PhantomData,
        })
    }

    /// Parses the SPIFF header, if any, and the frame and first scan headers.
    pub fn read_header(&mut self) -> Result<(), CodecError> {
        if self.state != DecoderState::SourceBound {
            return Err(CodecError::InvalidOperationOrder("the header has already been read", None));
        }

        let mut spiff_native = SpiffHeaderNative::default();
        let mut header_found = 0i32;
        self.handle.invoke(|api, raw| unsafe {
            (api.decoder_read_spiff_header)(raw, &mut spiff_native, &mut header_found)
        })?;
        self.handle
            .invoke(|api, raw| unsafe { (api.decoder_read_header)(raw) })?;

        let mut frame_native = FrameInfoNative::default();
        self.handle
            .invoke(|api, raw| unsafe { (api.decoder_get_frame_info)(raw, &mut frame_native) })?;
        let mut near_lossless = 0i32;
        self.handle
            .invoke(|api, raw| unsafe { (api.decoder_get_near_lossless)(raw, 0, &mut near_lossless) })?;
        let mut interleave_mode = 0i32;
        self.handle
            .invoke(|api, raw| unsafe { (api.decoder_get_interleave_mode)(raw, &mut interleave_mode) })?;
        let mut preset_coding_parameters = JpeglsPcParameters::default();
        self.handle.invoke(|api, raw| unsafe {
            (api.decoder_get_preset_coding_parameters)(raw, 0, &mut preset_coding_parameters)
        })?;

        let spiff_header = if header_found != 0 {
            Some(SpiffHeader::try_from(&spiff_native)?)
        } else {
            None
        };
        let header = StreamHeader {
            frame_info: FrameInfo::from_native(&frame_native)?,
            near_lossless,
            interleave_mode: InterleaveMode::from_native(interleave_mode)?,
            preset_coding_parameters,
            spiff_header,
        };
        log::trace!(
            "read header: {:?}, near lossless {}, {:?}",
            header.frame_info,
            header.near_lossless,
            header.interleave_mode
        );

        self.header = Some(header);
        self.state = DecoderState::HeaderRead;
        Ok(())
    }

    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.header.map(|header| header.frame_info)
    }

    pub fn near_lossless(&self) -> Option<i32> {
        self.header.map(|header| header.near_lossless)
    }

    pub fn interleave_mode(&self) -> Option<InterleaveMode> {
        self.header.map(|header| header.interleave_mode)
    }

    /// Preset coding parameters stored in the stream; all zero when the
    /// stream uses the defaults.
    pub fn preset_coding_parameters(&self) -> Option<JpeglsPcParameters> {
        self.header.map(|header| header.preset_coding_parameters)
    }

    /// The SPIFF header, when the stream starts with one.
    pub fn spiff_header(&self) -> Option<&SpiffHeader> {
        self.header.as_ref().and_then(|header| header.spiff_header.as_ref())
    }

    fn require_header_read(&self) -> Result<(), CodecError> {
        match self.state {
            DecoderState::HeaderRead => Ok(()),
            DecoderState::SourceBound => Err(CodecError::InvalidOperationOrder("the header has not been read", None)),
            DecoderState::Decoded => Err(CodecError::InvalidOperationOrder("the image has already been decoded", None)),
        }
    }

    /// Checks `stride` against the frame before the native codec sees it; a
    /// rejected call there would leave the session unusable.
    fn required_destination_size(&self, stride: u32) -> Result<usize, CodecError> {
        self.require_header_read()?;
        match self.header {
            Some(header) => header.frame_info.buffer_size(header.interleave_mode, stride),
            None => Err(CodecError::InvalidOperationOrder("the header has not been read", None)),
        }
    }

    /// Size of the buffer `decode_into` needs for `stride` (0: tightly packed).
    pub fn destination_size(&mut self, stride: u32) -> Result<usize, CodecError> {
        self.required_destination_size(stride)?;

        let mut size = 0usize;
        self.handle
            .invoke(|api, raw| unsafe { (api.decoder_get_destination_size)(raw, stride, &mut size) })?;
        Ok(size)
    }

    /// Decodes into a new, tightly packed buffer.
    pub fn decode(&mut self) -> Result<Vec<u8>, CodecError> {
        let size = self.destination_size(AUTO_CALCULATE_STRIDE)?;
        let mut destination = crate::zeroed_buffer(size)?;
        self.decode_into(&mut destination, AUTO_CALCULATE_STRIDE)?;
        Ok(destination)
    }

    /// Decodes into `destination` with rows `stride` bytes apart.
    pub fn decode_into(&mut self, destination: &mut [u8], stride: u32) -> Result<(), CodecError> {
        if destination.len() < self.required_destination_size(stride)? {
            return Err(CodecError::invalid_argument("destination is smaller than the frame"));
        }

        self.handle.invoke(|api, raw| unsafe {
            (api.decoder_decode_to_buffer)(raw, destination.as_mut_ptr().cast(), destination.len(), stride)
        })?;
        self.state = DecoderState::Decoded;
        Ok(())
    }

    /// Releases the native context. Further calls fail; closing again is a
    /// no-op.
    pub fn close(&mut self) {
        self.handle.release();
    }
}
