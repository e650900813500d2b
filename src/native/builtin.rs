//! Built-in native codec: the crate's own JPEG-LS engine behind the C ABI of
//! [`NativeApi`].
//!
//! Contexts are heap allocated and handed out as opaque pointers. Every entry
//! point returns a [`JpeglsErrc`] code (0 on success) and never unwinds: a
//! panic is reported as `UnexpectedFailure`. With the `ffi` feature the
//! functions are exported unmangled so C code can link against them.

use super::{FrameInfoNative, NativeApi, NativeDecoder, NativeEncoder, SpiffHeaderNative};
use crate::constants::{MAXIMUM_NEAR_LOSSLESS, MAXIMUM_WIDTH, MAXIMUM_HEIGHT};
use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::jpegls::decoder::FrameDecoder;
use crate::jpegls::encoder::FrameEncoder;
use crate::jpegls::{InterleaveMode, JpeglsPcParameters};
use crate::spiff::{SpiffColorSpace, SpiffHeader, SpiffResolutionUnits};
use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Initial,
    DestinationSet,
    SpiffHeader,
    Completed,
}

struct EncoderContext {
    state: EncoderState,
    frame_info: Option<FrameInfo>,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
    preset_coding_parameters: JpeglsPcParameters,
    destination: *mut u8,
    destination_size: usize,
    bytes_written: usize,
}

impl EncoderContext {
    fn new() -> Self {
        Self {
            state: EncoderState::Initial,
            frame_info: None,
            near_lossless: 0,
            interleave_mode: InterleaveMode::None,
            preset_coding_parameters: JpeglsPcParameters::default(),
            destination: ptr::null_mut(),
            destination_size: 0,
            bytes_written: 0,
        }
    }

    fn frame_info(&self) -> Result<FrameInfo, JpeglsErrc> {
        self.frame_info.ok_or(JpeglsErrc::InvalidOperation)
    }

    fn frame_encoder(&self) -> Result<FrameEncoder, JpeglsErrc> {
        Ok(FrameEncoder {
            frame_info: self.frame_info()?,
            near_lossless: self.near_lossless,
            interleave_mode: self.interleave_mode,
            preset_coding_parameters: self.preset_coding_parameters,
        })
    }

    fn set_frame_info(&mut self, native: &FrameInfoNative) -> Result<(), JpeglsErrc> {
        if self.state == EncoderState::Completed {
            return Err(JpeglsErrc::InvalidOperation);
        }
        if native.width == 0 || native.width > MAXIMUM_WIDTH {
            return Err(JpeglsErrc::InvalidArgumentWidth);
        }
        if native.height == 0 || native.height > MAXIMUM_HEIGHT {
            return Err(JpeglsErrc::InvalidArgumentHeight);
        }
        if !(2..=16).contains(&native.bits_per_sample) {
            return Err(JpeglsErrc::InvalidArgumentBitsPerSample);
        }
        if !(1..=255).contains(&native.component_count) {
            return Err(JpeglsErrc::InvalidArgumentComponentCount);
        }

        self.frame_info = Some(
            FrameInfo::new(native.width, native.height, native.bits_per_sample, native.component_count)
                .map_err(|_| JpeglsErrc::InvalidArgument)?,
        );
        Ok(())
    }

    fn set_near_lossless(&mut self, near_lossless: i32) -> Result<(), JpeglsErrc> {
        if self.state == EncoderState::Completed {
            return Err(JpeglsErrc::InvalidOperation);
        }
        if !(0..=MAXIMUM_NEAR_LOSSLESS).contains(&near_lossless) {
            return Err(JpeglsErrc::InvalidArgumentNearLossless);
        }
        self.near_lossless = near_lossless;
        Ok(())
    }

    fn set_interleave_mode(&mut self, interleave_mode: i32) -> Result<(), JpeglsErrc> {
        if self.state == EncoderState::Completed {
            return Err(JpeglsErrc::InvalidOperation);
        }
        self.interleave_mode = InterleaveMode::from_native(interleave_mode)?;
        Ok(())
    }

    fn set_preset_coding_parameters(&mut self, pc_parameters: &JpeglsPcParameters) -> Result<(), JpeglsErrc> {
        if self.state == EncoderState::Completed {
            return Err(JpeglsErrc::InvalidOperation);
        }
        self.preset_coding_parameters = *pc_parameters;
        Ok(())
    }

    fn set_destination(&mut self, destination: *mut u8, size: usize) -> Result<(), JpeglsErrc> {
        if self.state != EncoderState::Initial {
            return Err(JpeglsErrc::InvalidOperation);
        }
        if destination.is_null() && size != 0 {
            return Err(JpeglsErrc::InvalidArgument);
        }
        self.destination = destination;
        self.destination_size = size;
        self.state = EncoderState::DestinationSet;
        Ok(())
    }

    fn remaining_destination(&mut self) -> &mut [u8] {
        if self.destination.is_null() {
            return &mut [];
        }
        // SAFETY: the caller keeps the buffer bound by `set_destination` alive
        // and exclusively borrowed until the encoder is destroyed.
        let destination = unsafe { std::slice::from_raw_parts_mut(self.destination, self.destination_size) };
        &mut destination[self.bytes_written.min(self.destination_size)..]
    }

    fn write_spiff_header(&mut self, spiff_header: &SpiffHeader) -> Result<(), JpeglsErrc> {
        if self.state != EncoderState::DestinationSet {
            return Err(JpeglsErrc::InvalidOperation);
        }
        spiff_header.validate()?;

        let mut writer = JpegStreamWriter::new(self.remaining_destination());
        writer.write_start_of_image()?;
        writer.write_spiff_header_segment(spiff_header)?;
        writer.write_spiff_end_of_directory_entry()?;
        self.bytes_written += writer.len();
        self.state = EncoderState::SpiffHeader;
        Ok(())
    }

    fn write_standard_spiff_header(
        &mut self,
        color_space: i32,
        resolution_units: i32,
        vertical_resolution: u32,
        horizontal_resolution: u32,
    ) -> Result<(), JpeglsErrc> {
        let frame_info = self.frame_info()?;
        let color_space = u8::try_from(color_space)
            .ok()
            .and_then(|value| SpiffColorSpace::try_from(value).ok())
            .ok_or(JpeglsErrc::InvalidArgument)?;
        let resolution_units = u8::try_from(resolution_units)
            .ok()
            .and_then(|value| SpiffResolutionUnits::try_from(value).ok())
            .ok_or(JpeglsErrc::InvalidArgument)?;

        self.write_spiff_header(&SpiffHeader::standard(
            &frame_info,
            color_space,
            resolution_units,
            vertical_resolution,
            horizontal_resolution,
        ))
    }

    fn encode(&mut self, source: &[u8], stride: u32) -> Result<(), JpeglsErrc> {
        let spiff_header_written = match self.state {
            EncoderState::DestinationSet => false,
            EncoderState::SpiffHeader => true,
            EncoderState::Initial | EncoderState::Completed => return Err(JpeglsErrc::InvalidOperation),
        };
        let frame_encoder = self.frame_encoder()?;

        let mut writer = JpegStreamWriter::new(self.remaining_destination());
        if !spiff_header_written {
            writer.write_start_of_image()?;
        }
        frame_encoder.encode(source, stride, &mut writer)?;
        let length = writer.len();

        self.bytes_written += length;
        self.state = EncoderState::Completed;
        log::trace!("built-in encoder completed: {} bytes", self.bytes_written);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Initial,
    SourceSet,
    SpiffHeaderRead,
    SpiffHeaderNotFound,
    HeaderRead,
    Completed,
}

/// Header information cached by `read_header`.
#[derive(Debug, Clone, Copy)]
struct DecodedHeader {
    frame_info: FrameInfo,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
    preset_coding_parameters: JpeglsPcParameters,
}

struct DecoderContext {
    state: DecoderState,
    source: *const u8,
    source_size: usize,
    header: Option<DecodedHeader>,
}

impl DecoderContext {
    fn new() -> Self {
        Self {
            state: DecoderState::Initial,
            source: ptr::null(),
            source_size: 0,
            header: None,
        }
    }

    fn source(&self) -> &[u8] {
        if self.source.is_null() {
            return &[];
        }
        // SAFETY: the caller keeps the buffer bound by `set_source` alive and
        // unmodified until the decoder is destroyed.
        unsafe { std::slice::from_raw_parts(self.source, self.source_size) }
    }

    fn header(&self) -> Result<&DecodedHeader, JpeglsErrc> {
        match self.state {
            DecoderState::HeaderRead | DecoderState::Completed => self.header.as_ref().ok_or(JpeglsErrc::InvalidOperation),
            _ => Err(JpeglsErrc::InvalidOperation),
        }
    }

    /// Parses the stream from the start up to the first scan.
    fn frame_decoder(&self) -> Result<FrameDecoder<'_>, JpeglsErrc> {
        let mut frame_decoder = FrameDecoder::new(self.source());
        frame_decoder.read_spiff_header()?;
        frame_decoder.read_header()?;
        Ok(frame_decoder)
    }

    fn set_source(&mut self, source: *const u8, size: usize) -> Result<(), JpeglsErrc> {
        if self.state != DecoderState::Initial {
            return Err(JpeglsErrc::InvalidOperation);
        }
        if source.is_null() && size != 0 {
            return Err(JpeglsErrc::InvalidArgument);
        }
        self.source = source;
        self.source_size = size;
        self.state = DecoderState::SourceSet;
        Ok(())
    }

    fn read_spiff_header(&mut self) -> Result<Option<SpiffHeader>, JpeglsErrc> {
        if self.state != DecoderState::SourceSet {
            return Err(JpeglsErrc::InvalidOperation);
        }
        let spiff_header = FrameDecoder::new(self.source()).read_spiff_header()?;
        self.state = if spiff_header.is_some() {
            DecoderState::SpiffHeaderRead
        } else {
            DecoderState::SpiffHeaderNotFound
        };
        Ok(spiff_header)
    }

    fn read_header(&mut self) -> Result<(), JpeglsErrc> {
        match self.state {
            DecoderState::SourceSet | DecoderState::SpiffHeaderRead | DecoderState::SpiffHeaderNotFound => {}
            _ => return Err(JpeglsErrc::InvalidOperation),
        }

        let frame_decoder = self.frame_decoder()?;
        let header = DecodedHeader {
            frame_info: frame_decoder.frame_info()?,
            near_lossless: frame_decoder.near_lossless()?,
            interleave_mode: frame_decoder.interleave_mode()?,
            preset_coding_parameters: frame_decoder.preset_coding_parameters(),
        };
        self.header = Some(header);
        self.state = DecoderState::HeaderRead;
        Ok(())
    }

    fn destination_size(&self, stride: u32) -> Result<usize, JpeglsErrc> {
        self.header()?;
        self.frame_decoder()?.destination_size(stride)
    }

    fn decode(&mut self, destination: &mut [u8], stride: u32) -> Result<(), JpeglsErrc> {
        if self.state != DecoderState::HeaderRead {
            return Err(JpeglsErrc::InvalidOperation);
        }
        self.frame_decoder()?.decode(destination, stride)?;
        self.state = DecoderState::Completed;
        Ok(())
    }
}

fn guarded(operation: impl FnOnce() -> Result<(), JpeglsErrc>) -> i32 {
    match catch_unwind(AssertUnwindSafe(operation)) {
        Ok(Ok(())) => 0,
        Ok(Err(errc)) => errc.code(),
        Err(_) => {
            log::error!("panic inside the built-in JPEG-LS codec");
            JpeglsErrc::UnexpectedFailure.code()
        }
    }
}

/// # Safety
/// `encoder` must be null or a live handle from [`jpegls_encoder_create`].
unsafe fn encoder_context<'a>(encoder: *mut NativeEncoder) -> Result<&'a mut EncoderContext, JpeglsErrc> {
    unsafe { encoder.cast::<EncoderContext>().as_mut() }.ok_or(JpeglsErrc::InvalidArgument)
}

/// # Safety
/// `decoder` must be null or a live handle from [`jpegls_decoder_create`].
unsafe fn decoder_context<'a>(decoder: *mut NativeDecoder) -> Result<&'a mut DecoderContext, JpeglsErrc> {
    unsafe { decoder.cast::<DecoderContext>().as_mut() }.ok_or(JpeglsErrc::InvalidArgument)
}

/// # Safety
/// `pointer` must be null or valid for writes of `T`.
unsafe fn write_out<T>(pointer: *mut T, value: T) -> Result<(), JpeglsErrc> {
    let slot = unsafe { pointer.as_mut() }.ok_or(JpeglsErrc::InvalidArgument)?;
    *slot = value;
    Ok(())
}

/// Creates an encoder context. Returns null when allocation fails.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_create() -> *mut NativeEncoder {
    catch_unwind(|| Box::into_raw(Box::new(EncoderContext::new())) as *mut NativeEncoder).unwrap_or(ptr::null_mut())
}

/// # Safety
/// `encoder` must be null or a handle from [`jpegls_encoder_create`] that has
/// not been destroyed yet.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_destroy(encoder: *const NativeEncoder) {
    if !encoder.is_null() {
        drop(unsafe { Box::from_raw(encoder as *mut EncoderContext) });
    }
}

/// # Safety
/// `encoder` must be a live handle and `frame_info` must be null or valid.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_set_frame_info(
    encoder: *mut NativeEncoder,
    frame_info: *const FrameInfoNative,
) -> i32 {
    guarded(|| {
        let frame_info = unsafe { frame_info.as_ref() }.ok_or(JpeglsErrc::InvalidArgument)?;
        unsafe { encoder_context(encoder) }?.set_frame_info(frame_info)
    })
}

/// # Safety
/// `encoder` must be a live handle.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_set_near_lossless(encoder: *mut NativeEncoder, near_lossless: i32) -> i32 {
    guarded(|| unsafe { encoder_context(encoder) }?.set_near_lossless(near_lossless))
}

/// # Safety
/// `encoder` must be a live handle.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_set_interleave_mode(encoder: *mut NativeEncoder, interleave_mode: i32) -> i32 {
    guarded(|| unsafe { encoder_context(encoder) }?.set_interleave_mode(interleave_mode))
}

/// # Safety
/// `encoder` must be a live handle and `preset_coding_parameters` null or valid.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_set_preset_coding_parameters(
    encoder: *mut NativeEncoder,
    preset_coding_parameters: *const JpeglsPcParameters,
) -> i32 {
    guarded(|| {
        let pc_parameters = unsafe { preset_coding_parameters.as_ref() }.ok_or(JpeglsErrc::InvalidArgument)?;
        unsafe { encoder_context(encoder) }?.set_preset_coding_parameters(pc_parameters)
    })
}

/// # Safety
/// `encoder` must be a live handle and `size` null or valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_get_estimated_destination_size(
    encoder: *const NativeEncoder,
    size: *mut usize,
) -> i32 {
    guarded(|| {
        let context = unsafe { encoder_context(encoder as *mut NativeEncoder) }?;
        let estimate = context.frame_encoder()?.estimated_destination_size()?;
        unsafe { write_out(size, estimate) }
    })
}

/// # Safety
/// `encoder` must be a live handle. `destination` must be valid for writes of
/// `size` bytes until the encoder is destroyed.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_set_destination_buffer(
    encoder: *mut NativeEncoder,
    destination: *mut c_void,
    size: usize,
) -> i32 {
    guarded(|| unsafe { encoder_context(encoder) }?.set_destination(destination.cast::<u8>(), size))
}

/// # Safety
/// `encoder` must be a live handle.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_write_standard_spiff_header(
    encoder: *mut NativeEncoder,
    color_space: i32,
    resolution_units: i32,
    vertical_resolution: u32,
    horizontal_resolution: u32,
) -> i32 {
    guarded(|| {
        unsafe { encoder_context(encoder) }?.write_standard_spiff_header(
            color_space,
            resolution_units,
            vertical_resolution,
            horizontal_resolution,
        )
    })
}

/// # Safety
/// `encoder` must be a live handle and `spiff_header` null or valid.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_write_spiff_header(
    encoder: *mut NativeEncoder,
    spiff_header: *const SpiffHeaderNative,
) -> i32 {
    guarded(|| {
        let native = unsafe { spiff_header.as_ref() }.ok_or(JpeglsErrc::InvalidArgument)?;
        let context = unsafe { encoder_context(encoder) }?;
        let spiff_header = SpiffHeader::try_from(native).map_err(|_| JpeglsErrc::InvalidArgument)?;
        context.write_spiff_header(&spiff_header)
    })
}

/// # Safety
/// `encoder` must be a live handle and `source` valid for reads of
/// `source_size` bytes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_encode_from_buffer(
    encoder: *mut NativeEncoder,
    source: *const c_void,
    source_size: usize,
    stride: u32,
) -> i32 {
    guarded(|| {
        let context = unsafe { encoder_context(encoder) }?;
        let source = if source.is_null() {
            if source_size != 0 {
                return Err(JpeglsErrc::InvalidArgument);
            }
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(source.cast::<u8>(), source_size) }
        };
        context.encode(source, stride)
    })
}

/// # Safety
/// `encoder` must be a live handle and `bytes_written` null or valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_encoder_get_bytes_written(
    encoder: *const NativeEncoder,
    bytes_written: *mut usize,
) -> i32 {
    guarded(|| {
        let context = unsafe { encoder_context(encoder as *mut NativeEncoder) }?;
        unsafe { write_out(bytes_written, context.bytes_written) }
    })
}

/// Creates a decoder context. Returns null when allocation fails.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_create() -> *mut NativeDecoder {
    catch_unwind(|| Box::into_raw(Box::new(DecoderContext::new())) as *mut NativeDecoder).unwrap_or(ptr::null_mut())
}

/// # Safety
/// `decoder` must be null or a handle from [`jpegls_decoder_create`] that has
/// not been destroyed yet.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_destroy(decoder: *const NativeDecoder) {
    if !decoder.is_null() {
        drop(unsafe { Box::from_raw(decoder as *mut DecoderContext) });
    }
}

/// # Safety
/// `decoder` must be a live handle. `source` must be valid for reads of
/// `source_size` bytes until the decoder is destroyed.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_set_source_buffer(
    decoder: *mut NativeDecoder,
    source: *const c_void,
    source_size: usize,
) -> i32 {
    guarded(|| unsafe { decoder_context(decoder) }?.set_source(source.cast::<u8>(), source_size))
}

/// # Safety
/// `decoder` must be a live handle; `spiff_header` and `header_found` null or
/// valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_read_spiff_header(
    decoder: *mut NativeDecoder,
    spiff_header: *mut SpiffHeaderNative,
    header_found: *mut i32,
) -> i32 {
    guarded(|| {
        if spiff_header.is_null() || header_found.is_null() {
            return Err(JpeglsErrc::InvalidArgument);
        }
        let context = unsafe { decoder_context(decoder) }?;
        match context.read_spiff_header()? {
            Some(header) => {
                unsafe { write_out(spiff_header, header.to_native()) }?;
                unsafe { write_out(header_found, 1) }
            }
            None => unsafe { write_out(header_found, 0) },
        }
    })
}

/// # Safety
/// `decoder` must be a live handle.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_read_header(decoder: *mut NativeDecoder) -> i32 {
    guarded(|| unsafe { decoder_context(decoder) }?.read_header())
}

/// # Safety
/// `decoder` must be a live handle and `frame_info` null or valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_get_frame_info(
    decoder: *const NativeDecoder,
    frame_info: *mut FrameInfoNative,
) -> i32 {
    guarded(|| {
        let context = unsafe { decoder_context(decoder as *mut NativeDecoder) }?;
        let native = context.header()?.frame_info.to_native();
        unsafe { write_out(frame_info, native) }
    })
}

/// # Safety
/// `decoder` must be a live handle and `near_lossless` null or valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_get_near_lossless(
    decoder: *const NativeDecoder,
    component: i32,
    near_lossless: *mut i32,
) -> i32 {
    guarded(|| {
        let context = unsafe { decoder_context(decoder as *mut NativeDecoder) }?;
        let header = context.header()?;
        if component < 0 || component >= header.frame_info.component_count() {
            return Err(JpeglsErrc::InvalidArgument);
        }
        unsafe { write_out(near_lossless, header.near_lossless) }
    })
}

/// # Safety
/// `decoder` must be a live handle and `interleave_mode` null or valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_get_interleave_mode(
    decoder: *const NativeDecoder,
    interleave_mode: *mut i32,
) -> i32 {
    guarded(|| {
        let context = unsafe { decoder_context(decoder as *mut NativeDecoder) }?;
        let mode = u8::from(context.header()?.interleave_mode);
        unsafe { write_out(interleave_mode, i32::from(mode)) }
    })
}

/// # Safety
/// `decoder` must be a live handle and `preset_coding_parameters` null or
/// valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_get_preset_coding_parameters(
    decoder: *const NativeDecoder,
    reserved: i32,
    preset_coding_parameters: *mut JpeglsPcParameters,
) -> i32 {
    guarded(|| {
        if reserved != 0 {
            return Err(JpeglsErrc::InvalidArgument);
        }
        let context = unsafe { decoder_context(decoder as *mut NativeDecoder) }?;
        let pc_parameters = context.header()?.preset_coding_parameters;
        unsafe { write_out(preset_coding_parameters, pc_parameters) }
    })
}

/// # Safety
/// `decoder` must be a live handle and `destination_size` null or valid for writes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_get_destination_size(
    decoder: *const NativeDecoder,
    stride: u32,
    destination_size: *mut usize,
) -> i32 {
    guarded(|| {
        let context = unsafe { decoder_context(decoder as *mut NativeDecoder) }?;
        let size = context.destination_size(stride)?;
        unsafe { write_out(destination_size, size) }
    })
}

/// # Safety
/// `decoder` must be a live handle and `destination` valid for writes of
/// `destination_size` bytes.
#[cfg_attr(feature = "ffi", unsafe(no_mangle))]
pub unsafe extern "C" fn jpegls_decoder_decode_to_buffer(
    decoder: *mut NativeDecoder,
    destination: *mut c_void,
    destination_size: usize,
    stride: u32,
) -> i32 {
    guarded(|| {
        let context = unsafe { decoder_context(decoder) }?;
        let destination = if destination.is_null() {
            if destination_size != 0 {
                return Err(JpeglsErrc::InvalidArgument);
            }
            &mut [][..]
        } else {
            unsafe { std::slice::from_raw_parts_mut(destination.cast::<u8>(), destination_size) }
        };
        context.decode(destination, stride)
    })
}

pub static BUILTIN_API: NativeApi = NativeApi {
    name: "built-in",
    encoder_create: jpegls_encoder_create,
    encoder_destroy: jpegls_encoder_destroy,
    encoder_set_frame_info: jpegls_encoder_set_frame_info,
    encoder_set_near_lossless: jpegls_encoder_set_near_lossless,
    encoder_set_interleave_mode: jpegls_encoder_set_interleave_mode,
    encoder_set_preset_coding_parameters: jpegls_encoder_set_preset_coding_parameters,
    encoder_get_estimated_destination_size: jpegls_encoder_get_estimated_destination_size,
    encoder_set_destination_buffer: jpegls_encoder_set_destination_buffer,
    encoder_write_standard_spiff_header: jpegls_encoder_write_standard_spiff_header,
    encoder_write_spiff_header: jpegls_encoder_write_spiff_header,
    encoder_encode_from_buffer: jpegls_encoder_encode_from_buffer,
    encoder_get_bytes_written: jpegls_encoder_get_bytes_written,
    decoder_create: jpegls_decoder_create,
    decoder_destroy: jpegls_decoder_destroy,
    decoder_set_source_buffer: jpegls_decoder_set_source_buffer,
    decoder_read_spiff_header: jpegls_decoder_read_spiff_header,
    decoder_read_header: jpegls_decoder_read_header,
    decoder_get_frame_info: jpegls_decoder_get_frame_info,
    decoder_get_near_lossless: jpegls_decoder_get_near_lossless,
    decoder_get_interleave_mode: jpegls_decoder_get_interleave_mode,
    decoder_get_preset_coding_parameters: jpegls_decoder_get_preset_coding_parameters,
    decoder_get_destination_size: jpegls_decoder_get_destination_size,
    decoder_decode_to_buffer: jpegls_decoder_decode_to_buffer,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_rejects_out_of_order_calls() {
        unsafe {
            let encoder = jpegls_encoder_create();
            assert!(!encoder.is_null());

            let mut size = 0usize;
            assert_eq!(
                jpegls_encoder_get_estimated_destination_size(encoder, &mut size),
                JpeglsErrc::InvalidOperation.code()
            );
            assert_eq!(
                jpegls_encoder_write_standard_spiff_header(encoder, 8, 0, 1, 1),
                JpeglsErrc::InvalidOperation.code()
            );
            assert_eq!(
                jpegls_encoder_encode_from_buffer(encoder, ptr::null(), 0, 0),
                JpeglsErrc::InvalidOperation.code()
            );
            jpegls_encoder_destroy(encoder);
        }
    }

    #[test]
    fn test_encode_and_decode_through_c_abi() {
        let frame_info = FrameInfoNative {
            width: 2,
            height: 2,
            bits_per_sample: 8,
            component_count: 1,
        };
        let pixels = [1u8, 2, 3, 4];
        let mut encoded = vec![0u8; 2048];
        let mut bytes_written = 0usize;

        unsafe {
            let encoder = jpegls_encoder_create();
            assert_eq!(jpegls_encoder_set_frame_info(encoder, &frame_info), 0);
            assert_eq!(
                jpegls_encoder_set_destination_buffer(encoder, encoded.as_mut_ptr().cast(), encoded.len()),
                0
            );
            assert_eq!(jpegls_encoder_write_standard_spiff_header(encoder, 8, 0, 1, 1), 0);
            assert_eq!(
                jpegls_encoder_encode_from_buffer(encoder, pixels.as_ptr().cast(), pixels.len(), 0),
                0
            );
            assert_eq!(jpegls_encoder_get_bytes_written(encoder, &mut bytes_written), 0);
            jpegls_encoder_destroy(encoder);
        }
        encoded.truncate(bytes_written);

        let mut spiff_header = SpiffHeaderNative::default();
        let mut header_found = 0;
        let mut decoded = [0u8; 4];
        unsafe {
            let decoder = jpegls_decoder_create();
            assert_eq!(
                jpegls_decoder_set_source_buffer(decoder, encoded.as_ptr().cast(), encoded.len()),
                0
            );
            assert_eq!(
                jpegls_decoder_read_spiff_header(decoder, &mut spiff_header, &mut header_found),
                0
            );
            assert_eq!(jpegls_decoder_read_header(decoder), 0);
            assert_eq!(
                jpegls_decoder_decode_to_buffer(decoder, decoded.as_mut_ptr().cast(), decoded.len(), 0),
                0
            );
            jpegls_decoder_destroy(decoder);
        }

        assert_eq!(header_found, 1);
        assert_eq!(spiff_header.color_space, 8);
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_null_handle_is_an_argument_error() {
        unsafe {
            assert_eq!(
                jpegls_decoder_read_header(ptr::null_mut()),
                JpeglsErrc::InvalidArgument.code()
            );
            jpegls_decoder_destroy(ptr::null());
        }
    }
}
