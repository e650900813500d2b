//! The foreign-function boundary to the native JPEG-LS codec.
//!
//! The codec is reached only through [`NativeApi`], a table of C ABI function
//! pointers shaped like the CharLS 2.x C API. The table is chosen once per
//! process: the system `libcharls` when the `charls` feature is enabled, the
//! built-in engine otherwise.

pub mod builtin;
#[cfg(feature = "charls")]
pub mod charls;

use crate::jpegls::JpeglsPcParameters;
use std::ffi::c_void;
use std::sync::OnceLock;

/// Opaque native encoder context.
#[repr(C)]
pub struct NativeEncoder {
    _private: [u8; 0],
}

/// Opaque native decoder context.
#[repr(C)]
pub struct NativeDecoder {
    _private: [u8; 0],
}

/// Frame geometry as exchanged with the native codec.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfoNative {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: i32,
    pub component_count: i32,
}

/// SPIFF header as exchanged with the native codec. Enumerations travel as
/// plain integers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpiffHeaderNative {
    pub profile_id: i32,
    pub component_count: i32,
    pub height: u32,
    pub width: u32,
    pub color_space: i32,
    pub bits_per_sample: i32,
    pub compression_type: i32,
    pub resolution_units: i32,
    pub vertical_resolution: u32,
    pub horizontal_resolution: u32,
}

/// Entry points of one native codec implementation.
pub struct NativeApi {
    pub name: &'static str,

    pub encoder_create: unsafe extern "C" fn() -> *mut NativeEncoder,
    pub encoder_destroy: unsafe extern "C" fn(*const NativeEncoder),
    pub encoder_set_frame_info: unsafe extern "C" fn(*mut NativeEncoder, *const FrameInfoNative) -> i32,
    pub encoder_set_near_lossless: unsafe extern "C" fn(*mut NativeEncoder, i32) -> i32,
    pub encoder_set_interleave_mode: unsafe extern "C" fn(*mut NativeEncoder, i32) -> i32,
    pub encoder_set_preset_coding_parameters:
        unsafe extern "C" fn(*mut NativeEncoder, *const JpeglsPcParameters) -> i32,
    pub encoder_get_estimated_destination_size: unsafe extern "C" fn(*const NativeEncoder, *mut usize) -> i32,
    pub encoder_set_destination_buffer: unsafe extern "C" fn(*mut NativeEncoder, *mut c_void, usize) -> i32,
    pub encoder_write_standard_spiff_header: unsafe extern "C" fn(*mut NativeEncoder, i32, i32, u32, u32) -> i32,
    pub encoder_write_spiff_header: unsafe extern "C" fn(*mut NativeEncoder, *const SpiffHeaderNative) -> i32,
    pub encoder_encode_from_buffer: unsafe extern "C" fn(*mut NativeEncoder, *const c_void, usize, u32) -> i32,
    pub encoder_get_bytes_written: unsafe extern "C" fn(*const NativeEncoder, *mut usize) -> i32,

    pub decoder_create: unsafe extern "C" fn() -> *mut NativeDecoder,
    pub decoder_destroy: unsafe extern "C" fn(*const NativeDecoder),
    pub decoder_set_source_buffer: unsafe extern "C" fn(*mut NativeDecoder, *const c_void, usize) -> i32,
    pub decoder_read_spiff_header: unsafe extern "C" fn(*mut NativeDecoder, *mut SpiffHeaderNative, *mut i32) -> i32,
    pub decoder_read_header: unsafe extern "C" fn(*mut NativeDecoder) -> i32,
    pub decoder_get_frame_info: unsafe extern "C" fn(*const NativeDecoder, *mut FrameInfoNative) -> i32,
    pub decoder_get_near_lossless: unsafe extern "C" fn(*const NativeDecoder, i32, *mut i32) -> i32,
    pub decoder_get_interleave_mode: unsafe extern "C" fn(*const NativeDecoder, *mut i32) -> i32,
    pub decoder_get_preset_coding_parameters:
        unsafe extern "C" fn(*const NativeDecoder, i32, *mut JpeglsPcParameters) -> i32,
    pub decoder_get_destination_size: unsafe extern "C" fn(*const NativeDecoder, u32, *mut usize) -> i32,
    pub decoder_decode_to_buffer: unsafe extern "C" fn(*mut NativeDecoder, *mut c_void, usize, u32) -> i32,
}

impl NativeApi {
    /// The process-wide native codec. Selected on first use.
    pub fn current() -> &'static NativeApi {
        static API: OnceLock<&'static NativeApi> = OnceLock::new();
        API.get_or_init(|| {
            let api = Self::select();
            log::debug!("using {} native JPEG-LS codec", api.name);
            api
        })
    }

    #[cfg(feature = "charls")]
    fn select() -> &'static NativeApi {
        &charls::CHARLS_API
    }

    #[cfg(not(feature = "charls"))]
    fn select() -> &'static NativeApi {
        &builtin::BUILTIN_API
    }
}
