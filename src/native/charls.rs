//! Bindings to the system CharLS library (`libcharls`, 2.x C API).

use super::{FrameInfoNative, NativeApi, NativeDecoder, NativeEncoder, SpiffHeaderNative};
use crate::jpegls::JpeglsPcParameters;
use std::ffi::c_void;

#[link(name = "charls")]
unsafe extern "C" {
    fn charls_jpegls_encoder_create() -> *mut NativeEncoder;
    fn charls_jpegls_encoder_destroy(encoder: *const NativeEncoder);
    fn charls_jpegls_encoder_set_frame_info(encoder: *mut NativeEncoder, frame_info: *const FrameInfoNative) -> i32;
    fn charls_jpegls_encoder_set_near_lossless(encoder: *mut NativeEncoder, near_lossless: i32) -> i32;
    fn charls_jpegls_encoder_set_interleave_mode(encoder: *mut NativeEncoder, interleave_mode: i32) -> i32;
    fn charls_jpegls_encoder_set_preset_coding_parameters(
        encoder: *mut NativeEncoder,
        preset_coding_parameters: *const JpeglsPcParameters,
    ) -> i32;
    fn charls_jpegls_encoder_get_estimated_destination_size(encoder: *const NativeEncoder, size: *mut usize) -> i32;
    fn charls_jpegls_encoder_set_destination_buffer(
        encoder: *mut NativeEncoder,
        destination_buffer: *mut c_void,
        destination_size_bytes: usize,
    ) -> i32;
    fn charls_jpegls_encoder_write_standard_spiff_header(
        encoder: *mut NativeEncoder,
        color_space: i32,
        resolution_units: i32,
        vertical_resolution: u32,
        horizontal_resolution: u32,
    ) -> i32;
    fn charls_jpegls_encoder_write_spiff_header(encoder: *mut NativeEncoder, spiff_header: *const SpiffHeaderNative)
    -> i32;
    fn charls_jpegls_encoder_encode_from_buffer(
        encoder: *mut NativeEncoder,
        source_buffer: *const c_void,
        source_size_bytes: usize,
        stride: u32,
    ) -> i32;
    fn charls_jpegls_encoder_get_bytes_written(encoder: *const NativeEncoder, bytes_written: *mut usize) -> i32;

    fn charls_jpegls_decoder_create() -> *mut NativeDecoder;
    fn charls_jpegls_decoder_destroy(decoder: *const NativeDecoder);
    fn charls_jpegls_decoder_set_source_buffer(
        decoder: *mut NativeDecoder,
        source_buffer: *const c_void,
        source_size_bytes: usize,
    ) -> i32;
    fn charls_jpegls_decoder_read_spiff_header(
        decoder: *mut NativeDecoder,
        spiff_header: *mut SpiffHeaderNative,
        header_found: *mut i32,
    ) -> i32;
    fn charls_jpegls_decoder_read_header(decoder: *mut NativeDecoder) -> i32;
    fn charls_jpegls_decoder_get_frame_info(decoder: *const NativeDecoder, frame_info: *mut FrameInfoNative) -> i32;
    fn charls_jpegls_decoder_get_near_lossless(
        decoder: *const NativeDecoder,
        component: i32,
        near_lossless: *mut i32,
    ) -> i32;
    fn charls_jpegls_decoder_get_interleave_mode(decoder: *const NativeDecoder, interleave_mode: *mut i32) -> i32;
    fn charls_jpegls_decoder_get_preset_coding_parameters(
        decoder: *const NativeDecoder,
        reserved: i32,
        preset_coding_parameters: *mut JpeglsPcParameters,
    ) -> i32;
    fn charls_jpegls_decoder_get_destination_size(
        decoder: *const NativeDecoder,
        stride: u32,
        destination_size_bytes: *mut usize,
    ) -> i32;
    fn charls_jpegls_decoder_decode_to_buffer(
        decoder: *mut NativeDecoder,
        destination_buffer: *mut c_void,
        destination_size_bytes: usize,
        stride: u32,
    ) -> i32;
}

pub static CHARLS_API: NativeApi = NativeApi {
    name: "CharLS",
    encoder_create: charls_jpegls_encoder_create,
    encoder_destroy: charls_jpegls_encoder_destroy,
    encoder_set_frame_info: charls_jpegls_encoder_set_frame_info,
    encoder_set_near_lossless: charls_jpegls_encoder_set_near_lossless,
    encoder_set_interleave_mode: charls_jpegls_encoder_set_interleave_mode,
    encoder_set_preset_coding_parameters: charls_jpegls_encoder_set_preset_coding_parameters,
    encoder_get_estimated_destination_size: charls_jpegls_encoder_get_estimated_destination_size,
    encoder_set_destination_buffer: charls_jpegls_encoder_set_destination_buffer,
    encoder_write_standard_spiff_header: charls_jpegls_encoder_write_standard_spiff_header,
    encoder_write_spiff_header: charls_jpegls_encoder_write_spiff_header,
    encoder_encode_from_buffer: charls_jpegls_encoder_encode_from_buffer,
    encoder_get_bytes_written: charls_jpegls_encoder_get_bytes_written,
    decoder_create: charls_jpegls_decoder_create,
    decoder_destroy: charls_jpegls_decoder_destroy,
    decoder_set_source_buffer: charls_jpegls_decoder_set_source_buffer,
    decoder_read_spiff_header: charls_jpegls_decoder_read_spiff_header,
    decoder_read_header: charls_jpegls_decoder_read_header,
    decoder_get_frame_info: charls_jpegls_decoder_get_frame_info,
    decoder_get_near_lossless: charls_jpegls_decoder_get_near_lossless,
    decoder_get_interleave_mode: charls_jpegls_decoder_get_interleave_mode,
    decoder_get_preset_coding_parameters: charls_jpegls_decoder_get_preset_coding_parameters,
    decoder_get_destination_size: charls_jpegls_decoder_get_destination_size,
    decoder_decode_to_buffer: charls_jpegls_decoder_decode_to_buffer,
};
