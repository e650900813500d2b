//! Safe JPEG-LS (ISO/IEC 14495-1) encoding and decoding over a native codec.
//!
//! [`JpegLsEncoder`] and [`JpegLsDecoder`] own one native codec context each
//! and enforce the order in which it may be driven. Every native result code
//! is translated into a [`CodecError`]. SPIFF headers can be written, read and
//! (de)serialized on their own with [`SpiffHeaderCodec`].
//!
//! ```no_run
//! use jpegls_native::{FrameInfo, decode, encode};
//!
//! let frame_info = FrameInfo::new(1, 1, 8, 3)?;
//! let encoded = encode(&frame_info, &[77, 33, 255])?;
//! assert_eq!(decode(&encoded)?, [77, 33, 255]);
//! # Ok::<(), jpegls_native::CodecError>(())
//! ```

pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame_info;
pub mod handle;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;
pub mod jpegls;
pub mod native;
pub mod spiff;

pub use decoder::JpegLsDecoder;
pub use encoder::{EncodeOptions, JpegLsEncoder};
pub use error::{CodecError, JpeglsErrc, translate};
pub use frame_info::FrameInfo;
pub use handle::NativeCodecHandle;
pub use jpegls::{InterleaveMode, JpeglsPcParameters};
pub use spiff::{
    SpiffColorSpace, SpiffCompressionType, SpiffHeader, SpiffHeaderCodec, SpiffProfileId, SpiffResolutionUnits,
};

/// Encodes tightly packed pixels with default settings.
pub fn encode(frame_info: &FrameInfo, pixels: &[u8]) -> Result<Vec<u8>, CodecError> {
    encode_with_options(frame_info, pixels, &EncodeOptions::default())
}

pub fn encode_with_options(
    frame_info: &FrameInfo,
    pixels: &[u8],
    options: &EncodeOptions,
) -> Result<Vec<u8>, CodecError> {
    let mut encoder = JpegLsEncoder::with_frame_info(*frame_info)?;
    encoder.set_interleave_mode(options.interleave_mode)?;
    encoder.set_near_lossless(options.near_lossless)?;
    if let Some(pc_parameters) = options.preset_coding_parameters {
        encoder.set_preset_coding_parameters(pc_parameters)?;
    }
    if let Some(color_space) = options.spiff_color_space {
        encoder.write_standard_spiff_header(color_space, SpiffResolutionUnits::AspectRatio, 1, 1)?;
    }

    let mut destination = zeroed_buffer(encoder.estimated_destination_size()?)?;
    encoder.set_destination(&mut destination)?;
    encoder.encode_with_stride(pixels, options.stride)?;
    let bytes_written = encoder.bytes_written()?;
    drop(encoder);

    destination.truncate(bytes_written);
    Ok(destination)
}

/// Decodes a complete JPEG-LS stream into tightly packed pixels.
pub fn decode(source: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = JpegLsDecoder::new(source)?;
    decoder.read_header()?;
    decoder.decode()
}

/// Allocates a zero-filled buffer, reporting allocation failure instead of
/// aborting. Sizes come from stream headers and may be arbitrarily large.
pub(crate) fn zeroed_buffer(size: usize) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();
    if buffer.try_reserve_exact(size).is_err() {
        log::debug!("cannot allocate a {size} byte buffer");
        return Err(CodecError::OutOfResources);
    }
    buffer.resize(size, 0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unallocatable_buffer_is_out_of_resources() {
        assert_eq!(zeroed_buffer(usize::MAX), Err(CodecError::OutOfResources));
        assert_eq!(zeroed_buffer(3).unwrap(), [0, 0, 0]);
    }
}
