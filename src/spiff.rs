//! SPIFF (Still Picture Interchange File Format, ITU-T T.84 Annex F) header
//! model and its byte-exact APP8 serialization.
//!
//! The header segment written after SOI is 34 bytes:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0..4   | `FF E8 00 20` (APP8 marker, segment length 32) |
//! | 4..10  | `"SPIFF\0"` |
//! | 10..12 | version (major, minor) |
//! | 12     | profile id |
//! | 13     | component count |
//! | 14..18 | height, big endian |
//! | 18..22 | width, big endian |
//! | 22     | color space |
//! | 23     | bits per sample |
//! | 24     | compression type |
//! | 25     | resolution units |
//! | 26..30 | vertical resolution, big endian |
//! | 30..34 | horizontal resolution, big endian |

use crate::constants::{
    SPIFF_END_OF_DIRECTORY_ENTRY_TYPE, SPIFF_HEADER_SIZE_IN_BYTES, SPIFF_MAJOR_REVISION_NUMBER,
    SPIFF_MINOR_REVISION_NUMBER,
};
use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::native::SpiffHeaderNative;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// SPIFF profile identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SpiffProfileId {
    /// No profile.
    #[default]
    None = 0,
    /// Continuous tone base profile.
    ContinuousToneBase = 1,
    /// Continuous tone progressive profile.
    ContinuousToneProgressive = 2,
    /// Bi-level facsimile profile.
    BiLevelFacsimile = 3,
    /// Continuous tone facsimile profile.
    ContinuousToneFacsimile = 4,
}

/// SPIFF color space identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SpiffColorSpace {
    /// Bi-level black.
    BiLevelBlack = 0,
    /// YCbCr (ITU-R BT.709) video.
    YCbCrItuBt709Video = 1,
    /// No color space (none).
    None = 2,
    /// YCbCr (ITU-R BT.601-1) RGB.
    YCbCrItuBt6011Rgb = 3,
    /// YCbCr (ITU-R BT.601-1) video.
    YCbCrItuBt6011Video = 4,
    /// Grayscale.
    Grayscale = 8,
    /// PhotoYCC.
    PhotoYcc = 9,
    /// RGB.
    Rgb = 10,
    /// CMY.
    Cmy = 11,
    /// CMYK.
    Cmyk = 12,
    /// YCCK.
    Ycck = 13,
    /// CIE Lab.
    CieLab = 14,
    /// Bi-level white.
    BiLevelWhite = 15,
}

impl SpiffColorSpace {
    /// Whether a JPEG-LS image with `component_count` components may be tagged
    /// with this color space. Bi-level spaces are never valid for JPEG-LS.
    pub fn accepts_component_count(self, component_count: i32) -> bool {
        match self {
            Self::None => true,
            Self::BiLevelBlack | Self::BiLevelWhite => false,
            Self::Grayscale => component_count == 1,
            Self::YCbCrItuBt709Video
            | Self::YCbCrItuBt6011Rgb
            | Self::YCbCrItuBt6011Video
            | Self::Rgb
            | Self::Cmy
            | Self::PhotoYcc
            | Self::CieLab => component_count == 3,
            Self::Cmyk | Self::Ycck => component_count == 4,
        }
    }
}

/// SPIFF compression type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SpiffCompressionType {
    /// Uncompressed.
    Uncompressed = 0,
    /// Modified Huffman.
    ModifiedHuffman = 1,
    /// Modified Read.
    ModifiedRead = 2,
    /// Modified Modified Read.
    ModifiedModifiedRead = 3,
    /// JBIG.
    Jbig = 4,
    /// JPEG.
    Jpeg = 5,
    /// JPEG-LS.
    JpegLs = 6,
}

/// SPIFF resolution units identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SpiffResolutionUnits {
    /// Aspect ratio.
    #[default]
    AspectRatio = 0,
    /// Dots per inch (DPI).
    DotsPerInch = 1,
    /// Dots per centimeter.
    DotsPerCentimeter = 2,
}

/// Still Picture Interchange File Format (SPIFF) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpiffHeader {
    pub profile_id: SpiffProfileId,
    pub component_count: i32,
    pub height: u32,
    pub width: u32,
    pub color_space: SpiffColorSpace,
    pub bits_per_sample: i32,
    pub compression_type: SpiffCompressionType,
    pub resolution_units: SpiffResolutionUnits,
    pub vertical_resolution: u32,
    pub horizontal_resolution: u32,
}

impl SpiffHeader {
    /// The header a JPEG-LS encoder writes for `frame_info`.
    pub fn standard(
        frame_info: &FrameInfo,
        color_space: SpiffColorSpace,
        resolution_units: SpiffResolutionUnits,
        vertical_resolution: u32,
        horizontal_resolution: u32,
    ) -> Self {
        Self {
            profile_id: SpiffProfileId::None,
            component_count: frame_info.component_count(),
            height: frame_info.height(),
            width: frame_info.width(),
            color_space,
            bits_per_sample: frame_info.bits_per_sample(),
            compression_type: SpiffCompressionType::JpegLs,
            resolution_units,
            vertical_resolution,
            horizontal_resolution,
        }
    }

    /// Checks the fields that must hold for any header written to a stream.
    pub fn validate(&self) -> Result<(), JpeglsErrc> {
        if self.height == 0 {
            return Err(JpeglsErrc::InvalidArgumentHeight);
        }
        if self.width == 0 {
            return Err(JpeglsErrc::InvalidArgumentWidth);
        }
        if !(1..=i32::from(u8::MAX)).contains(&self.component_count)
            || !self.color_space.accepts_component_count(self.component_count)
        {
            return Err(JpeglsErrc::InvalidArgumentComponentCount);
        }
        if !(1..=i32::from(u8::MAX)).contains(&self.bits_per_sample) {
            return Err(JpeglsErrc::InvalidArgumentBitsPerSample);
        }
        Ok(())
    }

    /// Checks that the header describes the JPEG-LS frame it precedes.
    pub fn validate_for_frame(&self, frame_info: &FrameInfo) -> Result<(), JpeglsErrc> {
        if self.compression_type != SpiffCompressionType::JpegLs
            || self.width != frame_info.width()
            || self.height != frame_info.height()
            || self.bits_per_sample != frame_info.bits_per_sample()
            || self.component_count != frame_info.component_count()
            || !self.color_space.accepts_component_count(self.component_count)
        {
            return Err(JpeglsErrc::InvalidEncodedData);
        }
        Ok(())
    }

    pub fn to_native(&self) -> SpiffHeaderNative {
        SpiffHeaderNative {
            profile_id: i32::from(u8::from(self.profile_id)),
            component_count: self.component_count,
            height: self.height,
            width: self.width,
            color_space: i32::from(u8::from(self.color_space)),
            bits_per_sample: self.bits_per_sample,
            compression_type: i32::from(u8::from(self.compression_type)),
            resolution_units: i32::from(u8::from(self.resolution_units)),
            vertical_resolution: self.vertical_resolution,
            horizontal_resolution: self.horizontal_resolution,
        }
    }
}

fn enum_from_native<T: TryFromPrimitive<Primitive = u8>>(value: i32) -> Result<T, JpeglsErrc> {
    u8::try_from(value)
        .ok()
        .and_then(|value| T::try_from_primitive(value).ok())
        .ok_or(JpeglsErrc::InvalidEncodedData)
}

impl TryFrom<&SpiffHeaderNative> for SpiffHeader {
    type Error = JpeglsErrc;

    fn try_from(native: &SpiffHeaderNative) -> Result<Self, Self::Error> {
        Ok(Self {
            profile_id: enum_from_native(native.profile_id)?,
            component_count: native.component_count,
            height: native.height,
            width: native.width,
            color_space: enum_from_native(native.color_space)?,
            bits_per_sample: native.bits_per_sample,
            compression_type: enum_from_native(native.compression_type)?,
            resolution_units: enum_from_native(native.resolution_units)?,
            vertical_resolution: native.vertical_resolution,
            horizontal_resolution: native.horizontal_resolution,
        })
    }
}

const SPIFF_MAGIC_ID: [u8; 6] = *b"SPIFF\0";

// Length field value of the header segment: everything after the marker.
const SPIFF_SEGMENT_LENGTH: u16 = (SPIFF_HEADER_SIZE_IN_BYTES - 2) as u16;

/// Serializer and parser for the SPIFF header APP8 segment.
pub struct SpiffHeaderCodec;

impl SpiffHeaderCodec {
    /// APP8 segment carrying the end-of-directory entry, followed by the SOI
    /// that starts the wrapped JPEG-LS stream.
    pub const END_OF_DIRECTORY: [u8; 10] = [
        JPEG_MARKER_START_BYTE,
        JpegMarkerCode::ApplicationData8 as u8,
        0x00,
        0x08,
        0x00,
        0x00,
        0x00,
        SPIFF_END_OF_DIRECTORY_ENTRY_TYPE as u8,
        JPEG_MARKER_START_BYTE,
        JpegMarkerCode::StartOfImage as u8,
    ];

    /// Serializes `header` into the complete APP8 segment, marker included.
    pub fn encode(header: &SpiffHeader) -> Result<[u8; SPIFF_HEADER_SIZE_IN_BYTES], JpeglsErrc> {
        let component_count =
            u8::try_from(header.component_count).map_err(|_| JpeglsErrc::InvalidArgumentComponentCount)?;
        let bits_per_sample =
            u8::try_from(header.bits_per_sample).map_err(|_| JpeglsErrc::InvalidArgumentBitsPerSample)?;

        let mut segment = [0u8; SPIFF_HEADER_SIZE_IN_BYTES];
        segment[0] = JPEG_MARKER_START_BYTE;
        segment[1] = JpegMarkerCode::ApplicationData8 as u8;
        segment[2..4].copy_from_slice(&SPIFF_SEGMENT_LENGTH.to_be_bytes());
        segment[4..10].copy_from_slice(&SPIFF_MAGIC_ID);
        segment[10] = SPIFF_MAJOR_REVISION_NUMBER;
        segment[11] = SPIFF_MINOR_REVISION_NUMBER;
        segment[12] = header.profile_id.into();
        segment[13] = component_count;
        segment[14..18].copy_from_slice(&header.height.to_be_bytes());
        segment[18..22].copy_from_slice(&header.width.to_be_bytes());
        segment[22] = header.color_space.into();
        segment[23] = bits_per_sample;
        segment[24] = header.compression_type.into();
        segment[25] = header.resolution_units.into();
        segment[26..30].copy_from_slice(&header.vertical_resolution.to_be_bytes());
        segment[30..34].copy_from_slice(&header.horizontal_resolution.to_be_bytes());
        Ok(segment)
    }

    /// Parses a complete APP8 segment starting at its marker. Returns
    /// `Ok(None)` when the segment is not a SPIFF header this codec reads.
    pub fn decode(segment: &[u8]) -> Result<Option<SpiffHeader>, JpeglsErrc> {
        if segment.len() < 4 {
            return Err(JpeglsErrc::SourceBufferTooSmall);
        }
        if segment[0] != JPEG_MARKER_START_BYTE {
            return Err(JpeglsErrc::JpegMarkerStartByteNotFound);
        }
        if segment[1] != JpegMarkerCode::ApplicationData8 as u8 {
            return Ok(None);
        }

        let length = usize::from(u16::from_be_bytes([segment[2], segment[3]]));
        if length < 2 {
            return Err(JpeglsErrc::InvalidMarkerSegmentSize);
        }
        let payload = segment
            .get(4..2 + length)
            .ok_or(JpeglsErrc::SourceBufferTooSmall)?;
        Self::decode_payload(payload)
    }

    /// Parses the bytes of an APP8 segment that follow its length field.
    pub fn decode_payload(payload: &[u8]) -> Result<Option<SpiffHeader>, JpeglsErrc> {
        if payload.len() < SPIFF_MAGIC_ID.len() || payload[..SPIFF_MAGIC_ID.len()] != SPIFF_MAGIC_ID {
            return Ok(None);
        }
        if payload.len() != SPIFF_HEADER_SIZE_IN_BYTES - 4 {
            return Err(JpeglsErrc::InvalidMarkerSegmentSize);
        }

        let fields = &payload[SPIFF_MAGIC_ID.len()..];
        let major_version = fields[0];
        if major_version > SPIFF_MAJOR_REVISION_NUMBER {
            log::debug!("skipping SPIFF header with unsupported version {major_version}.{}", fields[1]);
            return Ok(None);
        }

        let read_u32 = |offset: usize| u32::from_be_bytes([fields[offset], fields[offset + 1], fields[offset + 2], fields[offset + 3]]);
        let header = SpiffHeader {
            profile_id: SpiffProfileId::try_from(fields[2]).map_err(|_| JpeglsErrc::InvalidEncodedData)?,
            component_count: i32::from(fields[3]),
            height: read_u32(4),
            width: read_u32(8),
            color_space: SpiffColorSpace::try_from(fields[12]).map_err(|_| JpeglsErrc::InvalidEncodedData)?,
            bits_per_sample: i32::from(fields[13]),
            compression_type: SpiffCompressionType::try_from(fields[14])
                .map_err(|_| JpeglsErrc::InvalidEncodedData)?,
            resolution_units: SpiffResolutionUnits::try_from(fields[15])
                .map_err(|_| JpeglsErrc::InvalidEncodedData)?,
            vertical_resolution: read_u32(16),
            horizontal_resolution: read_u32(20),
        };
        Ok(Some(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_header() -> SpiffHeader {
        SpiffHeader {
            profile_id: SpiffProfileId::None,
            component_count: 3,
            height: 800,
            width: 600,
            color_space: SpiffColorSpace::Rgb,
            bits_per_sample: 8,
            compression_type: SpiffCompressionType::JpegLs,
            resolution_units: SpiffResolutionUnits::DotsPerInch,
            vertical_resolution: 96,
            horizontal_resolution: 1024,
        }
    }

    #[test]
    fn test_encode_byte_layout() {
        let segment = SpiffHeaderCodec::encode(&rgb_header()).unwrap();
        assert_eq!(
            segment,
            [
                0xFF, 0xE8, 0x00, 0x20, b'S', b'P', b'I', b'F', b'F', 0x00, 2, 0, 0, 3, 0x00, 0x00, 0x03, 0x20,
                0x00, 0x00, 0x02, 0x58, 10, 8, 6, 1, 0x00, 0x00, 0x00, 0x60, 0x00, 0x00, 0x04, 0x00,
            ]
        );
    }

    #[test]
    fn test_decode_inverts_encode() {
        let segment = SpiffHeaderCodec::encode(&rgb_header()).unwrap();
        assert_eq!(SpiffHeaderCodec::decode(&segment), Ok(Some(rgb_header())));
    }

    #[test]
    fn test_decode_ignores_other_app8_and_newer_versions() {
        let mut segment = SpiffHeaderCodec::encode(&rgb_header()).unwrap();
        segment[10] = 3;
        assert_eq!(SpiffHeaderCodec::decode(&segment), Ok(None));

        let hp_segment = [0xFF, 0xE8, 0x00, 0x07, b'm', b'r', b'f', b'x', 0x01];
        assert_eq!(SpiffHeaderCodec::decode(&hp_segment), Ok(None));
    }

    #[test]
    fn test_decode_truncated_segment() {
        let segment = SpiffHeaderCodec::encode(&rgb_header()).unwrap();
        assert_eq!(
            SpiffHeaderCodec::decode(&segment[..20]),
            Err(JpeglsErrc::SourceBufferTooSmall)
        );
    }

    #[test]
    fn test_decode_unknown_color_space() {
        let mut segment = SpiffHeaderCodec::encode(&rgb_header()).unwrap();
        segment[22] = 5;
        assert_eq!(SpiffHeaderCodec::decode(&segment), Err(JpeglsErrc::InvalidEncodedData));
    }

    #[test]
    fn test_end_of_directory_bytes() {
        assert_eq!(
            SpiffHeaderCodec::END_OF_DIRECTORY,
            [0xFF, 0xE8, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0xFF, 0xD8]
        );
    }

    #[test]
    fn test_color_space_component_rules() {
        assert!(SpiffColorSpace::Grayscale.accepts_component_count(1));
        assert!(!SpiffColorSpace::Grayscale.accepts_component_count(3));
        assert!(SpiffColorSpace::YCbCrItuBt6011Rgb.accepts_component_count(3));
        assert!(SpiffColorSpace::Cmyk.accepts_component_count(4));
        assert!(SpiffColorSpace::None.accepts_component_count(7));
        assert!(!SpiffColorSpace::BiLevelBlack.accepts_component_count(1));
    }

    #[test]
    fn test_validate() {
        assert_eq!(rgb_header().validate(), Ok(()));
        let gray = SpiffHeader {
            color_space: SpiffColorSpace::Grayscale,
            ..rgb_header()
        };
        assert_eq!(gray.validate(), Err(JpeglsErrc::InvalidArgumentComponentCount));
        let empty = SpiffHeader {
            width: 0,
            ..rgb_header()
        };
        assert_eq!(empty.validate(), Err(JpeglsErrc::InvalidArgumentWidth));
    }

    #[test]
    fn test_standard_header_matches_frame() {
        let frame_info = FrameInfo::new(600, 800, 8, 3).unwrap();
        let header = SpiffHeader::standard(
            &frame_info,
            SpiffColorSpace::Rgb,
            SpiffResolutionUnits::DotsPerInch,
            96,
            1024,
        );
        assert_eq!(header, rgb_header());
        assert_eq!(header.validate_for_frame(&frame_info), Ok(()));

        let other = FrameInfo::new(600, 801, 8, 3).unwrap();
        assert_eq!(header.validate_for_frame(&other), Err(JpeglsErrc::InvalidEncodedData));
    }

    #[test]
    fn test_native_conversion() {
        let native = rgb_header().to_native();
        assert_eq!(native.color_space, 10);
        assert_eq!(SpiffHeader::try_from(&native), Ok(rgb_header()));

        let broken = SpiffHeaderNative {
            compression_type: 99,
            ..native
        };
        assert_eq!(SpiffHeader::try_from(&broken), Err(JpeglsErrc::InvalidEncodedData));
    }
}
