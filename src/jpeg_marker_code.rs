use crate::error::JpeglsErrc;
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;

/// JPEG marker codes (the byte after 0xFF) that may appear in or around a
/// JPEG-LS stream. Any other code is reported as
/// [`JpeglsErrc::UnknownJpegMarkerFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[num_enum(error_type(name = JpeglsErrc, constructor = unknown_marker))]
pub enum JpegMarkerCode {
    // ISO/IEC 10918-1 frame types. All of them are rejected by a JPEG-LS decoder.
    StartOfFrameBaselineJpeg = 0xC0,
    StartOfFrameExtendedSequential = 0xC1,
    StartOfFrameProgressive = 0xC2,
    /// SOF3: lossless Huffman coded frame.
    StartOfFrameLossless = 0xC3,
    StartOfFrameDifferentialSequential = 0xC5,
    StartOfFrameDifferentialProgressive = 0xC6,
    StartOfFrameDifferentialLossless = 0xC7,
    StartOfFrameExtendedArithmetic = 0xC9,
    StartOfFrameProgressiveArithmetic = 0xCA,
    StartOfFrameLosslessArithmetic = 0xCB,
    StartOfFrameDifferentialSequentialArithmetic = 0xCD,
    StartOfFrameDifferentialProgressiveArithmetic = 0xCE,
    StartOfFrameDifferentialLosslessArithmetic = 0xCF,

    /// SOI
    StartOfImage = 0xD8,
    /// EOI
    EndOfImage = 0xD9,
    /// SOS
    StartOfScan = 0xDA,
    /// DNL: number of lines, only valid after the first scan.
    DefineNumberOfLines = 0xDC,
    /// DRI
    DefineRestartInterval = 0xDD,

    ApplicationData0 = 0xE0,
    ApplicationData1 = 0xE1,
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    /// APP8: SPIFF header and SPIFF directory entries.
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    ApplicationData13 = 0xED,
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// SOF55: JPEG-LS frame (ISO/IEC 14495-1).
    StartOfFrameJpegls = 0xF7,
    /// LSE: JPEG-LS preset parameters.
    JpeglsPresetParameters = 0xF8,
    /// SOF57: JPEG-LS extended frame (ISO/IEC 14495-2), not supported.
    StartOfFrameJpeglsExtended = 0xF9,

    /// COM
    Comment = 0xFE,
}

fn unknown_marker(_: u8) -> JpeglsErrc {
    JpeglsErrc::UnknownJpegMarkerFound
}

impl JpegMarkerCode {
    /// True for every frame marker other than SOF55.
    pub fn is_unsupported_start_of_frame(self) -> bool {
        let code = u8::from(self);
        (0xC0..=0xCF).contains(&code) || self == Self::StartOfFrameJpeglsExtended
    }

    /// True for APP0..APP15.
    pub fn is_application_data(self) -> bool {
        (0xE0..=0xEF).contains(&u8::from(self))
    }
}
