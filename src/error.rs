//! Error types shared by the native codec boundary and the safe binding.
//!
//! [`JpeglsErrc`] is the integer result-code table spoken across the C ABI
//! (numbered like CharLS 2.x). [`CodecError`] is what every public operation
//! returns; [`translate`] turns one into the other.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::borrow::Cow;
use thiserror::Error;

/// Result codes returned by the native codec functions. `0` means success and
/// is therefore not a variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum JpeglsErrc {
    #[error("Invalid argument")]
    InvalidArgument = 1,
    #[error("Parameter value not supported")]
    ParameterValueNotSupported = 2,
    #[error("Destination buffer too small")]
    DestinationBufferTooSmall = 3,
    #[error("Source buffer too small")]
    SourceBufferTooSmall = 4,
    #[error("Invalid encoded data")]
    InvalidEncodedData = 5,
    #[error("Too much encoded data")]
    TooMuchEncodedData = 6,
    #[error("Invalid operation")]
    InvalidOperation = 7,
    #[error("Bit depth for transform not supported")]
    BitDepthForTransformNotSupported = 8,
    #[error("Color transform not supported")]
    ColorTransformNotSupported = 9,
    #[error("Encoding not supported")]
    EncodingNotSupported = 10,
    #[error("Unknown JPEG marker found")]
    UnknownJpegMarkerFound = 11,
    #[error("JPEG marker start byte not found")]
    JpegMarkerStartByteNotFound = 12,
    #[error("Not enough memory")]
    NotEnoughMemory = 13,
    #[error("Unexpected failure")]
    UnexpectedFailure = 14,
    #[error("Start of image marker not found")]
    StartOfImageMarkerNotFound = 15,
    #[error("Unexpected marker found")]
    UnexpectedMarkerFound = 16,
    #[error("Invalid marker segment size")]
    InvalidMarkerSegmentSize = 17,
    #[error("Duplicate start of image marker")]
    DuplicateStartOfImageMarker = 18,
    #[error("Duplicate start of frame marker")]
    DuplicateStartOfFrameMarker = 19,
    #[error("Duplicate component ID in SOF segment")]
    DuplicateComponentIdInSofSegment = 20,
    #[error("Unexpected end of image marker")]
    UnexpectedEndOfImageMarker = 21,
    #[error("Invalid JPEG-LS preset parameter type")]
    InvalidJpeglsPresetParameterType = 22,
    #[error("JPEG-LS preset extended parameter type not supported")]
    JpeglsPresetExtendedParameterTypeNotSupported = 23,
    #[error("Missing end of SPIFF directory")]
    MissingEndOfSpiffDirectory = 24,
    #[error("Unexpected restart marker")]
    UnexpectedRestartMarker = 25,
    #[error("Restart marker not found")]
    RestartMarkerNotFound = 26,
    #[error("Callback failed")]
    CallbackFailed = 27,
    #[error("End of image marker not found")]
    EndOfImageMarkerNotFound = 28,
    #[error("Unexpected define number of lines marker")]
    UnexpectedDefineNumberOfLinesMarker = 29,
    #[error("Define number of lines marker not found")]
    DefineNumberOfLinesMarkerNotFound = 30,
    #[error("Unknown component ID")]
    UnknownComponentId = 31,
    #[error("Abbreviated format and SPIFF header mismatch")]
    AbbreviatedFormatAndSpiffHeaderMismatch = 32,
    #[error("Unexpected start of scan marker")]
    UnexpectedStartOfScanMarker = 33,

    #[error("Invalid argument width")]
    InvalidArgumentWidth = 100,
    #[error("Invalid argument height")]
    InvalidArgumentHeight = 101,
    #[error("Invalid argument component count")]
    InvalidArgumentComponentCount = 102,
    #[error("Invalid argument bits per sample")]
    InvalidArgumentBitsPerSample = 103,
    #[error("Invalid argument interleave mode")]
    InvalidArgumentInterleaveMode = 104,
    #[error("Invalid argument near lossless")]
    InvalidArgumentNearLossless = 105,
    #[error("Invalid argument JPEG-LS PC parameters")]
    InvalidArgumentJpeglsPcParameters = 106,
    #[error("Invalid argument size")]
    InvalidArgumentSize = 107,
    #[error("Invalid argument SPIFF entry size")]
    InvalidArgumentSpiffEntrySize = 110,
    #[error("Invalid argument color transformation")]
    InvalidArgumentColorTransformation = 111,
    #[error("Invalid argument stride")]
    InvalidArgumentStride = 112,

    #[error("Invalid parameter width")]
    InvalidParameterWidth = 200,
    #[error("Invalid parameter height")]
    InvalidParameterHeight = 201,
    #[error("Invalid parameter component count")]
    InvalidParameterComponentCount = 202,
    #[error("Invalid parameter bits per sample")]
    InvalidParameterBitsPerSample = 203,
    #[error("Invalid parameter interleave mode")]
    InvalidParameterInterleaveMode = 204,
    #[error("Invalid parameter near lossless")]
    InvalidParameterNearLossless = 205,
    #[error("Invalid parameter JPEG-LS preset parameters")]
    InvalidParameterJpeglsPresetParameters = 206,
}

impl JpeglsErrc {
    /// The raw integer carried across the C ABI.
    pub fn code(self) -> i32 {
        self.into()
    }

    fn is_argument_error(self) -> bool {
        self == JpeglsErrc::InvalidArgument || (100..200).contains(&self.code())
    }
}

/// Failure returned by every public encoder, decoder and header operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A caller-supplied value violates a precondition.
    /// `Some` when the native codec rejected the value.
    #[error("invalid argument: {0}")]
    InvalidArgument(Cow<'static, str>, Option<JpeglsErrc>),
    /// The method is not valid in the current session state.
    #[error("invalid operation order: {0}")]
    InvalidOperationOrder(&'static str, Option<JpeglsErrc>),
    /// The native codec returned a non-zero code. `errc` is `None` for codes
    /// this crate does not know about.
    #[error("native codec failed with code {code}{}", describe(.errc))]
    NativeFailure { code: i32, errc: Option<JpeglsErrc> },
    #[error("JPEG marker start byte not found")]
    JpegMarkerStartByteNotFound,
    #[error("encoding not supported")]
    EncodingNotSupported,
    #[error("unknown JPEG marker found")]
    UnknownJpegMarkerFound,
    #[error("not enough memory")]
    OutOfResources,
    #[error("{field} value {value} overflows a signed 32-bit integer")]
    Overflow { field: &'static str, value: u32 },
}

fn describe(errc: &Option<JpeglsErrc>) -> String {
    match errc {
        Some(errc) => format!(" ({errc})"),
        None => String::new(),
    }
}

impl CodecError {
    pub(crate) fn invalid_argument(message: &'static str) -> Self {
        CodecError::InvalidArgument(Cow::Borrowed(message), None)
    }

    /// Maps a non-zero native result code onto the error taxonomy.
    pub fn from_native(code: i32) -> Self {
        match JpeglsErrc::try_from(code) {
            Ok(errc) => errc.into(),
            Err(_) => CodecError::NativeFailure { code, errc: None },
        }
    }

    /// The native result code this error originated from, if any.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            CodecError::NativeFailure { code, .. } => Some(*code),
            CodecError::InvalidArgument(_, Some(errc)) | CodecError::InvalidOperationOrder(_, Some(errc)) => {
                Some(errc.code())
            }
            CodecError::JpegMarkerStartByteNotFound => Some(JpeglsErrc::JpegMarkerStartByteNotFound.code()),
            CodecError::EncodingNotSupported => Some(JpeglsErrc::EncodingNotSupported.code()),
            CodecError::UnknownJpegMarkerFound => Some(JpeglsErrc::UnknownJpegMarkerFound.code()),
            CodecError::OutOfResources => Some(JpeglsErrc::NotEnoughMemory.code()),
            _ => None,
        }
    }
}

impl From<JpeglsErrc> for CodecError {
    fn from(errc: JpeglsErrc) -> Self {
        match errc {
            JpeglsErrc::InvalidOperation => {
                CodecError::InvalidOperationOrder("native codec rejected the call sequence", Some(errc))
            }
            JpeglsErrc::NotEnoughMemory => CodecError::OutOfResources,
            JpeglsErrc::JpegMarkerStartByteNotFound => CodecError::JpegMarkerStartByteNotFound,
            JpeglsErrc::EncodingNotSupported => CodecError::EncodingNotSupported,
            JpeglsErrc::UnknownJpegMarkerFound => CodecError::UnknownJpegMarkerFound,
            errc if errc.is_argument_error() => {
                CodecError::InvalidArgument(Cow::Owned(errc.to_string()), Some(errc))
            }
            errc => CodecError::NativeFailure {
                code: errc.code(),
                errc: Some(errc),
            },
        }
    }
}

/// Checks a native result code: `0` is success, anything else becomes a
/// [`CodecError`].
pub fn translate(code: i32) -> Result<(), CodecError> {
    if code == 0 {
        Ok(())
    } else {
        Err(CodecError::from_native(code))
    }
}
