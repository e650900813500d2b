use crate::constants::{
    MAXIMUM_BITS_PER_SAMPLE, MAXIMUM_COMPONENT_COUNT, MAXIMUM_HEIGHT, MAXIMUM_WIDTH, MINIMUM_BITS_PER_SAMPLE,
    MINIMUM_COMPONENT_COUNT, MINIMUM_HEIGHT, MINIMUM_WIDTH,
};
use crate::error::CodecError;
use crate::jpegls::InterleaveMode;
use crate::native::FrameInfoNative;

/// Geometry and sample format of an image.
///
/// A `FrameInfo` is always within the bounds a JPEG-LS frame header can
/// describe; construction validates every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameInfo {
    width: u32,
    height: u32,
    bits_per_sample: i32,
    component_count: i32,
}

impl FrameInfo {
    pub fn new(width: u32, height: u32, bits_per_sample: i32, component_count: i32) -> Result<Self, CodecError> {
        if !(MINIMUM_WIDTH..=MAXIMUM_WIDTH).contains(&width) {
            return Err(CodecError::invalid_argument("width must be in 1..=65535"));
        }
        if !(MINIMUM_HEIGHT..=MAXIMUM_HEIGHT).contains(&height) {
            return Err(CodecError::invalid_argument("height must be in 1..=65535"));
        }
        if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE).contains(&bits_per_sample) {
            return Err(CodecError::invalid_argument("bits per sample must be in 2..=16"));
        }
        if !(MINIMUM_COMPONENT_COUNT..=MAXIMUM_COMPONENT_COUNT).contains(&component_count) {
            return Err(CodecError::invalid_argument("component count must be in 1..=255"));
        }

        Ok(Self {
            width,
            height,
            bits_per_sample,
            component_count,
        })
    }

    /// Converts geometry reported by the native codec. Dimensions above
    /// `i32::MAX` fail with [`CodecError::Overflow`] before any bounds check.
    pub fn from_native(native: &FrameInfoNative) -> Result<Self, CodecError> {
        for (field, value) in [("width", native.width), ("height", native.height)] {
            if i32::try_from(value).is_err() {
                return Err(CodecError::Overflow { field, value });
            }
        }
        Self::new(
            native.width,
            native.height,
            native.bits_per_sample,
            native.component_count,
        )
    }

    pub fn to_native(&self) -> FrameInfoNative {
        FrameInfoNative {
            width: self.width,
            height: self.height,
            bits_per_sample: self.bits_per_sample,
            component_count: self.component_count,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_sample(&self) -> i32 {
        self.bits_per_sample
    }

    pub fn component_count(&self) -> i32 {
        self.component_count
    }

    /// Bytes used to store one sample: 1 up to 8 bits, 2 above.
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    /// Size in bytes of the tightly packed pixel buffer for this frame.
    pub fn pixel_data_size(&self) -> usize {
        self.width as usize * self.height as usize * self.component_count as usize * self.bytes_per_sample()
    }

    /// Bytes a pixel buffer with rows `stride` apart must hold (0: tightly
    /// packed). The padding after the last row is not required.
    pub fn buffer_size(&self, interleave_mode: InterleaveMode, stride: u32) -> Result<usize, CodecError> {
        let width = self.width as usize;
        let height = self.height as usize;
        let component_count = self.component_count as usize;

        let (row_size, rows) = match interleave_mode {
            InterleaveMode::None => (width * self.bytes_per_sample(), height * component_count),
            InterleaveMode::Line | InterleaveMode::Sample => (width * component_count * self.bytes_per_sample(), height),
        };
        let stride = match stride as usize {
            0 => row_size,
            stride if stride < row_size => {
                return Err(CodecError::invalid_argument("stride is smaller than one row"));
            }
            stride => stride,
        };
        Ok(stride * (rows - 1) + row_size)
    }
}
