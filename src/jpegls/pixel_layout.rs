use crate::error::JpeglsErrc;
use crate::frame_info::FrameInfo;
use crate::jpegls::InterleaveMode;

/// Addressing of samples in a caller-owned pixel buffer.
///
/// With interleave mode `None` the buffer holds one plane per component,
/// planes `stride * height` bytes apart. Otherwise pixels are stored
/// interleaved (`RGBRGB...`) and `stride` is the distance between rows.
/// Samples wider than 8 bits are little-endian `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    width: usize,
    height: usize,
    component_count: usize,
    bytes_per_sample: usize,
    interleave_mode: InterleaveMode,
    stride: usize,
}

impl PixelLayout {
    /// A `stride` of 0 selects tightly packed rows.
    pub fn new(frame_info: &FrameInfo, interleave_mode: InterleaveMode, stride: u32) -> Result<Self, JpeglsErrc> {
        let mut layout = Self {
            width: frame_info.width() as usize,
            height: frame_info.height() as usize,
            component_count: frame_info.component_count() as usize,
            bytes_per_sample: frame_info.bytes_per_sample(),
            interleave_mode,
            stride: 0,
        };

        let minimum_stride = layout.minimum_stride();
        layout.stride = match stride as usize {
            0 => minimum_stride,
            stride if stride < minimum_stride => return Err(JpeglsErrc::InvalidArgumentStride),
            stride => stride,
        };
        Ok(layout)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    fn minimum_stride(&self) -> usize {
        match self.interleave_mode {
            InterleaveMode::None => self.width * self.bytes_per_sample,
            InterleaveMode::Line | InterleaveMode::Sample => {
                self.width * self.component_count * self.bytes_per_sample
            }
        }
    }

    /// Bytes needed to hold the image; the padding after the last row is not
    /// required.
    pub fn required_size(&self) -> usize {
        let rows = match self.interleave_mode {
            InterleaveMode::None => self.height * self.component_count,
            InterleaveMode::Line | InterleaveMode::Sample => self.height,
        };
        self.stride * rows - (self.stride - self.minimum_stride())
    }

    fn offset(&self, component: usize, row: usize, x: usize) -> usize {
        match self.interleave_mode {
            InterleaveMode::None => (component * self.height + row) * self.stride + x * self.bytes_per_sample,
            InterleaveMode::Line | InterleaveMode::Sample => {
                row * self.stride + (x * self.component_count + component) * self.bytes_per_sample
            }
        }
    }

    /// Collects the samples of `components` into the line interleaved layout
    /// used by the scan coders. A sample above `maximum_sample_value` is an
    /// invalid argument.
    pub fn gather(
        &self,
        source: &[u8],
        components: &[usize],
        maximum_sample_value: i32,
    ) -> Result<Vec<i32>, JpeglsErrc> {
        let mut samples = Vec::with_capacity(self.width * self.height * components.len());
        for row in 0..self.height {
            for &component in components {
                for x in 0..self.width {
                    let offset = self.offset(component, row, x);
                    let value = if self.bytes_per_sample == 1 {
                        i32::from(source[offset])
                    } else {
                        i32::from(u16::from_le_bytes([source[offset], source[offset + 1]]))
                    };
                    if value > maximum_sample_value {
                        log::debug!("sample {value} of component {component} exceeds {maximum_sample_value}");
                        return Err(JpeglsErrc::InvalidArgument);
                    }
                    samples.push(value);
                }
            }
        }
        Ok(samples)
    }

    /// Writes line interleaved scan samples of `components` into `destination`.
    pub fn scatter(&self, samples: &[i32], components: &[usize], destination: &mut [u8]) {
        let mut index = 0;
        for row in 0..self.height {
            for &component in components {
                for x in 0..self.width {
                    let offset = self.offset(component, row, x);
                    let value = samples[index];
                    index += 1;
                    if self.bytes_per_sample == 1 {
                        destination[offset] = value as u8;
                    } else {
                        destination[offset..offset + 2].copy_from_slice(&(value as u16).to_le_bytes());
                    }
                }
            }
        }
    }
}
