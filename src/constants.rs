pub const DEFAULT_RESET_THRESHOLD: i32 = 64; // Default RESET value as defined in ISO/IEC 14495-1, table C.2

pub const MINIMUM_WIDTH: u32 = 1;
pub const MAXIMUM_WIDTH: u32 = u16::MAX as u32;
pub const MINIMUM_HEIGHT: u32 = 1;
pub const MAXIMUM_HEIGHT: u32 = u16::MAX as u32;
pub const MINIMUM_COMPONENT_COUNT: i32 = 1;
pub const MAXIMUM_COMPONENT_COUNT: i32 = 255;
pub const MAXIMUM_COMPONENT_COUNT_IN_SCAN: i32 = 4;
pub const MINIMUM_BITS_PER_SAMPLE: i32 = 2;
pub const MAXIMUM_BITS_PER_SAMPLE: i32 = 16;
pub const MAXIMUM_NEAR_LOSSLESS: i32 = 255;

pub const MAX_K_VALUE: i32 = 16; // This is an implementation limit (theoretical limit is 32)

// ISO/IEC 14495-1, section 4.8.1 defines the SPIFF version numbers to be used for the SPIFF header in combination with
// JPEG-LS.
pub const SPIFF_MAJOR_REVISION_NUMBER: u8 = 2;
pub const SPIFF_MINOR_REVISION_NUMBER: u8 = 0;

pub const SPIFF_END_OF_DIRECTORY_ENTRY_TYPE: u32 = 1;

// The size of a SPIFF header when serialized to a JPEG byte stream.
pub const SPIFF_HEADER_SIZE_IN_BYTES: usize = 34;

// APP8 segment holding the end-of-directory entry followed by the SOI of the wrapped stream.
pub const SPIFF_END_OF_DIRECTORY_SIZE_IN_BYTES: usize = 10;

// Stride value that asks the codec to use tightly packed rows.
pub const AUTO_CALCULATE_STRIDE: u32 = 0;

// Slack added to the worst-case scan size for headers and segments.
pub const DESTINATION_SIZE_SLACK: usize = 1024;

pub const J: [i32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];
