//! JPEG-LS engine (ISO/IEC 14495-1 / ITU-T T.87) behind the built-in native backend.
//!
//! The engine is split the usual way:
//! - `encoder` / `decoder`: frame level, marker segments and sample layout.
//! - `scan_encoder` / `scan_decoder`: the entropy coded segment of one scan.
//! - `context_model`, `regular_mode_context`, `run_mode_context`, `traits`:
//!   context modelling and the sample arithmetic shared by both directions.
//!
//! Interleave modes `Line` and `Sample` code every component of the frame in
//! one scan and are limited to four components; `None` writes one scan per
//! component.

pub mod coding_parameters;
pub mod context_model;
pub mod decoder;
pub mod encoder;
pub mod pixel_layout;
pub mod regular_mode_context;
pub mod run_mode_context;
pub mod scan_decoder;
pub mod scan_encoder;
pub mod traits;

pub use coding_parameters::{CodingParameters, JpeglsPcParameters};

use crate::error::JpeglsErrc;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Interleave mode for multi-component scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[num_enum(error_type(name = JpeglsErrc, constructor = invalid_interleave_mode))]
pub enum InterleaveMode {
    /// No interleaving: one scan per component.
    #[default]
    None = 0,
    /// Interleaved by line.
    Line = 1,
    /// Interleaved by sample.
    Sample = 2,
}

fn invalid_interleave_mode(_: u8) -> JpeglsErrc {
    JpeglsErrc::InvalidParameterInterleaveMode
}

impl InterleaveMode {
    /// Converts the value carried across the C ABI.
    pub fn from_native(value: i32) -> Result<Self, JpeglsErrc> {
        u8::try_from(value)
            .map_err(|_| JpeglsErrc::InvalidArgumentInterleaveMode)
            .and_then(|value| Self::try_from(value).map_err(|_| JpeglsErrc::InvalidArgumentInterleaveMode))
    }
}
