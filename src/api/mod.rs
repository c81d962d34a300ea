//! Purpose: Define the stable public Rust API boundary for quarry.
//! Exports: `Client`, `ClientConfig`, the `Decoder` strategy and its variants, errors.
//! Role: Public, additive-only surface; hides the JSON engine plumbing.
//! Invariants: Internal engine modules are not directly exposed.

mod client;
mod config;

pub use crate::core::decoder::{
    DecodeError, Decoder, DecoderKind, FastCompatibleDecoder, FastDecoder, FastestDecoder,
    ParseFailureCategory, StandardDecoder,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use client::Client;
pub use config::{ClientConfig, DECODER_ENV};
