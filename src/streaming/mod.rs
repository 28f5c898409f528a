//! Streaming Module
//!
//! Wire format and incremental processing for chat streams:
//! - Frame contract shared by producer and consumer
//! - UTF-8 safe decoding across read boundaries
//! - Line buffering and frame decoding
//! - Frame encoding for response bodies

mod decoder;
mod encoder;
mod frame;
mod utf8_decoder;

pub use decoder::*;
pub use encoder::*;
pub use frame::*;
pub use utf8_decoder::Utf8StreamDecoder;
