//! Versioned binary envelope shared by every encodable type in the crate.
//!
//! Each unit is wrapped in a frame:
//!
//! ```text
//! +-----------+-----------+--------------+-------------------+
//! | struct_v  | compat_v  | payload len  | payload ...       |
//! | u8        | u8        | u32 LE       | `len` bytes       |
//! +-----------+-----------+--------------+-------------------+
//! ```
//!
//! A reader refuses frames whose `compat_v` is newer than it understands,
//! hands `struct_v` to the payload decoder so it can pick a layout, and
//! skips whatever the payload decoder did not consume. Frames nest freely,
//! so a variant's own payload can evolve without touching the envelope
//! around it.
mod decode;
mod encode;

pub use decode::DecodeBuf;
pub use encode::EncodeBuf;

use crate::error::Result;
use bincode::config::{Configuration, Fixint, Limit, LittleEndian, NoLimit};

/// Size of the frame header in bytes.
pub const FRAME_HEADER_LEN: usize = 6;

/// Upper bound on what one bincode record may claim while decoding.
///
/// Length prefixes are checked against it before anything is allocated, so
/// a corrupt prefix fails the decode instead of the allocator.
pub const MAX_RECORD_BYTES: usize = 16 << 20;

type FixedLe<L> = Configuration<LittleEndian, Fixint, L>;

/// Fixed-width little-endian layout for values serialized through bincode.
pub(crate) fn bincode_config() -> FixedLe<NoLimit> {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// [`bincode_config`] with the [`MAX_RECORD_BYTES`] allocation limit.
pub(crate) fn bincode_decode_config() -> FixedLe<Limit<MAX_RECORD_BYTES>> {
    bincode_config().with_limit::<MAX_RECORD_BYTES>()
}

/// A value that can write itself into the framed wire format.
pub trait Encodable {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()>;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = EncodeBuf::new();
        self.encode_to(&mut buf)?;
        Ok(buf.into_bytes())
    }
}

/// A value that can be rebuilt from the framed wire format.
pub trait Decodable: Sized {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self>;

    fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_from(&mut DecodeBuf::new(bytes))
    }
}
