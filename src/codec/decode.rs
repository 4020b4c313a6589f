use super::bincode_decode_config;
use crate::error::{HitSetError, Result};
use tracing::trace;

/// Read cursor over an encoded byte slice.
#[derive(Debug, Clone)]
pub struct DecodeBuf<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DecodeBuf<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrows the next `n` bytes and advances past them.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(HitSetError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a `u32` element count written by `EncodeBuf::write_len`.
    pub fn read_len(&mut self) -> Result<usize> {
        Ok(self.read_u32_le()? as usize)
    }

    /// Reads one value in the crate's fixed-width bincode layout.
    ///
    /// Length prefixes claiming more than [`super::MAX_RECORD_BYTES`] are
    /// rejected as malformed input.
    pub fn read_bincode<T: bincode::Decode<()>>(&mut self) -> Result<T> {
        let (value, consumed) = bincode::decode_from_slice(
            &self.buf[self.pos..],
            bincode_decode_config(),
        )?;
        self.pos += consumed;
        Ok(value)
    }

    /// Reads a versioned frame and hands its payload to `body`.
    ///
    /// `body` receives a cursor limited to the payload plus the frame's
    /// structural version. Bytes it leaves unread belong to a newer
    /// compatible layout and are skipped.
    pub fn decode_frame<T, F>(
        &mut self,
        what: &'static str,
        supported_v: u8,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut DecodeBuf<'a>, u8) -> Result<T>,
    {
        let struct_v = self.read_u8()?;
        let compat_v = self.read_u8()?;
        if compat_v > supported_v {
            return Err(HitSetError::IncompatibleVersion {
                what,
                compat: compat_v,
                supported: supported_v,
            });
        }
        let len = self.read_len()?;
        let mut payload = DecodeBuf::new(self.read_exact(len)?);

        let value = body(&mut payload, struct_v)?;

        if !payload.is_empty() {
            trace!(
                what,
                struct_v,
                skipped = payload.remaining(),
                "skipping unknown trailing frame data"
            );
        }
        Ok(value)
    }
}
