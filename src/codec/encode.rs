use super::bincode_config;
use crate::error::{HitSetError, Result};

/// Growable output buffer with little-endian writers and frame support.
#[derive(Debug, Default)]
pub struct EncodeBuf {
    bytes: Vec<u8>,
}

impl EncodeBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u32_le(&mut self, n: u32) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, n: u64) {
        self.write(&n.to_le_bytes());
    }

    /// Writes a `u32` element count, failing if `len` does not fit.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| {
            HitSetError::Serialization(format!("length {len} exceeds u32"))
        })?;
        self.write_u32_le(len);
        Ok(())
    }

    /// Appends `value` using the crate's fixed-width bincode layout.
    pub fn write_bincode<T: bincode::Encode>(&mut self, value: &T) -> Result<()> {
        bincode::encode_into_std_write(value, &mut self.bytes, bincode_config())?;
        Ok(())
    }

    /// Writes a versioned frame whose payload is produced by `body`.
    ///
    /// The length field is back-patched once `body` returns, so nested
    /// frames need no size precomputation.
    pub fn encode_frame<F>(
        &mut self,
        struct_v: u8,
        compat_v: u8,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        debug_assert!(compat_v <= struct_v);
        self.write_u8(struct_v);
        self.write_u8(compat_v);
        let len_at = self.bytes.len();
        self.write_u32_le(0);
        let start = self.bytes.len();

        body(self)?;

        let payload_len = u32::try_from(self.bytes.len() - start).map_err(|_| {
            HitSetError::Serialization("frame payload exceeds u32".into())
        })?;
        self.bytes[len_at..start].copy_from_slice(&payload_len.to_le_bytes());
        Ok(())
    }
}
