use super::{Params, ParamsDump};
use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::Result;
use crate::hit_set::HitSetType;

/// Owns zero or one [`Params`] and moves them in and out of the wire format.
///
/// The held value is dropped with the decoder unless a caller takes it with
/// [`extract_params`](Self::extract_params) first.
#[derive(Debug, Default, PartialEq)]
pub struct ParamsDecoder {
    params: Option<Params>,
}

impl ParamsDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Params) -> Self {
        Self {
            params: Some(params),
        }
    }

    pub fn get_params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Moves the held params out, leaving the decoder empty.
    pub fn extract_params(&mut self) -> Option<Params> {
        self.params.take()
    }

    /// Drops whatever is held and installs `params`.
    pub fn reset_params(&mut self, params: Option<Params>) {
        self.params = params;
    }

    pub fn get_type(&self) -> HitSetType {
        self.params
            .as_ref()
            .map_or(HitSetType::None, Params::get_type)
    }

    pub fn dump(&self) -> Option<ParamsDump> {
        self.params.as_ref().map(Params::dump)
    }

    /// Replaces the held params with ones decoded from `buf`.
    ///
    /// The previous value is dropped before decoding starts, so on error the
    /// decoder is left empty.
    pub fn decode_into(&mut self, buf: &mut DecodeBuf<'_>) -> Result<()> {
        self.params = None;
        self.params = Some(Params::decode_from(buf)?);
        Ok(())
    }

    #[cfg(feature = "tests")]
    pub fn generate_test_instances() -> Vec<Self> {
        let mut out = vec![Self::new()];
        out.extend(Params::generate_test_instances().into_iter().map(Self::with_params));
        out
    }
}

impl Encodable for ParamsDecoder {
    /// An empty decoder encodes as [`Params::None`].
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        match &self.params {
            Some(params) => params.encode_to(buf),
            None => Params::None.encode_to(buf),
        }
    }
}

impl Decodable for ParamsDecoder {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        let mut decoder = Self::new();
        decoder.decode_into(buf)?;
        Ok(decoder)
    }
}
