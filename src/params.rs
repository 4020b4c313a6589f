//! Construction parameters for hit sets.
//!
//! [`Params`] names an implementation and carries whatever that
//! implementation needs to be built. It encodes as a type tag followed by
//! the implementation's own framed fields, so each kind can extend its
//! fields without changing the outer envelope.
mod decoder;

pub use decoder::ParamsDecoder;

use crate::codec::{DecodeBuf, Decodable, EncodeBuf, Encodable};
use crate::error::Result;
use crate::hit_set::{
    BloomHitSetParams, ExplicitHashParams, ExplicitObjectParams, HitSetImplOps,
    HitSetType,
};
use serde::Serialize;
use std::fmt;
use tracing::warn;

const STRUCT_V: u8 = 1;
const COMPAT_V: u8 = 1;

/// Per-implementation parameter type.
pub trait ImplParams: Clone + Default + PartialEq + Sized {
    const TYPE: HitSetType;

    /// Borrows the parameters out of `params` if it is of this kind.
    fn from_params(params: &Params) -> Option<&Self>;

    fn from_params_mut(params: &mut Params) -> Option<&mut Self>;

    fn into_params(self) -> Params;

    /// Writes kind-specific fields. The default is an empty, but still
    /// versioned, frame.
    fn encode_impl_bits(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(1, 1, |_| Ok(()))
    }

    fn decode_impl_bits(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame(Self::TYPE.name(), 1, |_, _| Ok(Self::default()))
    }

    fn dump_impl(&self) -> ImplParamsDump {
        ImplParamsDump::Empty {}
    }

    fn fmt_impl(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

/// How to build a hit set.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    ExplicitHash(ExplicitHashParams),
    ExplicitObject(ExplicitObjectParams),
    Bloom(BloomHitSetParams),
}

/// Kind-specific part of a [`ParamsDump`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImplParamsDump {
    Empty {},
    Bloom(BloomHitSetParams),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamsDump {
    #[serde(rename = "type")]
    pub type_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impl_params: Option<ImplParamsDump>,
}

impl Params {
    /// Default parameters for `kind`.
    pub fn new(kind: HitSetType) -> Self {
        match kind {
            HitSetType::None => Params::None,
            HitSetType::ExplicitHash => Params::ExplicitHash(ExplicitHashParams),
            HitSetType::ExplicitObject => {
                Params::ExplicitObject(ExplicitObjectParams)
            }
            HitSetType::Bloom => Params::Bloom(BloomHitSetParams::default()),
        }
    }

    /// Independent copy of `other`.
    pub fn create_copy(other: &Params) -> Params {
        other.clone()
    }

    pub fn get_type(&self) -> HitSetType {
        match self {
            Params::None => HitSetType::None,
            Params::ExplicitHash(_) => HitSetType::ExplicitHash,
            Params::ExplicitObject(_) => HitSetType::ExplicitObject,
            Params::Bloom(_) => HitSetType::Bloom,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.get_type().name()
    }

    /// Parameters for implementation `T`, or `None` if these params are
    /// for a different kind.
    ///
    /// ```
    /// use hitset::{BloomHitSet, ExplicitHashHitSet, HitSetType, Params};
    ///
    /// let params = Params::new(HitSetType::Bloom);
    /// assert!(params.get_as_type::<BloomHitSet>().is_some());
    /// assert!(params.get_as_type::<ExplicitHashHitSet>().is_none());
    /// ```
    pub fn get_as_type<T: HitSetImplOps>(&self) -> Option<&T::Params> {
        T::Params::from_params(self)
    }

    pub fn get_as_type_mut<T: HitSetImplOps>(&mut self) -> Option<&mut T::Params> {
        T::Params::from_params_mut(self)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Params::Bloom(p) => p.validate(),
            _ => Ok(()),
        }
    }

    pub fn dump(&self) -> ParamsDump {
        ParamsDump {
            type_name: self.type_name(),
            impl_params: match self {
                Params::None => None,
                Params::ExplicitHash(p) => Some(p.dump_impl()),
                Params::ExplicitObject(p) => Some(p.dump_impl()),
                Params::Bloom(p) => Some(p.dump_impl()),
            },
        }
    }

    #[cfg(feature = "tests")]
    pub fn generate_test_instances() -> Vec<Self> {
        let mut out: Vec<Self> = HitSetType::ALL.into_iter().map(Self::new).collect();
        out.extend(
            BloomHitSetParams::generate_test_instances()
                .into_iter()
                .map(Params::Bloom),
        );
        out.push(Params::ExplicitObject(ExplicitObjectParams));
        out.push(Params::ExplicitHash(ExplicitHashParams));
        out
    }
}

impl From<ExplicitHashParams> for Params {
    fn from(p: ExplicitHashParams) -> Self {
        p.into_params()
    }
}

impl From<ExplicitObjectParams> for Params {
    fn from(p: ExplicitObjectParams) -> Self {
        p.into_params()
    }
}

impl From<BloomHitSetParams> for Params {
    fn from(p: BloomHitSetParams) -> Self {
        p.into_params()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "params type:{} impl params {{", self.type_name())?;
        match self {
            Params::None => {}
            Params::ExplicitHash(p) => p.fmt_impl(f)?,
            Params::ExplicitObject(p) => p.fmt_impl(f)?,
            Params::Bloom(p) => p.fmt_impl(f)?,
        }
        write!(f, "}}")
    }
}

impl Encodable for Params {
    fn encode_to(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.encode_frame(STRUCT_V, COMPAT_V, |buf| {
            buf.write_u8(self.get_type().as_u8());
            match self {
                Params::None => Ok(()),
                Params::ExplicitHash(p) => p.encode_impl_bits(buf),
                Params::ExplicitObject(p) => p.encode_impl_bits(buf),
                Params::Bloom(p) => p.encode_impl_bits(buf),
            }
        })
    }
}

impl Decodable for Params {
    fn decode_from(buf: &mut DecodeBuf<'_>) -> Result<Self> {
        buf.decode_frame("hit_set params", STRUCT_V, |buf, _struct_v| {
            let tag = buf.read_u8()?;
            let kind = HitSetType::from_u8(tag).inspect_err(|err| {
                warn!(tag, %err, "refusing to decode hit set params");
            })?;
            Ok(match kind {
                HitSetType::None => Params::None,
                HitSetType::ExplicitHash => {
                    Params::ExplicitHash(ExplicitHashParams::decode_impl_bits(buf)?)
                }
                HitSetType::ExplicitObject => Params::ExplicitObject(
                    ExplicitObjectParams::decode_impl_bits(buf)?,
                ),
                HitSetType::Bloom => {
                    Params::Bloom(BloomHitSetParams::decode_impl_bits(buf)?)
                }
            })
        })
    }
}
