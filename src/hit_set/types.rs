use crate::error::{HitSetError, Result};
use std::fmt;

/// Wire tag of a hit set implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HitSetType {
    #[default]
    None = 0,
    ExplicitHash = 1,
    ExplicitObject = 2,
    Bloom = 3,
}

impl HitSetType {
    pub const ALL: [HitSetType; 4] = [
        HitSetType::None,
        HitSetType::ExplicitHash,
        HitSetType::ExplicitObject,
        HitSetType::Bloom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HitSetType::None => "none",
            HitSetType::ExplicitHash => "explicit_hash",
            HitSetType::ExplicitObject => "explicit_object",
            HitSetType::Bloom => "bloom",
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a tag byte. Unknown tags are malformed input, never `None`.
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(HitSetType::None),
            1 => Ok(HitSetType::ExplicitHash),
            2 => Ok(HitSetType::ExplicitObject),
            3 => Ok(HitSetType::Bloom),
            other => Err(HitSetError::MalformedInput(format!(
                "unrecognized HitSet type {other}"
            ))),
        }
    }
}

impl TryFrom<u8> for HitSetType {
    type Error = HitSetError;

    fn try_from(tag: u8) -> Result<Self> {
        Self::from_u8(tag)
    }
}

impl fmt::Display for HitSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
