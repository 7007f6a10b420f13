use crate::*;
use ed25519_dalek::PublicKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryInto;
use std::str::FromStr;

/// The identity of a caller: an ed25519 public key.
///
/// Principals are used for authorization and as map keys. They are displayed
/// and serialized as lowercase hex.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Principal([u8; 32]);

impl Principal {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::BadLength {
            expected: 32,
            found: bytes.len(),
        })?;
        Ok(Principal(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret the principal as an ed25519 public key for signature checks.
    pub fn public_key(&self) -> Result<PublicKey, Error> {
        Ok(PublicKey::from_bytes(&self.0)?)
    }
}

impl From<[u8; 32]> for Principal {
    fn from(bytes: [u8; 32]) -> Self {
        Principal(bytes)
    }
}

impl From<PublicKey> for Principal {
    fn from(public: PublicKey) -> Self {
        Principal(public.to_bytes())
    }
}

impl From<&PublicKey> for Principal {
    fn from(public: &PublicKey) -> Self {
        Principal(public.to_bytes())
    }
}

impl FromStr for Principal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Principal::from_bytes(&bytes)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Principal({})", self)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Principal::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
