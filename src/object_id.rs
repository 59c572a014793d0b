use crate::error::Error;
use crate::hex::Hex;
use blake3::Hash;
use serde::{Deserialize, Serialize};

use std::{fmt::Display, str::FromStr};

/// An identifier for a stored object. Under the hood, this is a [`blake3`]
/// hash over the parts that define the object's identity.
///
/// It is displayed in hexadecimal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Hash);

impl ObjectId {
    /// Number of hex characters in a fully written out id.
    pub const HEX_LEN: usize = 64;

    /// Hashes a sequence of parts. Every part is prefixed with its length so
    /// that `["ab", "c"]` and `["a", "bc"]` never collide.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        ObjectId(hasher.finalize())
    }

    /// The first `n` hex characters, as printed in merge log lines.
    pub fn short(&self, n: usize) -> String {
        let mut s = self.to_string();
        s.truncate(n);
        s
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b: &[u8] = self.0.as_bytes();
        write!(f, "{}", Hex::from(b))
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 32] = Hex::decode(s)
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| Error::MalformedId(s.to_string()))?;
        Ok(ObjectId(Hash::from(bytes)))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_of_parts_is_length_prefixed() {
    let a = ObjectId::of_parts([b"ab".as_slice(), b"c".as_slice()]);
    let b = ObjectId::of_parts([b"a".as_slice(), b"bc".as_slice()]);
    assert_ne!(a, b);
    assert_eq!(a, ObjectId::of_parts([b"ab".as_slice(), b"c".as_slice()]));
}

#[test]
fn test_parse_display() {
    let id = ObjectId::of_parts([b"hello".as_slice()]);
    let s = id.to_string();
    assert_eq!(s.len(), ObjectId::HEX_LEN);
    assert_eq!(s.parse::<ObjectId>().unwrap(), id);
    assert_eq!(id.short(7), s[..7]);
    assert!("not hex".parse::<ObjectId>().is_err());
    assert!(s[..10].parse::<ObjectId>().is_err());
}

#[test]
fn test_serde() {
    let id = ObjectId::of_parts([b"hello".as_slice()]);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    let id_: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, id_);
}
