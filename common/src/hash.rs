//! 64bit知覚ハッシュ
//!
//! 16桁の16進文字列で永続化する。先頭ビットが最上位ビットになる並びで、
//! 旧インデックスファイルとそのまま互換。

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// ハッシュのビット数
pub const HASH_BITS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageHash(pub u64);

impl ImageHash {
    /// ビット列（先頭が最上位）から構築
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let value = bits
            .into_iter()
            .take(HASH_BITS as usize)
            .fold(0u64, |acc, bit| (acc << 1) | u64::from(bit));
        Self(value)
    }

    /// ハミング距離（異なるビット数）
    pub fn distance(&self, other: &ImageHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::InvalidHash(format!("{}: {}", s, e)))?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::InvalidHash(format!("{}: 16桁の16進数ではありません", s)))?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ImageHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ImageHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ImageHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_counts_differing_bits() {
        let a = ImageHash(0b1011);
        let b = ImageHash(0b0001);
        assert_eq!(a.distance(&b), 2);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(ImageHash(0).distance(&ImageHash(u64::MAX)), HASH_BITS);
    }

    #[test]
    fn test_hex_is_big_endian_16_digits() {
        let hash = ImageHash(0x8000_0000_0000_00ff);
        assert_eq!(hash.to_hex(), "80000000000000ff");
        assert_eq!(ImageHash::from_hex("80000000000000ff").unwrap(), hash);
    }

    #[test]
    fn test_from_bits_first_bit_is_msb() {
        let mut bits = vec![false; 64];
        bits[0] = true;
        bits[63] = true;
        assert_eq!(ImageHash::from_bits(bits).0, 0x8000_0000_0000_0001);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert!(ImageHash::from_hex("abcd").is_err());
        assert!(matches!(
            ImageHash::from_hex("not-hex-at-all!!"),
            Err(Error::InvalidHash(_))
        ));
    }
}
