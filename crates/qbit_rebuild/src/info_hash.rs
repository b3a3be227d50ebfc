use std::fmt;
use std::str::FromStr;

use crate::bencode::{encode, Value};
use crate::error::{EncodingError, ValidationError};
use crate::utils::sha1_digest;

/// SHA-1 of the bencoded `info` dictionary: a v1 torrent's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Hashes the canonical encoding of an `info` dictionary.
    pub fn of_info(info: &Value) -> Result<Self, EncodingError> {
        Ok(Self(sha1_digest(&encode(info)?)))
    }

    /// Hashes the `info` entry of a full metainfo dictionary.
    pub fn of_metainfo(metainfo: &Value) -> Result<Self, EncodingError> {
        let info = metainfo.get(b"info").ok_or(EncodingError::MissingInfo)?;
        Self::of_info(info)
    }

    /// Parses a 40-character hex string, in either case.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|_| ValidationError::InvalidInfoHash(s.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for InfoHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct RefInfo {
        length: i64,
        name: String,
        #[serde(rename = "piece length")]
        piece_length: i64,
        #[serde(with = "serde_bytes")]
        pieces: Vec<u8>,
    }

    // d6:lengthi1e4:name1:a12:piece lengthi16384e6:pieces20:<20 zero bytes>e
    fn fixture_info() -> Value {
        Value::dict()
            .with("pieces", vec![0u8; 20])
            .with("piece length", 16384i64)
            .with("name", "a")
            .with("length", 1i64)
    }

    #[test]
    fn test_known_info_hash() {
        let mut raw = b"d6:lengthi1e4:name1:a12:piece lengthi16384e6:pieces20:".to_vec();
        raw.extend_from_slice(&[0u8; 20]);
        raw.push(b'e');

        let info = fixture_info();
        assert_eq!(encode(&info).unwrap(), raw);
        assert_eq!(
            InfoHash::of_info(&info).unwrap().to_hex(),
            "161198fb49b44a081ed02da0b8f4f036e5cab471"
        );
    }

    #[test]
    fn test_reference_decoder_agrees() {
        let info = fixture_info();
        let bytes = encode(&info).unwrap();

        let decoded: RefInfo = serde_bencode::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.name, "a");
        assert_eq!(decoded.piece_length, 16384);
        assert_eq!(decoded.pieces, vec![0u8; 20]);
        assert_eq!(decoded.length, 1);

        let re_encoded = serde_bencode::to_bytes(&decoded).unwrap();
        assert_eq!(
            InfoHash::new(sha1_digest(&re_encoded)),
            InfoHash::of_info(&info).unwrap()
        );
    }

    #[test]
    fn test_of_metainfo() {
        let metainfo = Value::dict()
            .with("announce", "http://tracker.example/announce")
            .with("info", fixture_info());
        assert_eq!(
            InfoHash::of_metainfo(&metainfo).unwrap(),
            InfoHash::of_info(&fixture_info()).unwrap()
        );

        assert!(matches!(
            InfoHash::of_metainfo(&Value::dict()),
            Err(EncodingError::MissingInfo)
        ));
    }

    #[test]
    fn test_hex_round_trip() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let hash = InfoHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_string(), hex);
        assert_eq!(
            "0123456789ABCDEF0123456789ABCDEF01234567"
                .parse::<InfoHash>()
                .unwrap(),
            hash
        );
    }

    #[test]
    fn test_invalid_hex() {
        assert!(InfoHash::from_hex("abc").is_err());
        assert!(InfoHash::from_hex(&"zz".repeat(20)).is_err());
        assert!(InfoHash::from_hex(&"00".repeat(21)).is_err());
    }
}
