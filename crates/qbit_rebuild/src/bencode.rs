//! Canonical bencode encoding. Dictionary keys are emitted sorted by raw
//! bytes, so the same value always encodes to the same bytes.

use std::io::Write;

use bytes::Bytes;

use crate::error::EncodingError;

/// A bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Bytes),
    List(Vec<Value>),
    /// Insertion order. Keys must be unique.
    Dict(Vec<(Bytes, Value)>),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }

    pub fn dict() -> Self {
        Value::Dict(Vec::new())
    }

    /// Appends `key` to a dictionary. Does nothing for other variants.
    pub fn with(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        if let Value::Dict(entries) = &mut self {
            entries.push((Bytes::from_static(key.as_bytes()), value.into()));
        }
        self
    }

    /// Like [`Value::with`], skipping the entry when `value` is `None`.
    pub fn with_opt<V: Into<Value>>(self, key: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a UTF-8 string, if it is a valid UTF-8 byte string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Bytes, Value)]> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| &k[..] == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Bytes(Bytes::from(s.into_bytes()))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

pub fn encode(value: &Value) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::new();
    encode_to(value, &mut buf)?;
    Ok(buf)
}

/// Encodes a bencode value into `writer`.
///
/// Nothing is written if the tree holds a duplicate key: the whole tree is
/// checked before the first byte goes out.
pub fn encode_to<W: Write>(value: &Value, writer: &mut W) -> Result<(), EncodingError> {
    check_unique_keys(value)?;
    encode_value(value, writer)
}

fn check_unique_keys(value: &Value) -> Result<(), EncodingError> {
    match value {
        Value::Integer(_) | Value::Bytes(_) => Ok(()),
        Value::List(l) => l.iter().try_for_each(check_unique_keys),
        Value::Dict(d) => {
            let mut keys: Vec<&Bytes> = d.iter().map(|(k, _)| k).collect();
            keys.sort();
            if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(EncodingError::DuplicateKey(
                    String::from_utf8_lossy(pair[0]).into_owned(),
                ));
            }
            d.iter().try_for_each(|(_, v)| check_unique_keys(v))
        }
    }
}

fn encode_value<W: Write>(value: &Value, writer: &mut W) -> Result<(), EncodingError> {
    match value {
        Value::Integer(i) => {
            write!(writer, "i{}e", i)?;
        }
        Value::Bytes(b) => encode_bytes(b, writer)?,
        Value::List(l) => {
            writer.write_all(b"l")?;
            for item in l {
                encode_value(item, writer)?;
            }
            writer.write_all(b"e")?;
        }
        Value::Dict(d) => {
            // Raw byte order, not locale or case-insensitive order.
            let mut entries: Vec<&(Bytes, Value)> = d.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            writer.write_all(b"d")?;
            for (key, val) in entries {
                encode_bytes(key, writer)?;
                encode_value(val, writer)?;
            }
            writer.write_all(b"e")?;
        }
    }
    Ok(())
}

fn encode_bytes<W: Write>(bytes: &[u8], writer: &mut W) -> Result<(), EncodingError> {
    write!(writer, "{}:", bytes.len())?;
    writer.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integer() {
        assert_eq!(encode(&Value::Integer(42)).unwrap(), b"i42e");
        assert_eq!(encode(&Value::Integer(-42)).unwrap(), b"i-42e");
        assert_eq!(encode(&Value::Integer(0)).unwrap(), b"i0e");
    }

    #[test]
    fn test_encode_bytes() {
        assert_eq!(encode(&Value::string("spam")).unwrap(), b"4:spam");
        assert_eq!(encode(&Value::string("")).unwrap(), b"0:");
    }

    #[test]
    fn test_encode_non_utf8_bytes() {
        let raw = vec![0xff, 0x00, 0xfe, b':'];
        assert_eq!(
            encode(&Value::from(raw)).unwrap(),
            b"4:\xff\x00\xfe:".to_vec()
        );
    }

    #[test]
    fn test_encode_list() {
        let list = Value::List(vec![Value::string("spam"), Value::Integer(42)]);
        assert_eq!(encode(&list).unwrap(), b"l4:spami42ee");
        assert_eq!(encode(&Value::List(vec![])).unwrap(), b"le");
    }

    #[test]
    fn test_encode_dict_sorts_keys() {
        let dict = Value::dict()
            .with("pieces", Value::string("xx"))
            .with("name", "a")
            .with("length", 3i64);
        assert_eq!(
            encode(&dict).unwrap(),
            b"d6:lengthi3e4:name1:a6:pieces2:xxe"
        );
    }

    #[test]
    fn test_encode_dict_sorts_by_raw_bytes() {
        // Upper case sorts before lower case, and a prefix before its extensions.
        let dict = Value::dict()
            .with("b", 1i64)
            .with("ab", 2i64)
            .with("a", 3i64)
            .with("B", 4i64);
        assert_eq!(
            encode(&dict).unwrap(),
            b"d1:Bi4e1:ai3e2:abi2e1:bi1ee"
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let dict = Value::dict().with("name", "a").with("name", "b");
        match encode(&dict) {
            Err(EncodingError::DuplicateKey(key)) => assert_eq!(key, "name"),
            other => panic!("expected duplicate key error, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_duplicate_key_writes_nothing() {
        let inner = Value::dict().with("x", 1i64).with("x", 2i64);
        let outer = Value::List(vec![Value::Integer(1), inner]);

        let mut sink = Vec::new();
        assert!(encode_to(&outer, &mut sink).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_with_opt() {
        let dict = Value::dict()
            .with_opt("comment", None::<&str>)
            .with_opt("created by", Some("me"));
        assert!(!dict.contains_key(b"comment"));
        assert_eq!(dict.get(b"created by").and_then(Value::as_str), Some("me"));
    }

    #[test]
    fn test_deterministic() {
        let value = Value::dict()
            .with("z", Value::List(vec![Value::from(vec![0u8, 1, 2])]))
            .with("a", Value::dict().with("k", -1i64));
        assert_eq!(encode(&value).unwrap(), encode(&value.clone()).unwrap());
    }

    #[test]
    fn test_value_accessors() {
        let value = Value::Integer(42);
        assert_eq!(value.as_integer(), Some(42));
        assert!(value.as_bytes().is_none());

        let value = Value::string("test");
        assert_eq!(value.as_str(), Some("test"));
        assert!(value.as_integer().is_none());

        let value = Value::List(vec![]);
        assert!(value.as_list().is_some());
        assert!(value.as_dict().is_none());
        assert!(value.get(b"anything").is_none());
    }
}
