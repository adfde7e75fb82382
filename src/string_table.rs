//! String table payload: `u16 count`, then `count` records of
//! `u16 key length | key | u16 value length | value`, UTF-8, insertion order.

use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::util::PayloadReader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: IndexMap<String, String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SchemaError> {
        let count =
            u16::try_from(self.entries.len()).map_err(|_| SchemaError::TooLong("string table"))?;
        let mut bytes = count.to_be_bytes().to_vec();
        for (key, value) in &self.entries {
            put_str(&mut bytes, key)?;
            put_str(&mut bytes, value)?;
        }
        Ok(bytes)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SchemaError> {
        let mut r = PayloadReader::new("string table", data);
        let count = r.u16()?;
        let mut table = StringTable::new();
        for _ in 0..count {
            let key = read_str(&mut r)?;
            let value = read_str(&mut r)?;
            table.entries.insert(key, value);
        }
        r.finish()?;
        Ok(table)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = StringTable::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

fn put_str(bytes: &mut Vec<u8>, s: &str) -> Result<(), SchemaError> {
    let len = u16::try_from(s.len()).map_err(|_| SchemaError::TooLong("string table entry"))?;
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(s.as_bytes());
    Ok(())
}

fn read_str(r: &mut PayloadReader<'_>) -> Result<String, SchemaError> {
    let len = r.u16()? as usize;
    let raw = r.take(len)?;
    String::from_utf8(raw.to_vec()).map_err(|_| SchemaError::InvalidUtf8)
}
