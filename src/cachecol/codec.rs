//! Cache-column envelope codec
//!
//! A cache column stores a denormalized snapshot of virtual values in a
//! real text column. The encoding is a versioned envelope, base64
//! armored for text storage:
//!
//! ```text
//! +------------------+
//! | Magic            | (4 bytes: "EAVC")
//! +------------------+
//! | Version          | (u8, currently 1)
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Payload          | (JSON object: name -> typed value)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over magic..payload)
//! +------------------+
//! ```
//!
//! "Empty" is an explicit format state: a NULL/absent cell decodes to
//! the empty snapshot, and an empty snapshot encodes to a well-formed
//! envelope with an empty object payload. Malformed cells are detected
//! by magic, version, length or checksum, never by comparing against a
//! serialized sentinel.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

use super::errors::{CodecError, CodecResult};

const MAGIC: &[u8; 4] = b"EAVC";
const VERSION: u8 = 1;
/// magic + version + length prefix + checksum
const OVERHEAD: usize = 4 + 1 + 4 + 4;

/// Computes a CRC32 checksum over the provided data
fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// A denormalized snapshot: virtual column name -> typed value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CachedColumn {
    entries: BTreeMap<String, Value>,
}

impl CachedColumn {
    /// The empty snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from name/value pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Inserts one entry
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Returns one entry
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the snapshot to a JSON object for attaching to records
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone().into_iter().collect())
    }
}

/// Encodes a snapshot into its armored envelope
pub fn encode(cache: &CachedColumn) -> String {
    let payload = serde_json::to_vec(&cache.to_value()).unwrap_or_else(|_| b"{}".to_vec());

    let mut buf = Vec::with_capacity(OVERHEAD + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);

    let checksum = compute_checksum(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());

    BASE64.encode(buf)
}

/// Decodes a cache cell.
///
/// A NULL cell is the explicit uninitialized state and decodes to the
/// empty snapshot. Anything malformed is an error; callers substitute
/// the empty snapshot instead of propagating.
pub fn decode(cell: &Value) -> CodecResult<CachedColumn> {
    let armored = match cell {
        Value::Null => return Ok(CachedColumn::empty()),
        Value::String(s) => s,
        _ => return Err(CodecError::NotAString),
    };

    let data = BASE64
        .decode(armored)
        .map_err(|e| CodecError::BadArmor(e.to_string()))?;

    if data.len() < OVERHEAD {
        return Err(CodecError::Truncated(data.len()));
    }
    if &data[0..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    if data[4] != VERSION {
        return Err(CodecError::UnsupportedVersion(data[4]));
    }

    let declared = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;
    let actual = data.len() - OVERHEAD;
    if declared != actual {
        return Err(CodecError::LengthMismatch { declared, actual });
    }

    let body_end = data.len() - 4;
    let stored = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    let computed = compute_checksum(&data[0..body_end]);
    if computed != stored {
        return Err(CodecError::ChecksumMismatch { computed, stored });
    }

    let payload: Value = serde_json::from_slice(&data[9..body_end])
        .map_err(|e| CodecError::BadPayload(e.to_string()))?;
    match payload {
        Value::Object(map) => Ok(CachedColumn::from_entries(map)),
        other => Err(CodecError::BadPayload(format!(
            "expected object, got {}",
            crate::marshal::render_value(&other)
        ))),
    }
}

/// Decodes a cache cell, substituting the empty snapshot on any failure
pub fn decode_or_empty(cell: &Value) -> CachedColumn {
    decode(cell).unwrap_or_else(|_| CachedColumn::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CachedColumn {
        CachedColumn::from_entries([
            ("email-virtual".to_string(), json!("a@b.com")),
            ("user-age".to_string(), json!(34)),
        ])
    }

    #[test]
    fn test_round_trip() {
        let encoded = encode(&sample());
        let decoded = decode(&json!(encoded)).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_empty_round_trip() {
        let encoded = encode(&CachedColumn::empty());
        let decoded = decode(&json!(encoded)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_null_cell_is_the_empty_state() {
        assert_eq!(decode(&Value::Null).unwrap(), CachedColumn::empty());
    }

    #[test]
    fn test_corruption_is_detected() {
        let encoded = encode(&sample());
        let mut raw = BASE64.decode(&encoded).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0xFF;
        let corrupted = Value::String(BASE64.encode(raw));

        let err = decode(&corrupted).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ChecksumMismatch { .. } | CodecError::BadMagic | CodecError::UnsupportedVersion(_)
        ));
    }

    #[test]
    fn test_bad_armor_rejected() {
        assert!(matches!(
            decode(&json!("not base64!!!")),
            Err(CodecError::BadArmor(_))
        ));
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let cell = Value::String(BASE64.encode(b"XXXX\x01\x00\x00\x00\x00\x00\x00\x00\x00"));
        assert_eq!(decode(&cell), Err(CodecError::BadMagic));
    }

    #[test]
    fn test_future_version_rejected() {
        let encoded = encode(&sample());
        let mut raw = BASE64.decode(&encoded).unwrap();
        raw[4] = 9;
        // Fix the checksum so only the version is at fault
        let body_end = raw.len() - 4;
        let checksum = compute_checksum(&raw[0..body_end]);
        raw[body_end..].copy_from_slice(&checksum.to_le_bytes());

        let cell = Value::String(BASE64.encode(raw));
        assert_eq!(decode(&cell), Err(CodecError::UnsupportedVersion(9)));
    }

    #[test]
    fn test_non_string_cell_rejected() {
        assert_eq!(decode(&json!(42)), Err(CodecError::NotAString));
    }

    #[test]
    fn test_decode_or_empty_absorbs_failures() {
        assert!(decode_or_empty(&json!("garbage")).is_empty());
        assert_eq!(decode_or_empty(&json!(encode(&sample()))), sample());
    }

    #[test]
    fn test_deterministic_encoding() {
        assert_eq!(encode(&sample()), encode(&sample()));
    }
}
