use crate::constants::HASH_CHUNK_SIZE;
use crate::contracts::TransformedRecord;
use crate::error::Result;
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// SHA-256 of a file's raw bytes, streamed in fixed-size chunks.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// The hashed projection of a transformed record: everything except the
/// wall-clock `processed_at`. Fields are declared in key order.
#[derive(Serialize)]
struct HashedRecord<'a> {
    category: &'a str,
    id: i64,
    normalized_value: f64,
    original_value: f64,
    timestamp: &'a str,
}

impl<'a> From<&'a TransformedRecord> for HashedRecord<'a> {
    fn from(r: &'a TransformedRecord) -> Self {
        Self {
            category: &r.category,
            id: r.id,
            normalized_value: r.normalized_value,
            original_value: r.original_value,
            timestamp: &r.timestamp,
        }
    }
}

/// Content hash of a record list, reproducible across runs.
pub fn data_hash(records: &[TransformedRecord]) -> Result<String> {
    let view: Vec<HashedRecord<'_>> = records.iter().map(HashedRecord::from).collect();
    Ok(sha256_hex(&canonical_json(&view)?))
}

/// Serializes with `", "` / `": "` separators and every character outside
/// printable ASCII escaped as `\uXXXX`.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut ser)?;
    Ok(out)
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
