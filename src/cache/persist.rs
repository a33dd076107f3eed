//! Record Persister Module
//!
//! Serializes and deserializes single cache records to and from a byte
//! stream. One record is encoded as the key terminated by a newline,
//! followed by two length-prefixed fields: the creation timestamp as a
//! decimal millisecond tick string, then the payload.
//!
//! The stream carries no header, version tag, or checksum, so decode
//! failures are the only signal of format drift or disk corruption. The
//! store compensates by counting corrupt records rather than crashing.

use std::io::{BufRead, ErrorKind, Write};

use chrono::{DateTime, Utc};

use crate::cache::record::ResponseRecord;
use crate::error::{CacheError, Result};

/// Upper bound on a single length-prefixed field.
///
/// A corrupted length prefix must not turn into a multi-gigabyte
/// allocation; anything above this reads as a corrupt record.
const MAX_FIELD_LEN: u32 = 256 * 1024 * 1024;

// == Record Persister Trait ==
/// Serializes one record type to and from a byte stream.
///
/// Pluggable per record type; [`ResponsePersister`] is the implementation
/// for response records. `read` reports a truncated or malformed record as
/// [`CacheError::CorruptRecord`], a recoverable condition the store
/// handles without aborting the whole cache.
pub trait RecordPersister {
    /// The record type this persister understands.
    type Record;

    /// Serializes one record to the stream.
    fn write<W: Write>(&self, writer: &mut W, record: &Self::Record) -> Result<()>;

    /// Deserializes one record from the stream.
    ///
    /// Returns `Ok(None)` at a clean end-of-stream (no bytes before the
    /// next record would start) and `Err(CacheError::CorruptRecord)` when
    /// the stream ends or misparses mid-record.
    fn read<R: BufRead>(&self, reader: &mut R) -> Result<Option<Self::Record>>;
}

// == Response Persister ==
/// Persister for [`ResponseRecord`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePersister;

impl RecordPersister for ResponsePersister {
    type Record = ResponseRecord;

    fn write<W: Write>(&self, writer: &mut W, record: &ResponseRecord) -> Result<()> {
        writer.write_all(record.key.as_bytes())?;
        writer.write_all(b"\n")?;

        let ticks = record.created_at.timestamp_millis().to_string();
        write_field(writer, ticks.as_bytes())?;
        write_field(writer, record.payload.as_bytes())?;
        Ok(())
    }

    fn read<R: BufRead>(&self, reader: &mut R) -> Result<Option<ResponseRecord>> {
        let key = match read_key(reader)? {
            Some(key) => key,
            None => return Ok(None),
        };

        let ticks_bytes = read_field(reader)?;
        let ticks = std::str::from_utf8(&ticks_bytes)
            .map_err(|_| corrupt("timestamp field is not UTF-8"))?
            .parse::<i64>()
            .map_err(|_| corrupt("timestamp field is not an integer tick count"))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(ticks)
            .ok_or_else(|| corrupt("timestamp tick count out of range"))?;

        let payload_bytes = read_field(reader)?;
        let payload = String::from_utf8(payload_bytes)
            .map_err(|_| corrupt("payload field is not UTF-8"))?;

        Ok(Some(ResponseRecord::with_created_at(key, payload, created_at)))
    }
}

/// Writes one length-prefixed field: u32 little-endian byte count, then the bytes.
fn write_field<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Reads the newline-terminated key.
///
/// Returns `Ok(None)` when the stream is already exhausted; a key with no
/// terminating newline before EOF is a truncated record.
fn read_key<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader.read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        return Err(corrupt("record key not terminated before end of stream"));
    }
    buf.pop();
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| corrupt("record key is not UTF-8"))
}

/// Reads one length-prefixed field, treating any short read as corruption.
fn read_field<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    read_exact(reader, &mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes);
    if len > MAX_FIELD_LEN {
        return Err(corrupt("field length prefix exceeds maximum"));
    }

    let mut bytes = vec![0u8; len as usize];
    read_exact(reader, &mut bytes)?;
    Ok(bytes)
}

/// `read_exact` with end-of-stream mapped to a corrupt-record error.
fn read_exact<R: BufRead>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            corrupt("record truncated mid-field")
        } else {
            CacheError::Io(e)
        }
    })
}

fn corrupt(detail: &str) -> CacheError {
    CacheError::CorruptRecord(detail.to_string())
}
