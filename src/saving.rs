use bincode::{deserialize_from, serialize_into};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::InventoryError;
use crate::session::InventorySession;

/// Size of the plain expiry header in front of the gzip stream.
const EXPIRY_HEADER_LEN: usize = 8;

/// Write a session as gzip-compressed bincode.
///
/// The stream starts with the expiry as big-endian unix milliseconds, so
/// [`read_expiry`] can tell whether a session is stale without decoding it.
pub fn write_session<W: Write>(
    session: &InventorySession,
    mut writer: W,
) -> Result<(), InventoryError> {
    writer.write_all(&session.expires_at.timestamp_millis().to_be_bytes())?;

    let encoder = GzEncoder::new(writer, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, session)?;

    let encoder = writer
        .into_inner()
        .map_err(|e| InventoryError::Io(e.into_error()))?;
    encoder.finish()?;
    Ok(())
}

/// Read only the expiry header written by [`write_session`].
pub fn read_expiry<R: Read>(mut reader: R) -> Result<DateTime<Utc>, InventoryError> {
    let mut header = [0u8; EXPIRY_HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(|e| InventoryError::CorruptSession(format!("missing expiry header: {}", e)))?;

    let millis = i64::from_be_bytes(header);
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| InventoryError::CorruptSession(format!("bad expiry {}", millis)))
}

/// Read a session written by [`write_session`] and check its invariants.
pub fn read_session<R: Read>(mut reader: R) -> Result<InventorySession, InventoryError> {
    let expires_at = read_expiry(&mut reader)?;

    let decoder = GzDecoder::new(reader);
    let mut reader = BufReader::new(decoder);

    let session: InventorySession = deserialize_from(&mut reader)
        .map_err(|e| InventoryError::CorruptSession(e.to_string()))?;
    if session.expires_at.timestamp_millis() != expires_at.timestamp_millis() {
        return Err(InventoryError::CorruptSession(
            "expiry header does not match session".to_string(),
        ));
    }
    session.validate()?;

    Ok(session)
}

/// Write `session` to `path`, replacing any previous file in one step.
///
/// The data goes to a temporary file in the same directory first and is then
/// renamed over `path`, so a concurrent [`load_session`] sees either the old
/// or the new session, never a partial one.
pub fn save_session(session: &InventorySession, path: &Path) -> Result<(), InventoryError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    write_session(session, file.as_file_mut())?;
    file.persist(path).map_err(|e| InventoryError::Io(e.error))?;
    Ok(())
}

pub fn load_session(path: &Path) -> Result<InventorySession, InventoryError> {
    let file = File::open(path)?;
    read_session(file)
}

/// Expiry of the session stored at `path`, reading only its header.
pub fn load_expiry(path: &Path) -> Result<DateTime<Utc>, InventoryError> {
    let file = File::open(path)?;
    read_expiry(file)
}
