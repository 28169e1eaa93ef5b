use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Upper bound on one encoded event. A larger length prefix is corruption.
const MAX_FRAME_LEN: usize = 1 << 20;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Append-only reservation log.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Truncated last entry (crash) is safely discarded via length-prefix + CRC check.
/// - Corruption anywhere before the last entry makes replay fail instead.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    valid_len: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path`.
    ///
    /// `valid_len` is the byte length covered by intact entries (as returned by
    /// [`Wal::replay`], which only ever leaves a torn last entry past it). That
    /// tail gets truncated so new entries are never appended after garbage.
    pub fn open(path: &Path, valid_len: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        if file.metadata()?.len() > valid_len {
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            valid_len,
        })
    }

    /// Append a single event and fsync. Used by tests only; the store
    /// uses `append_buffered` + `flush_sync` for group commit.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Append a single event to the BufWriter without flushing or syncing.
    /// Call `flush_sync()` after the batch to durably commit all buffered events.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)
    }

    /// Flush the BufWriter and fsync the underlying file.
    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.valid_len = self.writer.get_ref().metadata()?.len();
        Ok(())
    }

    /// Drop everything written since the last successful `flush_sync`.
    /// Called after a failed batch so its partial bytes never reach replay.
    pub fn rollback(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        file.set_len(self.valid_len)?;
        file.sync_all()?;
        // The old writer may still hold unflushed bytes; replace it without flushing.
        let old = std::mem::replace(&mut self.writer, BufWriter::new(file));
        let _ = old.into_parts();
        Ok(())
    }

    /// Return the WAL file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the WAL from disk, returning all valid events and the byte
    /// length they cover.
    ///
    /// Only a torn tail is skipped: the file ending inside the last frame, a bad
    /// last frame, or a zero-filled remainder. A bad frame followed by anything
    /// else would hide committed records, so replay fails with `InvalidData`.
    pub fn replay(path: &Path) -> io::Result<(Vec<Event>, u64)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file.take(file_len));
        let mut events = Vec::new();
        let mut valid_len = 0u64;

        loop {
            // Read length prefix
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                return Err(corrupt(path, valid_len, "frame length out of range"));
            }

            // Read payload
            let mut payload = vec![0u8; len];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }

            // Read CRC
            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }
            let stored_crc = u32::from_le_bytes(crc_buf);
            let frame_end = valid_len + 8 + len as u64;

            let defect = if stored_crc != crc32fast::hash(&payload) {
                Some("crc mismatch")
            } else {
                match bincode::deserialize::<Event>(&payload) {
                    Ok(event) => {
                        events.push(event);
                        None
                    }
                    Err(_) => Some("undecodable entry"),
                }
            };
            if let Some(what) = defect {
                // A crash can leave the last frame torn or the tail zero-filled.
                let zero_filled = len == 0 && stored_crc == 0 && rest_is_zeroed(&mut reader)?;
                if frame_end == file_len || zero_filled {
                    break;
                }
                return Err(corrupt(path, valid_len, what));
            }
            valid_len = frame_end;
        }

        Ok((events, valid_len))
    }
}

fn rest_is_zeroed(reader: &mut impl Read) -> io::Result<bool> {
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    Ok(rest.iter().all(|b| *b == 0))
}

fn corrupt(path: &Path, offset: u64, what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: {what} at offset {offset}", path.display()),
    )
}
