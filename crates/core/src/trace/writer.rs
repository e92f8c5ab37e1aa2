//! Trace file writer and reader.
//!
//! A trace file is the 8-byte signature `"RVTRACE\0"`, an i64 header
//! size, then cycle records chained by their `next`/`prev` offsets. The
//! writer holds one pending record so it can patch the final record's
//! `next` to 0 before it reaches the file; the reader walks the chain
//! until it consumes that record.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use super::reader::CycleReader;
use super::TraceError;

/// File signature bytes.
pub const SIGNATURE: [u8; 8] = *b"RVTRACE\0";

/// File header size recorded after the signature.
pub const FILE_HEADER_SIZE: i64 = 16;

/// Sequential trace file writer.
#[derive(Debug)]
pub struct TraceFileWriter {
    file: BufWriter<File>,
    pending: Option<Vec<u8>>,
}

impl TraceFileWriter {
    /// Creates the file and writes the file header.
    pub fn create(path: &Path) -> Result<Self, TraceError> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&SIGNATURE)?;
        file.write_all(&FILE_HEADER_SIZE.to_le_bytes())?;
        Ok(Self {
            file,
            pending: None,
        })
    }

    /// Appends one cycle record. The record's `next`/`prev` offsets are
    /// patched here; callers build records with both set to 0.
    pub fn write_cycle(&mut self, mut record: Vec<u8>) -> Result<(), TraceError> {
        if let Some(mut previous) = self.pending.take() {
            let next = previous.len() as i64;
            previous[0..8].copy_from_slice(&next.to_le_bytes());
            record[8..16].copy_from_slice(&(-next).to_le_bytes());
            self.file.write_all(&previous)?;
        }
        self.pending = Some(record);
        Ok(())
    }

    /// Flushes the final record (with `next = 0`) and the underlying file.
    pub fn finish(&mut self) -> Result<(), TraceError> {
        if let Some(last) = self.pending.take() {
            self.file.write_all(&last)?;
        }
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for TraceFileWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// Trace file reader: loads the file and walks the record chain.
#[derive(Debug)]
pub struct TraceFileReader {
    data: Vec<u8>,
    offset: usize,
    finished: bool,
}

impl TraceFileReader {
    /// Opens a trace file and validates its header.
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;

        if data.len() < 16 || data[0..8] != SIGNATURE {
            return Err(TraceError::BadSignature);
        }
        let header_size = i64::from_le_bytes(
            data[8..16]
                .try_into()
                .map_err(|_| TraceError::Truncated)?,
        );
        if header_size < 16 || header_size as usize > data.len() {
            return Err(TraceError::Truncated);
        }

        let offset = header_size as usize;
        let finished = offset >= data.len();
        Ok(Self {
            data,
            offset,
            finished,
        })
    }

    /// Whether every record has been consumed.
    pub fn is_end(&self) -> bool {
        self.finished
    }

    /// Parses the current record.
    pub fn cycle(&self) -> Result<CycleReader<'_>, TraceError> {
        if self.finished {
            return Err(TraceError::Truncated);
        }
        CycleReader::parse(&self.data[self.offset..])
    }

    /// Advances to the next record; returns `false` once the chain ends.
    pub fn advance(&mut self) -> Result<bool, TraceError> {
        if self.finished {
            return Ok(false);
        }
        let next = self.cycle()?.next_offset();
        if next <= 0 {
            self.finished = true;
            return Ok(false);
        }
        self.offset += next as usize;
        if self.offset >= self.data.len() {
            self.finished = true;
            return Ok(false);
        }
        Ok(true)
    }
}
