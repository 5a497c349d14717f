//! Decoding of the kernel's packed event record stream
//!
//! One read returns zero or more records laid out back to back:
//!
//! ```text
//! | wd: i32 | mask: u32 | cookie: u32 | len: u32 | name: [u8; len] |
//! ```
//!
//! `name` is NUL-terminated and padded with further NULs up to `len`.

use dirwatch_core::config::EVENT_HEADER_SIZE;
use dirwatch_core::error::{Error, Result};
use dirwatch_core::{EventMask, WatchHandle};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// One undecorated record as delivered by the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Watch the record belongs to
    pub handle: WatchHandle,
    /// Kind bits plus kernel-only flags
    pub mask: EventMask,
    /// Correlation token shared by the two halves of a rename (0 = none)
    pub cookie: u32,
    /// Entry name relative to the watch, absent for events on the watch itself
    pub name: Option<OsString>,
}

/// Iterator over the records of one read
///
/// Yields at most one error, after which it is exhausted. It never looks at
/// bytes past the end of the slice it was given.
#[derive(Debug)]
pub struct EventDecoder<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> EventDecoder<'a> {
    /// Decode `buf`, which must contain exactly the bytes returned by one read
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            failed: false,
        }
    }

    /// Decode everything, stopping at the first malformed record
    ///
    /// Records before the malformed one are still returned.
    pub fn decode_all(buf: &'a [u8]) -> DecodedBatch {
        let mut records = Vec::new();
        let mut error = None;
        for result in Self::new(buf) {
            match result {
                Ok(record) => records.push(record),
                Err(e) => error = Some(e),
            }
        }
        DecodedBatch { records, error }
    }
}

impl Iterator for EventDecoder<'_> {
    type Item = Result<RawEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }

        match decode_record(self.buf, self.offset) {
            Ok((record, size)) => {
                self.offset += size;
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Records decoded from one read plus the decode failure, if any
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub records: Vec<RawEvent>,
    pub error: Option<Error>,
}

fn decode_record(buf: &[u8], offset: usize) -> Result<(RawEvent, usize)> {
    let available = buf.len() - offset;
    let header = buf
        .get(offset..offset + EVENT_HEADER_SIZE)
        .ok_or(Error::MalformedStream {
            offset,
            declared: EVENT_HEADER_SIZE,
            available,
        })?;

    let handle = WatchHandle::from_raw(i32::from_ne_bytes(word(header, 0)));
    let mask = EventMask::from_bits_retain(u32::from_ne_bytes(word(header, 1)));
    let cookie = u32::from_ne_bytes(word(header, 2));
    let name_len = u32::from_ne_bytes(word(header, 3)) as usize;

    let declared = EVENT_HEADER_SIZE.saturating_add(name_len);
    if declared > available {
        return Err(Error::MalformedStream {
            offset,
            declared,
            available,
        });
    }

    let name = if name_len == 0 {
        None
    } else {
        let raw = &buf[offset + EVENT_HEADER_SIZE..offset + declared];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let name = &raw[..end];
        (!name.is_empty()).then(|| OsStr::from_bytes(name).to_os_string())
    };

    Ok((
        RawEvent {
            handle,
            mask,
            cookie,
            name,
        },
        declared,
    ))
}

fn word(header: &[u8], index: usize) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&header[index * 4..index * 4 + 4]);
    bytes
}
