//! MINIX-style a.out header.
//!
//! ```text
//! 0   magic (01 03)   2 flags   3 cpu   4 hdrlen
//! 8   text   12 data   16 bss   20 entry   24 total   28 syms   (hdrlen >= 32)
//! ```

use std::fmt;
use std::ops::Range;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAGIC: u16 = 0x0103;

/// Smallest header length that carries the segment sizes.
pub const LONG_HEADER: usize = 32;

/// Bytes needed to reach the header length field.
const PREAMBLE: usize = 5;

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFlags: u8 {
const UZP = 0x01; // unmapped zero page
const PAL = 0x02; // page aligned
const NSYM = 0x04; // new style symbol table
const EXEC = 0x10; // executable
const SEP = 0x20; // separate I & D
const PURE = 0x40; // pure text
const TOVLY = 0x80; // text overlay
}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSizes {
    pub text: u32,
    pub data: u32,
    pub bss: u32,
    pub entry: u32,
    pub total: u32,
    pub syms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecHeader {
    pub magic: u16,
    pub flags: u8,
    pub cpu: u8,
    pub hdrlen: u8,
    /// Present only for long headers.
    pub sizes: Option<SegmentSizes>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("file too short for an a.out header ({len} bytes)")]
    TooShort { len: usize },
    #[error("bad magic number {found:#06x}")]
    BadMagic { found: u16 },
    #[error("header claims {hdrlen} bytes but the file has {len}")]
    HeaderTruncated { hdrlen: usize, len: usize },
    #[error("text segment {start:#x}..{end:#x} runs past the end of the file ({len} bytes)")]
    TextTruncated { start: usize, end: usize, len: usize },
}

impl ExecHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < PREAMBLE {
            return Err(HeaderError::TooShort { len: bytes.len() });
        }
        let magic = u16::from_be_bytes([bytes[0], bytes[1]]);
        if magic != MAGIC {
            return Err(HeaderError::BadMagic { found: magic });
        }
        let hdrlen = bytes[4];
        let header = bytes
            .get(..usize::from(hdrlen).max(PREAMBLE))
            .ok_or(HeaderError::HeaderTruncated {
                hdrlen: usize::from(hdrlen),
                len: bytes.len(),
            })?;

        let sizes = (header.len() >= LONG_HEADER).then(|| {
            let word = |at: usize| {
                u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
            };
            SegmentSizes {
                text: word(8),
                data: word(12),
                bss: word(16),
                entry: word(20),
                total: word(24),
                syms: word(28),
            }
        });

        Ok(Self {
            magic,
            flags: bytes[2],
            cpu: bytes[3],
            hdrlen,
            sizes,
        })
    }

    pub fn flag_set(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags)
    }

    /// Byte range of the text segment. Without segment sizes the text runs to
    /// the end of the file.
    pub fn text_range(&self, file_len: usize) -> Result<Range<usize>, HeaderError> {
        let start = usize::from(self.hdrlen);
        let end = match self.sizes {
            Some(sizes) => start + sizes.text as usize,
            None => file_len.max(start),
        };
        if end > file_len {
            return Err(HeaderError::TextTruncated {
                start,
                end,
                len: file_len,
            });
        }
        Ok(start..end)
    }
}

impl fmt::Display for ExecHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "magic: {:04x}\tflags: {:02x}", self.magic, self.flags)?;
        let names: Vec<&str> = self.flag_set().iter_names().map(|(name, _)| name).collect();
        if !names.is_empty() {
            write!(f, " ({})", names.join("|"))?;
        }
        write!(f, "\tcpu: {:02x}\thdrlen: {}B", self.cpu, self.hdrlen)?;
        if let Some(s) = &self.sizes {
            write!(
                f,
                "\ntextlen: {}B\tdatalen: {}B\tbsslen: {}B\tentrylen: {}B\ttotallen: {}B\tsymslen: {}B",
                s.text, s.data, s.bss, s.entry, s.total, s.syms
            )?;
        }
        Ok(())
    }
}
