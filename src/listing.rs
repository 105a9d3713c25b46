//! The decode loop and the line printer.

use std::fmt;
use std::io;

use thiserror::Error;
use tracing::debug;

use crate::config::ListingConfig;
use crate::decoder::{DecodeError, Decoded, Decoder};
use crate::disasm::{fmt_decoded, hex_bytes};

/// One printed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub offset: usize,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl Line {
    pub fn from_decoded(d: &Decoded) -> Self {
        Self {
            offset: d.offset,
            bytes: d.raw().to_vec(),
            text: fmt_decoded(d),
        }
    }

    pub fn render(&self, cfg: &ListingConfig) -> String {
        if cfg.show_bytes {
            format!(
                "{:04x}: {:<width$} {}",
                self.offset,
                hex_bytes(&self.bytes),
                self.text,
                width = cfg.hex_width
            )
        } else {
            format!("{:04x}: {}", self.offset, self.text)
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&ListingConfig::default()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Scanning { offset: usize },
    /// Stopped on the first malformed instruction.
    Halted { error: DecodeError },
    /// Fewer than two bytes were left.
    Finished { offset: usize },
}

/// Walks a text segment instruction by instruction.
///
/// Yields one `Ok(Line)` per instruction; the first decode failure is
/// yielded as `Err` and ends the iteration. There is no resynchronisation.
pub struct Listing<'a, D: Decoder> {
    decoder: &'a D,
    text: &'a [u8],
    state: ScanState,
}

impl<'a, D: Decoder> Listing<'a, D> {
    pub fn new(decoder: &'a D, text: &'a [u8]) -> Self {
        Self {
            decoder,
            text,
            state: ScanState::Scanning { offset: 0 },
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }
}

impl<'a, D: Decoder> Iterator for Listing<'a, D> {
    type Item = Result<Line, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let ScanState::Scanning { offset } = self.state else {
            return None;
        };
        if offset + 1 >= self.text.len() {
            debug!(offset, len = self.text.len(), "end of text");
            self.state = ScanState::Finished { offset };
            return None;
        }
        match self.decoder.decode(self.text, offset) {
            Ok(d) => {
                self.state = ScanState::Scanning {
                    offset: offset + d.length,
                };
                Some(Ok(Line::from_decoded(&d)))
            }
            Err(error) => {
                debug!(offset, %error, "decode halted");
                self.state = ScanState::Halted {
                    error: error.clone(),
                };
                Some(Err(error))
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("writing listing: {0}")]
    Io(#[from] io::Error),
}

/// Prints every instruction of `text` to `out`, one per line.
/// Lines before a decode failure are written before the error is returned.
pub fn write_listing<D: Decoder, W: io::Write>(
    decoder: &D,
    text: &[u8],
    cfg: &ListingConfig,
    out: &mut W,
) -> Result<usize, ListingError> {
    let mut count = 0;
    for line in Listing::new(decoder, text) {
        writeln!(out, "{}", line?.render(cfg))?;
        count += 1;
    }
    debug!(count, "listing written");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::i8086::I8086Decoder;

    #[test]
    fn line_layout() {
        let line = Line {
            offset: 0x1f,
            bytes: vec![0xB8, 0x05, 0x00],
            text: "mov ax, 0005".into(),
        };
        assert_eq!(line.to_string(), "001f: b80500         mov ax, 0005");
        let bare = ListingConfig {
            show_bytes: false,
            ..ListingConfig::default()
        };
        assert_eq!(line.render(&bare), "001f: mov ax, 0005");
    }

    #[test]
    fn state_moves_to_finished() {
        let dec = I8086Decoder::new();
        let text = [0x90, 0x90, 0x90];
        let mut listing = Listing::new(&dec, &text);
        assert!(listing.next().is_some());
        assert!(listing.next().is_some());
        assert!(listing.next().is_none());
        assert_eq!(listing.state(), &ScanState::Finished { offset: 2 });
    }
}
