use bitvec::prelude::*;
use tracing::trace;

use crate::decoder::{DecodeError, Decoded, Decoder};
use crate::instructions::{catalog, Catalog};
use crate::pattern::{Composite, Part, RegSlot, Template};

/// The mod/reg/r-m byte split into its three sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
}

impl From<u8> for ModRm {
    fn from(byte: u8) -> Self {
        Self {
            mode: byte >> 6,
            reg: (byte >> 3) & 0b111,
            rm: byte & 0b111,
        }
    }
}

impl ModRm {
    /// mod=00 with r/m=110 addresses memory through a 16-bit absolute word.
    pub fn is_direct(self) -> bool {
        self.mode == 0b00 && self.rm == 0b110
    }

    pub fn is_register(self) -> bool {
        self.mode == 0b11
    }

    /// Bytes taken by this byte plus its displacement.
    pub fn encoded_len(self) -> usize {
        match self.mode {
            0b00 if self.is_direct() => 3,
            0b00 => 1,
            0b01 => 2,
            0b10 => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Every literal bit agreed; `addressing` is set when a mod/reg/r-m byte follows.
    Matched { addressing: bool },
    /// A literal bit or a fixed reg extension disagreed.
    Mismatch,
    /// The stream ended before the pattern could be checked.
    Exhausted,
}

/// Checks the literal bits and the addressing byte of `template` against
/// the bytes at `offset`. Never reads past the end of `text`.
pub fn match_template(text: &[u8], offset: usize, template: &Template) -> MatchOutcome {
    let mut pos = offset;
    for part in template.parts() {
        match part {
            Part::Fixed(pattern) => {
                let Some(byte) = text.get(pos) else {
                    return MatchOutcome::Exhausted;
                };
                let bits = byte.view_bits::<Msb0>();
                if !pattern
                    .iter()
                    .zip(bits.iter().by_vals())
                    .all(|(m, bit)| m.accepts(bit))
                {
                    return MatchOutcome::Mismatch;
                }
                pos += 1;
            }
            Part::Composite(Composite::AddressingByte(slot)) => {
                let Some(&byte) = text.get(pos) else {
                    return MatchOutcome::Exhausted;
                };
                let reg = ModRm::from(byte).reg;
                match slot {
                    RegSlot::Fixed(want) if reg != *want => return MatchOutcome::Mismatch,
                    // Only es, cs, ss and ds exist.
                    RegSlot::Segment if reg > 0b011 => return MatchOutcome::Mismatch,
                    _ => {}
                }
                return MatchOutcome::Matched { addressing: true };
            }
            // Data parts carry no bits to check.
            Part::Composite(_) => break,
        }
    }
    MatchOutcome::Matched { addressing: false }
}

impl<'a> Decoded<'a> {
    /// Value of a literal field: the prefix bits equal to `letter`, right
    /// justified. Missing fields read as 0.
    pub fn field(&self, letter: char) -> u32 {
        let mask = self.template.field_mask(letter);
        let divisor = mask & mask.wrapping_neg();
        if mask == 0 || divisor == 0 {
            return 0;
        }
        (self.flat_word() & mask) / divisor
    }

    /// The literal prefix read big-endian.
    fn flat_word(&self) -> u32 {
        self.stream
            .iter()
            .take(self.template.flat_len())
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    }

    pub fn modrm(&self) -> Option<ModRm> {
        self.composite_bytes('R')
            .and_then(|bytes| bytes.first())
            .map(|&b| ModRm::from(b))
    }

    /// Whether immediate data is a full word (`w`=1, or `W`=01).
    pub fn is_word_data(&self) -> bool {
        if self.template.has_flat_field('w') {
            self.field('w') == 1
        } else if self.template.has_flat_field('W') {
            self.field('W') == 0b01
        } else {
            false
        }
    }

    /// Width of the register operand; defaults to word when no flag says otherwise.
    pub fn is_word_register(&self) -> bool {
        if self.template.has_flat_field('w') {
            self.field('w') == 1
        } else if self.template.has_flat_field('W') {
            self.field('W') & 1 == 1
        } else {
            true
        }
    }

    /// Register number from the addressing byte's reg field or the `r` bits.
    pub fn register(&self) -> u32 {
        match (self.template.addressing(), self.modrm()) {
            (Some(RegSlot::Register), Some(m)) => u32::from(m.reg),
            _ => self.field('r'),
        }
    }

    /// Segment register number from the addressing byte or the `s` bits.
    pub fn segment(&self) -> u32 {
        match (self.template.addressing(), self.modrm()) {
            (Some(RegSlot::Segment), Some(m)) => u32::from(m.reg),
            _ => self.field('s'),
        }
    }

    /// Fills in the per-part lengths and returns the total.
    pub fn resolve_length(&mut self) -> usize {
        let template = self.template;
        let mut pos = 0;
        for (index, part) in template.parts().iter().enumerate() {
            let len = match part {
                Part::Fixed(_) => 1,
                Part::Composite(Composite::AddressingByte(_)) => self
                    .stream
                    .get(pos)
                    .map_or(0, |&b| ModRm::from(b).encoded_len()),
                Part::Composite(Composite::Data { word }) => {
                    if *word || self.is_word_data() {
                        2
                    } else {
                        1
                    }
                }
                Part::Composite(Composite::Displacement { word }) => {
                    if *word {
                        2
                    } else {
                        1
                    }
                }
                Part::Composite(Composite::Port | Composite::Interrupt) => 1,
                Part::Composite(Composite::Address) => 2,
                Part::Composite(Composite::FarPointer) => 4,
            };
            if let Some(slot) = self.part_lens.get_mut(index) {
                *slot = len as u8;
            }
            pos += len;
        }
        self.length = pos;
        pos
    }
}

/// Table-driven 8086 decoder.
#[derive(Debug, Clone, Copy)]
pub struct I8086Decoder {
    catalog: &'static Catalog,
}

impl I8086Decoder {
    pub fn new() -> Self {
        Self { catalog: catalog() }
    }
}

impl Default for I8086Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for I8086Decoder {
    fn decode<'a>(&'a self, text: &'a [u8], offset: usize) -> Result<Decoded<'a>, DecodeError> {
        let template = self
            .catalog
            .iter()
            .find(|t| matches!(match_template(text, offset, t), MatchOutcome::Matched { .. }))
            .ok_or(DecodeError::Unmatched { offset })?;
        let stream = text.get(offset..).ok_or(DecodeError::Unmatched { offset })?;

        let mut decoded = Decoded::new(template, stream, offset);
        let length = decoded.resolve_length();
        if length == 0 {
            return Err(DecodeError::ZeroLength { offset });
        }
        if length > decoded.available() {
            return Err(DecodeError::Truncated {
                offset,
                needed: length,
                available: decoded.available(),
            });
        }
        trace!(offset, length, template = template.print, "decoded");
        Ok(decoded)
    }
}
