//! Instruction templates.
//!
//! A template pairs a print format (`"mov $R, $r"`) with a code pattern
//! (`"100010dw(Rr)"`). The code pattern is parsed once into [`Part`]s: literal
//! bytes made of per-bit matchers, followed by parenthesized composite parts
//! whose byte length is only known once the leading bits are decoded.

use thiserror::Error;

/// Longest encoding the CPU accepts, prefixes included.
pub const MAX_INSTRUCTION_LEN: usize = 15;

/// The field extractor reads the literal prefix into one `u32`.
const MAX_FLAT_BITS: usize = 32;

/// Placeholders the operand renderer knows how to fill.
const PRINT_FIELDS: &str = "rsRDpiaoPcw";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitMatch {
    Zero,
    One,
    /// Any bit; the letter names the field occupying this position.
    Field(char),
}

impl BitMatch {
    fn from_char(c: char) -> Self {
        match c {
            '0' => BitMatch::Zero,
            '1' => BitMatch::One,
            other => BitMatch::Field(other),
        }
    }

    #[inline]
    pub fn accepts(self, bit: bool) -> bool {
        match self {
            BitMatch::Zero => !bit,
            BitMatch::One => bit,
            BitMatch::Field(_) => true,
        }
    }
}

/// What the reg sub-field of an addressing byte carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegSlot {
    /// General register operand (`(Rr)`).
    Register,
    /// Segment register operand (`(Rs)`).
    Segment,
    /// Opcode extension that must equal the value (`(R101)`).
    Fixed(u8),
    /// Free bits, e.g. the ESC opcode (`(Rxxx)`).
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    /// mod/reg/r-m byte plus its 0, 1 or 2 displacement bytes.
    AddressingByte(RegSlot),
    /// Immediate data; `word` forces two bytes, otherwise `w`/`W` decide.
    Data { word: bool },
    /// IP-relative displacement of one byte, or two with `word`.
    Displacement { word: bool },
    Port,
    Interrupt,
    /// Absolute 16-bit memory address.
    Address,
    /// offset:segment pair.
    FarPointer,
}

impl Composite {
    /// Placeholder letter used in print templates.
    pub fn letter(self) -> char {
        match self {
            Composite::AddressingByte(_) => 'R',
            Composite::Data { .. } => 'D',
            Composite::Displacement { .. } => 'P',
            Composite::Port => 'p',
            Composite::Interrupt => 'i',
            Composite::Address => 'a',
            Composite::FarPointer => 'o',
        }
    }

    /// Upper bound of the bytes this part can consume.
    pub fn max_len(self) -> usize {
        match self {
            Composite::AddressingByte(_) => 3,
            Composite::Data { .. } => 2,
            Composite::Displacement { word } => {
                if word {
                    2
                } else {
                    1
                }
            }
            Composite::Port | Composite::Interrupt => 1,
            Composite::Address => 2,
            Composite::FarPointer => 4,
        }
    }

    fn parse(pattern: &str, body: &str) -> Result<Self, PatternError> {
        let unknown = || PatternError::UnknownComposite {
            pattern: pattern.to_string(),
            part: body.to_string(),
        };
        let mut chars = body.chars();
        let kind = chars.next().ok_or_else(unknown)?;
        let tail = chars.as_str();
        let part = match (kind, tail) {
            ('R', "r") => Composite::AddressingByte(RegSlot::Register),
            ('R', "s") => Composite::AddressingByte(RegSlot::Segment),
            ('R', "xxx") => Composite::AddressingByte(RegSlot::Ignored),
            ('R', bits) if bits.len() == 3 => {
                let reg = u8::from_str_radix(bits, 2).map_err(|_| unknown())?;
                Composite::AddressingByte(RegSlot::Fixed(reg))
            }
            ('D', "") => Composite::Data { word: false },
            ('D', "w") => Composite::Data { word: true },
            ('P', "") => Composite::Displacement { word: false },
            ('P', "w") => Composite::Displacement { word: true },
            ('p', "") => Composite::Port,
            ('i', "") => Composite::Interrupt,
            ('a', "") => Composite::Address,
            ('o', "") => Composite::FarPointer,
            _ => return Err(unknown()),
        };
        Ok(part)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Fixed([BitMatch; 8]),
    Composite(Composite),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern {pattern:?} is empty")]
    Empty { pattern: String },
    #[error("pattern {pattern:?}: literal run of {bits} bits is not a whole number of bytes")]
    PartialByte { pattern: String, bits: usize },
    #[error("pattern {pattern:?}: unclosed '('")]
    Unclosed { pattern: String },
    #[error("pattern {pattern:?}: unknown composite part ({part})")]
    UnknownComposite { pattern: String, part: String },
    #[error("pattern {pattern:?}: literal bits follow a composite part")]
    LiteralAfterComposite { pattern: String },
    #[error("pattern {pattern:?}: literal prefix is wider than {MAX_FLAT_BITS} bits")]
    FlatTooWide { pattern: String },
    #[error("pattern {pattern:?}: can encode more than {MAX_INSTRUCTION_LEN} bytes")]
    TooLong { pattern: String },
    #[error("print format {print:?}: ${field} is not a known operand")]
    UnknownPlaceholder { print: String, field: char },
    #[error("print format {print:?}: ${field} has no matching field in {pattern:?}")]
    UnboundPlaceholder {
        print: String,
        pattern: String,
        field: char,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub print: &'static str,
    pub code: &'static str,
    parts: Vec<Part>,
    flat: Vec<BitMatch>,
}

impl Template {
    pub fn parse(print: &'static str, code: &'static str) -> Result<Self, PatternError> {
        let mut parts = Vec::new();
        let mut flat = Vec::new();
        let mut seen_composite = false;
        let mut rest = code;

        while let Some(c) = rest.chars().next() {
            if c == '(' {
                let close = rest.find(')').ok_or_else(|| PatternError::Unclosed {
                    pattern: code.to_string(),
                })?;
                parts.push(Part::Composite(Composite::parse(code, &rest[1..close])?));
                seen_composite = true;
                rest = &rest[close + 1..];
                continue;
            }
            if seen_composite {
                return Err(PatternError::LiteralAfterComposite {
                    pattern: code.to_string(),
                });
            }
            flat.push(BitMatch::from_char(c));
            rest = &rest[c.len_utf8()..];
        }

        if flat.is_empty() && parts.is_empty() {
            return Err(PatternError::Empty {
                pattern: code.to_string(),
            });
        }
        if flat.len() % 8 != 0 {
            return Err(PatternError::PartialByte {
                pattern: code.to_string(),
                bits: flat.len(),
            });
        }
        if flat.len() > MAX_FLAT_BITS {
            return Err(PatternError::FlatTooWide {
                pattern: code.to_string(),
            });
        }

        // Literal bytes lead the part list.
        let mut fixed: Vec<Part> = flat
            .chunks_exact(8)
            .map(|chunk| {
                let mut byte = [BitMatch::Zero; 8];
                byte.copy_from_slice(chunk);
                Part::Fixed(byte)
            })
            .collect();
        fixed.append(&mut parts);

        let template = Self {
            print,
            code,
            parts: fixed,
            flat,
        };
        if template.max_len() > MAX_INSTRUCTION_LEN {
            return Err(PatternError::TooLong {
                pattern: code.to_string(),
            });
        }
        template.check_placeholders()?;
        Ok(template)
    }

    fn check_placeholders(&self) -> Result<(), PatternError> {
        for field in self.placeholders() {
            if !PRINT_FIELDS.contains(field) {
                return Err(PatternError::UnknownPlaceholder {
                    print: self.print.to_string(),
                    field,
                });
            }
            if !self.has_field(field) {
                return Err(PatternError::UnboundPlaceholder {
                    print: self.print.to_string(),
                    pattern: self.code.to_string(),
                    field,
                });
            }
        }
        Ok(())
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Per-bit matchers of the literal prefix, most significant bit first.
    pub fn flat_bits(&self) -> &[BitMatch] {
        &self.flat
    }

    /// Number of literal bytes.
    pub fn flat_len(&self) -> usize {
        self.flat.len() / 8
    }

    pub fn has_flat_field(&self, letter: char) -> bool {
        self.flat.contains(&BitMatch::Field(letter))
    }

    pub fn composites(&self) -> impl Iterator<Item = Composite> + '_ {
        self.parts.iter().filter_map(|p| match p {
            Part::Composite(c) => Some(*c),
            Part::Fixed(_) => None,
        })
    }

    /// Reg-slot of the addressing byte, when the template has one.
    pub fn addressing(&self) -> Option<RegSlot> {
        self.composites().find_map(|c| match c {
            Composite::AddressingByte(slot) => Some(slot),
            _ => None,
        })
    }

    /// True when `letter` names a literal field, a composite part, or the
    /// register carried by the addressing byte.
    pub fn has_field(&self, letter: char) -> bool {
        if self.has_flat_field(letter) || self.composites().any(|c| c.letter() == letter) {
            return true;
        }
        matches!(
            (letter, self.addressing()),
            ('r', Some(RegSlot::Register)) | ('s', Some(RegSlot::Segment))
        )
    }

    /// Field letters referenced by the print format, in order.
    pub fn placeholders(&self) -> impl Iterator<Item = char> + '_ {
        self.print
            .split('$')
            .skip(1)
            .filter_map(|chunk| chunk.chars().next())
    }

    /// Longest encoding this template can produce.
    pub fn max_len(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                Part::Fixed(_) => 1,
                Part::Composite(c) => c.max_len(),
            })
            .sum()
    }

    /// Bit mask of `letter` over the literal prefix read as a big-endian word.
    pub fn field_mask(&self, letter: char) -> u32 {
        self.flat.iter().fold(0u32, |mask, bit| {
            (mask << 1) | u32::from(*bit == BitMatch::Field(letter))
        })
    }

    /// Encodes a literal-only template with the given field values.
    /// Returns `None` for templates with composite parts.
    pub fn encode(&self, fields: &[(char, u32)]) -> Option<Vec<u8>> {
        if self.composites().next().is_some() {
            return None;
        }
        let ones = self
            .flat
            .iter()
            .fold(0u32, |acc, bit| (acc << 1) | u32::from(*bit == BitMatch::One));
        let word = fields.iter().fold(ones, |acc, &(letter, value)| {
            let mask = self.field_mask(letter);
            if mask == 0 {
                return acc;
            }
            acc | ((value << mask.trailing_zeros()) & mask)
        });
        let n = self.flat_len();
        Some(word.to_be_bytes()[4 - n..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_composite_parts() {
        let t = Template::parse("mov $R, $D", "1100011w(R000)(D)").unwrap();
        assert_eq!(t.parts().len(), 3);
        assert_eq!(t.flat_len(), 1);
        assert_eq!(t.addressing(), Some(RegSlot::Fixed(0)));
        assert_eq!(
            t.parts()[2],
            Part::Composite(Composite::Data { word: false })
        );
        assert_eq!(t.max_len(), 6);
    }

    #[test]
    fn field_mask_tracks_bit_positions() {
        let t = Template::parse("mov $r, $D", "1011wrrr(D)").unwrap();
        assert_eq!(t.field_mask('w'), 0b0000_1000);
        assert_eq!(t.field_mask('r'), 0b0000_0111);
        assert_eq!(t.field_mask('d'), 0);
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(matches!(
            Template::parse("x", "1011"),
            Err(PatternError::PartialByte { bits: 4, .. })
        ));
        assert!(matches!(
            Template::parse("x", "10110000(D"),
            Err(PatternError::Unclosed { .. })
        ));
        assert!(matches!(
            Template::parse("x", "10110000(Q)"),
            Err(PatternError::UnknownComposite { .. })
        ));
        assert!(matches!(
            Template::parse("x", "10110000(D)00000000"),
            Err(PatternError::LiteralAfterComposite { .. })
        ));
        assert!(matches!(
            Template::parse("mov $R", "10110000"),
            Err(PatternError::UnboundPlaceholder { field: 'R', .. })
        ));
        assert!(matches!(
            Template::parse("mov $q", "10110000"),
            Err(PatternError::UnknownPlaceholder { field: 'q', .. })
        ));
    }

    #[test]
    fn addressing_register_binds_r() {
        let t = Template::parse("lea $r, $R", "10001101(Rr)").unwrap();
        assert!(t.has_field('r'));
        assert!(t.has_field('R'));
        assert!(!t.has_field('s'));
    }

    #[test]
    fn encode_sets_fields_and_literals() {
        let t = Template::parse("push $r", "01010rrr").unwrap();
        assert_eq!(t.encode(&[('r', 0b011)]), Some(vec![0x53]));
        let aam = Template::parse("aam", "1101010000001010").unwrap();
        assert_eq!(aam.encode(&[]), Some(vec![0xD4, 0x0A]));
        let mov = Template::parse("mov $r, $D", "1011wrrr(D)").unwrap();
        assert_eq!(mov.encode(&[('w', 1)]), None);
    }
}
