use thiserror::Error;

use crate::pattern::{Part, Template, MAX_INSTRUCTION_LEN};

/// One instruction matched against a template.
///
/// The decoder builds it, resolves its length, and hands it to the printer;
/// it borrows the text segment and never outlives the loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub template: &'a Template,
    /// Byte offset of the instruction in the text segment.
    pub offset: usize,
    /// Total length in bytes; 0 until resolved.
    pub length: usize,
    pub(crate) stream: &'a [u8],
    pub(crate) part_lens: [u8; MAX_INSTRUCTION_LEN],
}

impl<'a> Decoded<'a> {
    pub fn new(template: &'a Template, stream: &'a [u8], offset: usize) -> Self {
        Self {
            template,
            offset,
            length: 0,
            stream,
            part_lens: [0; MAX_INSTRUCTION_LEN],
        }
    }

    /// Bytes left in the stream from the start of this instruction.
    pub fn available(&self) -> usize {
        self.stream.len()
    }

    /// Encoded bytes of the instruction.
    pub fn raw(&self) -> &'a [u8] {
        let stream = self.stream;
        &stream[..self.length.min(stream.len())]
    }

    /// Resolved byte length of the `index`-th pattern part.
    pub fn part_len(&self, index: usize) -> usize {
        self.part_lens.get(index).map_or(0, |&n| usize::from(n))
    }

    fn part_start(&self, index: usize) -> usize {
        (0..index).map(|i| self.part_len(i)).sum()
    }

    /// Bytes consumed by the composite part named by `letter` (`R`, `D`, `P`, ...).
    pub fn composite_bytes(&self, letter: char) -> Option<&'a [u8]> {
        let index = self
            .template
            .parts()
            .iter()
            .position(|p| matches!(p, Part::Composite(c) if c.letter() == letter))?;
        let start = self.part_start(index);
        let stream = self.stream;
        stream.get(start..start + self.part_len(index))
    }
}

pub trait Decoder {
    /// Decodes the instruction at `offset`; `text` ends at the declared text length.
    fn decode<'a>(&'a self, text: &'a [u8], offset: usize) -> Result<Decoded<'a>, DecodeError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("instruction has no match at {offset:#06x}")]
    Unmatched { offset: usize },
    #[error("instruction at {offset:#06x} resolved to zero length")]
    ZeroLength { offset: usize },
    #[error("instruction at {offset:#06x} needs {needed} bytes, only {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::Unmatched { offset }
            | DecodeError::ZeroLength { offset }
            | DecodeError::Truncated { offset, .. } => offset,
        }
    }
}
