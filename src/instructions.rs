//! The 8086 opcode table.
//!
//! Pattern letters: `d` direction, `w` word, `W` sign/word pair, `r` register,
//! `s` segment register, `c` shift count select. Parenthesized parts:
//! `(R..)` mod/reg/r-m byte with its reg sub-field (`r`, `s`, a fixed
//! extension like `101`, or `xxx`), `(D)` data, `(Dw)` word data, `(P)` byte
//! displacement, `(Pw)` word displacement, `(p)` port, `(i)` interrupt type,
//! `(a)` address, `(o)` offset:segment.
//!
//! Matching takes the first entry that fits, so order matters.

use std::sync::OnceLock;

use tracing::debug;

use crate::pattern::{PatternError, Template};

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDesc {
    pub print: &'static str,
    pub code: &'static str,
}

const fn op(print: &'static str, code: &'static str) -> OpcodeDesc {
    OpcodeDesc { print, code }
}

pub const TABLE: &[OpcodeDesc] = &[
    // data transfer
    op("mov $R, $r", "100010dw(Rr)"),
    op("mov $R, $D", "1100011w(R000)(D)"),
    op("mov $r, $D", "1011wrrr(D)"),
    op("mov a$w, [$a]", "1010000w(a)"),
    op("mov [$a], a$w", "1010001w(a)"),
    op("mov $R, $s", "100011d0(Rs)"),
    op("push $R", "11111111(R110)"),
    op("push $r", "01010rrr"),
    op("push $s", "000ss110"),
    op("pop $R", "10001111(R000)"),
    op("pop $r", "01011rrr"),
    // 0x0f (pop cs) is not decoded
    op("pop es", "00000111"),
    op("pop ss", "00010111"),
    op("pop ds", "00011111"),
    op("xchg $R, $r", "1000011w(Rr)"),
    op("xchg ax, $r", "10010rrr"),
    op("in a$w, $p", "1110010w(p)"),
    op("in a$w, dx", "1110110w"),
    op("out $p, a$w", "1110011w(p)"),
    op("out dx, a$w", "1110111w"),
    op("xlat", "11010111"),
    op("lea $r, $R", "10001101(Rr)"),
    op("lds $r, $R", "11000101(Rr)"),
    op("les $r, $R", "11000100(Rr)"),
    op("lahf", "10011111"),
    op("sahf", "10011110"),
    op("pushf", "10011100"),
    op("popf", "10011101"),
    // arithmetic
    op("add $R, $r", "000000dw(Rr)"),
    op("add $R, $D", "100000WW(R000)(D)"),
    op("add a$w, $D", "0000010w(D)"),
    op("adc $R, $r", "000100dw(Rr)"),
    op("adc $R, $D", "100000WW(R010)(D)"),
    op("adc a$w, $D", "0001010w(D)"),
    op("inc $R", "1111111w(R000)"),
    op("inc $r", "01000rrr"),
    op("aaa", "00110111"),
    op("daa", "00100111"),
    op("sub $R, $r", "001010dw(Rr)"),
    op("sub $R, $D", "100000WW(R101)(D)"),
    op("sub a$w, $D", "0010110w(D)"),
    op("sbb $R, $r", "000110dw(Rr)"),
    op("sbb $R, $D", "100000WW(R011)(D)"),
    op("sbb a$w, $D", "0001110w(D)"),
    op("dec $R", "1111111w(R001)"),
    op("dec $r", "01001rrr"),
    op("neg $R", "1111011w(R011)"),
    op("cmp $R, $r", "001110dw(Rr)"),
    op("cmp $R, $D", "100000WW(R111)(D)"),
    op("cmp a$w, $D", "0011110w(D)"),
    op("aas", "00111111"),
    op("das", "00101111"),
    op("mul $R", "1111011w(R100)"),
    op("imul $R", "1111011w(R101)"),
    op("aam", "1101010000001010"),
    op("div $R", "1111011w(R110)"),
    op("idiv $R", "1111011w(R111)"),
    op("aad", "1101010100001010"),
    op("cbw", "10011000"),
    op("cwd", "10011001"),
    // logic
    op("not $R", "1111011w(R010)"),
    op("shl $R, $c", "110100cw(R100)"),
    op("shr $R, $c", "110100cw(R101)"),
    op("sar $R, $c", "110100cw(R111)"),
    op("rol $R, $c", "110100cw(R000)"),
    op("ror $R, $c", "110100cw(R001)"),
    op("rcl $R, $c", "110100cw(R010)"),
    op("rcr $R, $c", "110100cw(R011)"),
    op("and $R, $r", "001000dw(Rr)"),
    op("and $R, $D", "1000000w(R100)(D)"),
    op("and a$w, $D", "0010010w(D)"),
    op("test $R, $r", "1000010w(Rr)"),
    op("test $R, $D", "1111011w(R000)(D)"),
    op("test a$w, $D", "1010100w(D)"),
    op("or $R, $r", "000010dw(Rr)"),
    op("or $R, $D", "1000000w(R001)(D)"),
    op("or a$w, $D", "0000110w(D)"),
    op("xor $R, $r", "001100dw(Rr)"),
    op("xor $R, $D", "1000000w(R110)(D)"),
    op("xor a$w, $D", "0011010w(D)"),
    // string manipulation
    op("repne", "11110010"),
    op("rep", "11110011"),
    op("movs", "1010010w"),
    op("cmps", "1010011w"),
    op("scas", "1010111w"),
    op("lods", "1010110w"),
    op("stos", "1010101w"),
    // control transfer
    op("call $P", "11101000(Pw)"),
    op("call $R", "11111111(R010)"),
    op("call $o", "10011010(o)"),
    op("call far $R", "11111111(R011)"),
    op("jmp $P", "11101001(Pw)"),
    op("jmp short $P", "11101011(P)"),
    op("jmp $R", "11111111(R100)"),
    op("jmp $o", "11101010(o)"),
    op("jmp far $R", "11111111(R101)"),
    op("ret", "11000011"),
    op("ret $D", "11000010(Dw)"),
    op("retf", "11001011"),
    op("retf $D", "11001010(Dw)"),
    op("je $P", "01110100(P)"),
    op("jl $P", "01111100(P)"),
    op("jle $P", "01111110(P)"),
    op("jb $P", "01110010(P)"),
    op("jbe $P", "01110110(P)"),
    op("jp $P", "01111010(P)"),
    op("jo $P", "01110000(P)"),
    op("js $P", "01111000(P)"),
    op("jne $P", "01110101(P)"),
    op("jnl $P", "01111101(P)"),
    op("jg $P", "01111111(P)"),
    op("jnb $P", "01110011(P)"),
    op("ja $P", "01110111(P)"),
    op("jnp $P", "01111011(P)"),
    op("jno $P", "01110001(P)"),
    op("jns $P", "01111001(P)"),
    op("jcxz $P", "11100011(P)"),
    op("loop $P", "11100010(P)"),
    op("loopz $P", "11100001(P)"),
    op("loopnz $P", "11100000(P)"),
    op("int $i", "11001101(i)"),
    op("int 3", "11001100"),
    op("into", "11001110"),
    op("iret", "11001111"),
    // processor control
    op("clc", "11111000"),
    op("cmc", "11110101"),
    op("stc", "11111001"),
    op("cld", "11111100"),
    op("std", "11111101"),
    op("cli", "11111010"),
    op("sti", "11111011"),
    op("hlt", "11110100"),
    op("wait", "10011011"),
    op("esc $R", "11011xxx(Rxxx)"),
    op("lock", "11110000"),
];

/// Parsed form of [`TABLE`], in match order.
#[derive(Debug)]
pub struct Catalog {
    templates: Vec<Template>,
}

impl Catalog {
    pub fn parse(table: &[OpcodeDesc]) -> Result<Self, PatternError> {
        let templates = table
            .iter()
            .map(|d| Template::parse(d.print, d.code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The built-in catalog, parsed on first use.
pub fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let catalog = Catalog::parse(TABLE).expect("built-in opcode table is well-formed");
        debug!(templates = catalog.len(), "opcode catalog loaded");
        catalog
    })
}
