use crate::decoder::Decoded;
use crate::isa::i8086::ModRm;

const WORD_REGS: [&str; 8] = ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];
const BYTE_REGS: [&str; 8] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];
const SEGMENT_REGS: [&str; 4] = ["es", "cs", "ss", "ds"];

/// Base/index forms selected by r/m when mod != 11.
const EFFECTIVE_ADDRESS: [&str; 8] = [
    "[bx+si]", "[bx+di]", "[bp+si]", "[bp+di]", "[si]", "[di]", "[bp]", "[bx]",
];

pub fn register_name(index: u32, word: bool) -> &'static str {
    let table = if word { &WORD_REGS } else { &BYTE_REGS };
    table[(index & 0b111) as usize]
}

pub fn segment_name(index: u32) -> &'static str {
    SEGMENT_REGS[(index & 0b11) as usize]
}

/// Mnemonic and operands of a decoded instruction.
pub fn fmt_decoded(d: &Decoded) -> String {
    // d=1 moves the reg/segment operand into the r/m operand's slot and back.
    let swap = d.template.has_flat_field('d') && d.field('d') == 1;
    let paired = if d.template.has_field('r') { 'r' } else { 's' };

    let mut out = String::with_capacity(d.template.print.len() + 16);
    let mut chars = d.template.print.chars();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let Some(field) = chars.next() else { break };
        let field = match field {
            'R' if swap => paired,
            'r' | 's' if swap => 'R',
            other => other,
        };
        out.push_str(&render_operand(d, field));
    }
    out
}

/// Text for one placeholder of the print format.
pub fn render_operand(d: &Decoded, field: char) -> String {
    match field {
        'r' => register_name(d.register(), d.is_word_register()).to_string(),
        's' => segment_name(d.segment()).to_string(),
        'R' => render_memory(d),
        'D' => match d.composite_bytes('D').unwrap_or_default() {
            [lo, hi] => format!("{:04x}", u16::from_le_bytes([*lo, *hi])),
            [b] => format!("{b:02x}"),
            _ => String::new(),
        },
        // Ports, interrupt types and addresses keep stream byte order.
        'p' | 'i' | 'a' | 'o' => hex_bytes(d.composite_bytes(field).unwrap_or_default()),
        'P' => format!("{:04x}", jump_target(d)),
        'c' => {
            if d.field('c') == 0 {
                "1".to_string()
            } else {
                "cl".to_string()
            }
        }
        'w' => {
            if d.field('w') == 1 {
                "x".to_string()
            } else {
                "l".to_string()
            }
        }
        // Templates are checked against this set when the catalog loads.
        _ => String::new(),
    }
}

/// Register name or memory expression for the mod/reg/r-m operand.
fn render_memory(d: &Decoded) -> String {
    let Some(modrm) = d.modrm() else {
        return String::new();
    };
    let disp = d
        .composite_bytes('R')
        .and_then(|bytes| bytes.get(1..))
        .unwrap_or_default();
    render_modrm(modrm, disp)
}

/// `disp` holds the displacement bytes that follow the addressing byte.
pub fn render_modrm(modrm: ModRm, disp: &[u8]) -> String {
    if modrm.is_register() {
        return register_name(u32::from(modrm.rm), true).to_string();
    }
    if modrm.is_direct() {
        return match disp {
            [lo, hi] => format!("[{:04x}]", u16::from_le_bytes([*lo, *hi])),
            _ => String::new(),
        };
    }
    let base = EFFECTIVE_ADDRESS[usize::from(modrm.rm)];
    match (modrm.mode, disp) {
        (0b01, [b]) => format!("{base}{}", signed_byte(*b)),
        (0b10, [lo, hi]) => format!("{base}+{:x}", u16::from_le_bytes([*lo, *hi])),
        _ => base.to_string(),
    }
}

fn signed_byte(b: u8) -> String {
    let v = b as i8;
    if v < 0 {
        format!("-{:x}", v.unsigned_abs())
    } else {
        format!("+{v:x}")
    }
}

/// Absolute target of a relative jump, wrapped to 16 bits.
pub fn jump_target(d: &Decoded) -> u16 {
    let disp = match d.composite_bytes('P').unwrap_or_default() {
        [b] => i16::from(*b as i8),
        [lo, hi] => i16::from_le_bytes([*lo, *hi]),
        _ => 0,
    };
    (d.offset as u16)
        .wrapping_add(d.length as u16)
        .wrapping_add(disp as u16)
}

/// Lowercase hex, two digits per byte, no separators.
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
