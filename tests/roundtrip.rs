use i8086_rs::decoder::Decoder;
use i8086_rs::instructions::catalog;
use i8086_rs::pattern::{BitMatch, Template};
use i8086_rs::I8086Decoder;

fn field_letters(t: &Template) -> Vec<char> {
    let mut letters = Vec::new();
    for bit in t.flat_bits() {
        if let BitMatch::Field(c) = bit {
            if !letters.contains(c) {
                letters.push(*c);
            }
        }
    }
    letters
}

/// Every assignment of values to `letters`, each as wide as its mask.
fn assignments(t: &Template, letters: &[char]) -> Vec<Vec<(char, u32)>> {
    letters.iter().fold(vec![Vec::new()], |acc, &c| {
        let width = t.field_mask(c).count_ones();
        acc.into_iter()
            .flat_map(|prefix| {
                (0..1u32 << width).map(move |v| {
                    let mut next = prefix.clone();
                    next.push((c, v));
                    next
                })
            })
            .collect()
    })
}

#[test]
fn literal_templates_round_trip() {
    let dec = I8086Decoder::new();
    let mut checked = 0usize;
    for t in catalog().iter().filter(|t| t.composites().next().is_none()) {
        let letters = field_letters(t);
        for fields in assignments(t, &letters) {
            let bytes = t.encode(&fields).unwrap();
            let d = dec.decode(&bytes, 0).unwrap();
            assert!(std::ptr::eq(d.template, t), "{bytes:02x?} decoded as {}", d.template.print);
            assert_eq!(d.length, bytes.len());
            for &(c, v) in &fields {
                assert_eq!(d.field(c), v, "{} field {c}", t.print);
            }
            checked += 1;
        }
    }
    // One decode per assignment: 2^(field bits) for each literal-only template.
    let expected: usize = catalog()
        .iter()
        .filter(|t| t.composites().next().is_none())
        .map(|t| {
            let field_bits = t
                .flat_bits()
                .iter()
                .filter(|b| matches!(b, BitMatch::Field(_)))
                .count();
            1usize << field_bits
        })
        .sum();
    assert_eq!(checked, expected);
    assert_eq!(checked, 91);
}
