use i8086_rs::instructions::{catalog, Catalog, TABLE};
use i8086_rs::isa::i8086::{match_template, MatchOutcome};
use pretty_assertions::assert_eq;

#[test]
fn table_parses_in_order() {
    let parsed = Catalog::parse(TABLE).unwrap();
    assert_eq!(parsed.len(), TABLE.len());
    for (t, desc) in parsed.iter().zip(TABLE) {
        assert_eq!(t.print, desc.print);
        assert_eq!(t.code, desc.code);
    }
}

#[test]
fn lengths_are_whole_bytes_within_limit() {
    for t in catalog() {
        assert_eq!(t.flat_bits().len() % 8, 0, "{}", t.code);
        let bits = t.max_len() * 8;
        assert!(bits > 0 && bits <= 120, "{} can take {bits} bits", t.code);
    }
}

#[test]
fn at_most_one_template_matches_any_two_bytes() {
    for b0 in 0..=255u8 {
        for b1 in 0..=255u8 {
            let hits: Vec<&str> = catalog()
                .iter()
                .filter(|t| {
                    matches!(
                        match_template(&[b0, b1], 0, t),
                        MatchOutcome::Matched { .. }
                    )
                })
                .map(|t| t.print)
                .collect();
            assert!(hits.len() <= 1, "{b0:02x} {b1:02x} matches {hits:?}");
        }
    }
}

#[test]
fn unassigned_first_bytes_never_match() {
    let mut holes: Vec<u8> = vec![0x0F, 0x26, 0x2E, 0x36, 0x3E, 0xC0, 0xC1, 0xC8, 0xC9, 0xD6, 0xF1];
    holes.extend(0x60..=0x6F);
    for b0 in 0..=255u8 {
        let any = (0..=255u8).any(|b1| {
            catalog()
                .iter()
                .any(|t| matches!(match_template(&[b0, b1], 0, t), MatchOutcome::Matched { .. }))
        });
        assert_eq!(any, !holes.contains(&b0), "first byte {b0:02x}");
    }
}
