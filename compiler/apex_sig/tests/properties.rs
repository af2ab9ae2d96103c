//! Property tests over generated headers.
//!
//! Every generated header defines `struct S0..Sn` whose members are scalars,
//! arrays, bit-fields or pointers to other `S` records, plus a `struct Root`
//! pointing at all of them. Checked:
//! 1. Determinism: analyzing the same unit twice gives the same text.
//! 2. Order independence: shuffling the definitions does not change output.
//! 3. Sorting: blocks come out ordered by display name, each type once.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    reason = "Proptest macros generate code with these patterns"
)]

use std::fmt::Write as _;

use apex_cfront::{parse, Target};
use apex_sig::{analyze, AnalyzeOptions, Signature};
use proptest::prelude::*;

/// A member declaration with `@` where the member name goes.
fn member_strategy(records: usize) -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "char @",
            "short @",
            "int @",
            "long @",
            "double @",
            "void *@",
            "const char *@",
            "unsigned char @[3]",
            "unsigned @ : 5",
            "long long @ : 40",
        ])
        .prop_map(str::to_owned),
        (0..records).prop_map(|k| format!("struct S{k} *@")),
    ]
}

/// Member lists for each record and a shuffled definition order.
fn header_strategy() -> impl Strategy<Value = (Vec<Vec<String>>, Vec<usize>)> {
    (1..6usize).prop_flat_map(|records| {
        (
            prop::collection::vec(prop::collection::vec(member_strategy(records), 1..6), records),
            Just((0..records).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

fn header(members: &[Vec<String>], order: &[usize]) -> String {
    let mut out = String::new();
    for i in 0..members.len() {
        writeln!(out, "struct S{i};").unwrap();
    }
    for &i in order {
        writeln!(out, "struct S{i} {{").unwrap();
        for (m, decl) in members[i].iter().enumerate() {
            writeln!(out, "    {};", decl.replace('@', &format!("m{m}"))).unwrap();
        }
        out.push_str("};\n");
    }
    out.push_str("struct Root {\n");
    for i in 0..members.len() {
        writeln!(out, "    struct S{i} *s{i};").unwrap();
    }
    out.push_str("};\n");
    out
}

fn analyze_header(source: &str) -> Signature {
    let unit = parse(source, "gen.h", &Target::default()).unwrap();
    analyze(&unit, "Root", AnalyzeOptions::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_analysis_is_deterministic((members, order) in header_strategy()) {
        let source = header(&members, &order);
        let unit = parse(&source, "gen.h", &Target::default()).unwrap();
        let first = analyze(&unit, "Root", AnalyzeOptions::default()).unwrap();
        let second = analyze(&unit, "Root", AnalyzeOptions::default()).unwrap();
        prop_assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn prop_definition_order_does_not_matter((members, order) in header_strategy()) {
        let in_order: Vec<usize> = (0..members.len()).collect();
        let sorted = analyze_header(&header(&members, &in_order)).to_string();
        let shuffled = analyze_header(&header(&members, &order)).to_string();
        prop_assert_eq!(sorted, shuffled);
    }

    #[test]
    fn prop_blocks_are_sorted_and_unique((members, order) in header_strategy()) {
        let sig = analyze_header(&header(&members, &order));
        for pair in sig.blocks().windows(2) {
            prop_assert!(
                (&pair[0].display_name, &pair[0].text) <= (&pair[1].display_name, &pair[1].text),
                "blocks out of order: {:?} before {:?}",
                pair[0].display_name,
                pair[1].display_name
            );
        }
        for i in 0..members.len() {
            let name = format!("struct S{i}");
            let count = sig.blocks().iter().filter(|b| b.display_name == name).count();
            prop_assert_eq!(count, 1);
        }
        prop_assert!(sig.to_string().ends_with('\n'));
    }
}
