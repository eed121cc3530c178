//! Property tests for the rung parser and printer.
//!
//! Random trees are printed, parsed back and printed again. The parsed tree
//! must equal the original and the text must not change.

use indexmap::IndexMap;
use proptest::prelude::*;

use l5x_rung::{
    Element, IndexItem, InstructionCall, NumericLiteral, Operand, Rung, Segment, TagReference,
    parse, substitute,
};

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,12}"
}

fn number_strategy() -> impl Strategy<Value = NumericLiteral> {
    prop_oneof![
        any::<i32>().prop_map(|n| n.to_string()),
        (0u32..100_000).prop_map(|n| format!("16#{n:04X}")),
        (0u8..=255).prop_map(|n| format!("2#{n:08b}")),
        (-1000i32..1000, 0u32..1000).prop_map(|(i, f)| format!("{i}.{f}")),
    ]
    .prop_map(NumericLiteral::new)
}

fn index_item_strategy(
    tag: impl Strategy<Value = TagReference> + Clone,
) -> impl Strategy<Value = IndexItem> {
    prop_oneof![
        (0u32..64).prop_map(|n| IndexItem::Number(NumericLiteral::new(n.to_string()))),
        tag.prop_map(IndexItem::Tag),
    ]
}

fn tag_strategy() -> impl Strategy<Value = TagReference> {
    let leaf = name_strategy().prop_map(TagReference::new);
    leaf.prop_recursive(3, 12, 3, |inner| {
        let segment = prop_oneof![
            name_strategy().prop_map(Segment::Member),
            prop::collection::vec(index_item_strategy(inner), 1..3).prop_map(Segment::Index),
        ];
        (name_strategy(), prop::collection::vec(segment, 0..3)).prop_map(|(base, segments)| {
            TagReference { base, segments }
        })
    })
}

fn operand_strategy() -> impl Strategy<Value = Operand> {
    prop_oneof![
        4 => tag_strategy().prop_map(Operand::Tag),
        2 => number_strategy().prop_map(Operand::Number),
        1 => Just(Operand::Placeholder),
    ]
}

fn instruction_strategy() -> impl Strategy<Value = Element> {
    (
        name_strategy(),
        prop::collection::vec(operand_strategy(), 0..4),
    )
        .prop_map(|(name, arguments)| Element::Instruction(InstructionCall::new(name, arguments)))
}

fn element_strategy() -> impl Strategy<Value = Element> {
    instruction_strategy().prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(prop::collection::vec(inner, 0..3), 1..4).prop_map(Element::branch)
    })
}

fn rung_strategy() -> impl Strategy<Value = Rung> {
    prop::collection::vec(element_strategy(), 0..5).prop_map(Rung::new)
}

fn check_print_parse_round_trip(rung: &Rung) -> Result<(), TestCaseError> {
    let text = rung.to_string();
    let parsed = match parse(&text) {
        Ok(parsed) => parsed,
        Err(err) => return Err(TestCaseError::fail(format!("`{text}` failed to parse: {err}"))),
    };
    prop_assert_eq!(&parsed, rung);
    prop_assert_eq!(parsed.to_string(), text);
    Ok(())
}

fn check_identity_substitution(rung: &Rung) -> Result<(), TestCaseError> {
    let text = rung.to_string();
    let unchanged = substitute(&text, &IndexMap::new());
    prop_assert_eq!(unchanged.ok(), Some(text));
    Ok(())
}

fn check_references_are_distinct(rung: &Rung) -> Result<(), TestCaseError> {
    let refs = rung.references();
    for (i, a) in refs.iter().enumerate() {
        for b in &refs[i + 1..] {
            prop_assert!(!a.eq_ignore_ascii_case(b), "duplicate reference `{a}`");
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn print_parse_round_trip(rung in rung_strategy()) {
        check_print_parse_round_trip(&rung)?;
    }

    #[test]
    fn identity_substitution_preserves_text(rung in rung_strategy()) {
        check_identity_substitution(&rung)?;
    }

    #[test]
    fn references_are_distinct(rung in rung_strategy()) {
        check_references_are_distinct(&rung)?;
    }
}

#[test]
fn test_substitution_does_not_touch_longer_names() {
    let mapping = IndexMap::from([("Tag1".to_string(), "Pump".to_string())]);
    let text = substitute("[XIC(Tag1) ,XIC(Tag10) ]MOV(Tag1[Tag10],Tag10[Tag1]);", &mapping).unwrap();
    assert_eq!(text, "[XIC(Pump) ,XIC(Tag10) ]MOV(Pump[Tag10],Tag10[Pump]);");
}
