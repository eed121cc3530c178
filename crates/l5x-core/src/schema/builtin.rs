//! Built-in structured data types.
//!
//! Status bits of TIMER, COUNTER and CONTROL live in a hidden DINT that
//! occupies the first compact slot, so `TIMER` encodes as `[status,PRE,ACC]`.

use crate::types::{Family, Member, TypeDefinition, TypeOrigin};

/// Character capacity of the built-in STRING type.
pub const STRING_CAPACITY: usize = 82;

fn status_word(name: &str, fields: &[&str], bits: &[(&str, u8)]) -> TypeDefinition {
    let mut members = vec![Member::field("Control", "DINT", 0).hidden()];
    members.extend(fields.iter().map(|f| Member::field(*f, "DINT", 0)));
    members.extend(bits.iter().map(|(b, bit)| Member::bit(*b, "Control", *bit)));
    TypeDefinition::new(name, TypeOrigin::Builtin, members)
}

pub(crate) fn standard_types() -> Vec<TypeDefinition> {
    vec![
        status_word(
            "TIMER",
            &["PRE", "ACC"],
            &[("EN", 31), ("TT", 30), ("DN", 29)],
        ),
        status_word(
            "COUNTER",
            &["PRE", "ACC"],
            &[("CU", 31), ("CD", 30), ("DN", 29), ("OV", 28), ("UN", 27)],
        ),
        status_word(
            "CONTROL",
            &["LEN", "POS"],
            &[
                ("EN", 31),
                ("EU", 30),
                ("DN", 29),
                ("EM", 28),
                ("ER", 27),
                ("UL", 26),
                ("IN", 25),
                ("FD", 24),
            ],
        ),
        string_type("STRING", STRING_CAPACITY),
    ]
}

/// A string-family structure with the given capacity.
pub fn string_type(name: &str, capacity: usize) -> TypeDefinition {
    TypeDefinition::new(
        name,
        TypeOrigin::Builtin,
        vec![
            Member::field("LEN", "DINT", 0),
            Member::field("DATA", "SINT", capacity),
        ],
    )
    .with_family(Family::String)
}
