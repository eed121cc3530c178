//! Identifier rules for project entities.
//!
//! Tags, types, members, programs, routines, tasks and modules share one
//! naming rule: an ASCII letter or underscore followed by letters, digits or
//! underscores, at most [`MAX_NAME_LENGTH`] characters, without consecutive
//! or trailing underscores. Names compare case-insensitively.

use thiserror::Error;

/// Maximum length of an entity name.
pub const MAX_NAME_LENGTH: usize = 40;

/// Reasons a name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name `{name}` is longer than {MAX_NAME_LENGTH} characters")]
    TooLong { name: String },

    #[error("name `{name}` must start with a letter or underscore")]
    InvalidStart { name: String },

    #[error("name `{name}` contains invalid character `{ch}`")]
    InvalidCharacter { name: String, ch: char },

    #[error("name `{name}` contains consecutive underscores")]
    ConsecutiveUnderscores { name: String },

    #[error("name `{name}` ends with an underscore")]
    TrailingUnderscore { name: String },
}

/// Check a name against the identifier rule.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(NameError::Empty);
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(NameError::InvalidStart {
            name: name.to_string(),
        });
    }
    if let Some(ch) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(NameError::InvalidCharacter {
            name: name.to_string(),
            ch,
        });
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(NameError::TooLong {
            name: name.to_string(),
        });
    }
    if name.contains("__") {
        return Err(NameError::ConsecutiveUnderscores {
            name: name.to_string(),
        });
    }
    if name.len() > 1 && name.ends_with('_') {
        return Err(NameError::TrailingUnderscore {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Coerce arbitrary text into a valid name.
///
/// Spaces and hyphens become underscores, other invalid characters are
/// dropped, a leading digit gets an underscore prefix, and the result is
/// truncated to [`MAX_NAME_LENGTH`]. Empty input yields `_unnamed`.
pub fn sanitize_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let ch = match ch {
            ' ' | '-' => '_',
            c if c.is_ascii_alphanumeric() || c == '_' => c,
            _ => continue,
        };
        if ch == '_' && name.ends_with('_') {
            continue;
        }
        name.push(ch);
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.truncate(MAX_NAME_LENGTH);
    while name.len() > 1 && name.ends_with('_') {
        name.pop();
    }

    if name.is_empty() || name == "_" {
        "_unnamed".to_string()
    } else {
        name
    }
}

/// Case-insensitive name equality.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["Motor", "_hidden", "Conveyor_1", "a", "X1_Y2"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(validate_name(""), Err(NameError::Empty));
        assert!(matches!(
            validate_name("1Motor"),
            Err(NameError::InvalidStart { .. })
        ));
        assert!(matches!(
            validate_name("Motor-1"),
            Err(NameError::InvalidCharacter { ch: '-', .. })
        ));
        assert!(matches!(
            validate_name("Motor__1"),
            Err(NameError::ConsecutiveUnderscores { .. })
        ));
        assert!(matches!(
            validate_name("Motor_"),
            Err(NameError::TrailingUnderscore { .. })
        ));
        assert!(matches!(
            validate_name(&"A".repeat(41)),
            Err(NameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_name("Main Pump-2"), "Main_Pump_2");
        assert_eq!(sanitize_name("2nd stage"), "_2nd_stage");
        assert_eq!(sanitize_name("%%%"), "_unnamed");
        assert_eq!(sanitize_name("tank level!"), "tank_level");
    }

    proptest! {
        #[test]
        fn sanitized_names_are_valid(raw in "\\PC{0,60}") {
            let name = sanitize_name(&raw);
            prop_assert!(validate_name(&name).is_ok(), "`{}` -> `{}`", raw, name);
        }
    }
}
