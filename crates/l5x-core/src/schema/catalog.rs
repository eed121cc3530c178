//! Instruction catalog: arity and argument roles of ladder instructions.

/// How an instruction uses one of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRole {
    /// A tag reference or a literal.
    Operand,
    /// The name of a routine in the same program.
    Routine,
    /// A jump label.
    Label,
    /// A system object class, instance or attribute name.
    Name,
}

/// Catalog entry for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSpec {
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    roles: &'static [ArgRole],
}

impl InstructionSpec {
    const fn new(name: &'static str, min_args: usize, max_args: Option<usize>) -> Self {
        Self {
            name,
            min_args,
            max_args,
            roles: &[],
        }
    }

    const fn with_roles(mut self, roles: &'static [ArgRole]) -> Self {
        self.roles = roles;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    /// `None` when the instruction is variadic.
    pub fn max_args(&self) -> Option<usize> {
        self.max_args
    }

    /// Whether `count` arguments satisfy the arity.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// Role of the argument at `index`. Unlisted positions are operands.
    pub fn role(&self, index: usize) -> ArgRole {
        self.roles.get(index).copied().unwrap_or(ArgRole::Operand)
    }

    /// Human-readable arity, e.g. `3` or `1..9` or `1..`.
    pub fn arity_text(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("{}..", self.min_args),
        }
    }
}

const fn fixed(name: &'static str, count: usize) -> InstructionSpec {
    InstructionSpec::new(name, count, Some(count))
}

const SYSTEM_ACCESS: &[ArgRole] = &[ArgRole::Name, ArgRole::Name, ArgRole::Name];

/// The standard instruction set.
pub(crate) const STANDARD_INSTRUCTIONS: &[InstructionSpec] = &[
    // Bit
    fixed("XIC", 1),
    fixed("XIO", 1),
    fixed("OTE", 1),
    fixed("OTL", 1),
    fixed("OTU", 1),
    fixed("ONS", 1),
    fixed("OSR", 3),
    fixed("OSF", 3),
    // Timers and counters
    fixed("TON", 3),
    fixed("TOF", 3),
    fixed("RTO", 3),
    fixed("CTU", 3),
    fixed("CTD", 3),
    fixed("RES", 1),
    // Compare
    fixed("EQU", 2),
    fixed("NEQ", 2),
    fixed("LES", 2),
    fixed("LEQ", 2),
    fixed("GRT", 2),
    fixed("GEQ", 2),
    fixed("LIM", 3),
    fixed("MEQ", 3),
    fixed("CMP", 1),
    // Math
    fixed("ADD", 3),
    fixed("SUB", 3),
    fixed("MUL", 3),
    fixed("DIV", 3),
    fixed("MOD", 3),
    fixed("NEG", 2),
    fixed("ABS", 2),
    fixed("SQR", 2),
    fixed("CPT", 2),
    // Move and logical
    fixed("MOV", 2),
    fixed("MVM", 3),
    fixed("CLR", 1),
    fixed("AND", 3),
    fixed("OR", 3),
    fixed("XOR", 3),
    fixed("NOT", 2),
    fixed("BNOT", 2),
    InstructionSpec::new("BAND", 1, Some(9)),
    InstructionSpec::new("BOR", 1, Some(9)),
    InstructionSpec::new("BXOR", 1, Some(9)),
    fixed("BTD", 5),
    // File and array
    fixed("COP", 3),
    fixed("FLL", 3),
    fixed("AVE", 5),
    fixed("STD", 5),
    fixed("SRT", 3),
    fixed("SIZE", 2),
    // Program control
    InstructionSpec::new("JSR", 1, None).with_roles(&[ArgRole::Routine]),
    InstructionSpec::new("RET", 0, None),
    InstructionSpec::new("SBR", 0, None),
    fixed("JMP", 1).with_roles(&[ArgRole::Label]),
    fixed("LBL", 1).with_roles(&[ArgRole::Label]),
    fixed("FOR", 3).with_roles(&[ArgRole::Routine]),
    fixed("NOP", 0),
    fixed("AFI", 0),
    fixed("EOT", 0),
    fixed("TND", 0),
    fixed("MCR", 0),
    fixed("BRK", 0),
    fixed("UID", 0),
    fixed("UIE", 0),
    // Communication and system
    fixed("MSG", 1),
    fixed("GSV", 4).with_roles(SYSTEM_ACCESS),
    fixed("SSV", 4).with_roles(SYSTEM_ACCESS),
    fixed("EVENT", 1),
    fixed("IOT", 1),
    // Alarms
    fixed("ALMD", 1),
    fixed("ALMA", 1),
    // String and conversion
    fixed("CONCAT", 3),
    fixed("MID", 4),
    fixed("FIND", 3),
    fixed("DELETE", 4),
    fixed("INSERT", 4),
    fixed("DTOS", 2),
    fixed("STOD", 2),
    fixed("UPPER", 2),
    fixed("LOWER", 2),
    fixed("TOD", 2),
    fixed("FRD", 2),
    fixed("TRN", 2),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        let ton = fixed("TON", 3);
        assert!(ton.accepts(3));
        assert!(!ton.accepts(2));
        assert_eq!(ton.arity_text(), "3");

        let jsr = InstructionSpec::new("JSR", 1, None);
        assert!(jsr.accepts(1));
        assert!(jsr.accepts(7));
        assert_eq!(jsr.arity_text(), "1..");
    }

    #[test]
    fn test_roles_default_to_operand() {
        let gsv = fixed("GSV", 4).with_roles(SYSTEM_ACCESS);
        assert_eq!(gsv.role(0), ArgRole::Name);
        assert_eq!(gsv.role(3), ArgRole::Operand);
    }
}
