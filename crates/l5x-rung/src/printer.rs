//! Canonical text for rung trees.
//!
//! Printing is the inverse of parsing: for any text the parser accepts,
//! printing its tree gives the same text back. Branches are written with a
//! space before every separator and before the closing bracket,
//! `[XIC(A) ,XIC(B) ]`.

use std::fmt::{self, Display, Formatter};

use crate::ast::{
    Branch, Element, IndexItem, InstructionCall, NumericLiteral, Operand, Rung, Segment,
    TagReference,
};

fn write_series(f: &mut Formatter<'_>, elements: &[Element]) -> fmt::Result {
    elements.iter().try_for_each(|element| write!(f, "{element}"))
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Rung {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_series(f, &self.elements)?;
        f.write_str(";")
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Element::Instruction(call) => write!(f, "{call}"),
            Element::Branch(branch) => write!(f, "{branch}"),
        }
    }
}

impl Display for InstructionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        write_separated(f, &self.arguments, ",")?;
        f.write_str(")")
    }
}

impl Display for Branch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, path) in self.paths.iter().enumerate() {
            if i > 0 {
                f.write_str(" ,")?;
            }
            write_series(f, path)?;
        }
        f.write_str(" ]")
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Tag(tag) => write!(f, "{tag}"),
            Operand::Number(number) => write!(f, "{number}"),
            Operand::Placeholder => f.write_str("?"),
        }
    }
}

impl Display for TagReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        self.segments
            .iter()
            .try_for_each(|segment| write!(f, "{segment}"))
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Member(name) => write!(f, ".{name}"),
            Segment::Index(items) => {
                f.write_str("[")?;
                write_separated(f, items, ",")?;
                f.write_str("]")
            }
        }
    }
}

impl Display for IndexItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IndexItem::Number(number) => write!(f, "{number}"),
            IndexItem::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

impl Display for NumericLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
