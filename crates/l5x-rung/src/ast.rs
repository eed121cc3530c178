//! Parsed form of rung text.
//!
//! The tree is fully owned: a [`Rung`] owns its elements, a [`Branch`] owns
//! its paths, and every name and literal is an owned `String`. Nothing in the
//! tree borrows from the source text, so a parsed rung can be edited and
//! printed back after the text it came from is gone.
//!
//! `Display` on every node yields the canonical text; see [`crate::printer`].

/// A parsed rung: the series elements in order.
///
/// An empty rung (`;`) has no elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rung {
    pub elements: Vec<Element>,
}

/// One series element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Instruction(InstructionCall),
    Branch(Branch),
}

/// An instruction with its arguments, e.g. `TON(Timer1,?,?)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionCall {
    pub name: String,
    pub arguments: Vec<Operand>,
}

/// Parallel paths, each a sequence of elements. A path may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub paths: Vec<Vec<Element>>,
}

/// One instruction argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Tag(TagReference),
    Number(NumericLiteral),
    /// `?`
    Placeholder,
}

/// A tag operand: base name plus member and index segments.
///
/// `Motor.Status[2].Run` has base `Motor` and segments `.Status`, `[2]`,
/// `.Run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReference {
    pub base: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `.Name`, or `.3` for a bit of an integer.
    Member(String),
    /// `[i]` or `[i,j,...]`.
    Index(Vec<IndexItem>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexItem {
    Number(NumericLiteral),
    /// Indirect addressing through another tag.
    Tag(TagReference),
}

/// A numeric literal, kept as written so it prints back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericLiteral {
    text: String,
}

impl Rung {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every instruction call, depth first, in text order.
    pub fn instructions(&self) -> Vec<&InstructionCall> {
        fn walk<'a>(elements: &'a [Element], out: &mut Vec<&'a InstructionCall>) {
            for element in elements {
                match element {
                    Element::Instruction(call) => out.push(call),
                    Element::Branch(branch) => {
                        for path in &branch.paths {
                            walk(path, out);
                        }
                    }
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.elements, &mut out);
        out
    }

    /// Visit every instruction call mutably, in text order.
    pub fn visit_instructions_mut(&mut self, f: &mut dyn FnMut(&mut InstructionCall)) {
        fn walk(elements: &mut [Element], f: &mut dyn FnMut(&mut InstructionCall)) {
            for element in elements {
                match element {
                    Element::Instruction(call) => f(call),
                    Element::Branch(branch) => {
                        for path in &mut branch.paths {
                            walk(path, f);
                        }
                    }
                }
            }
        }

        walk(&mut self.elements, f);
    }
}

impl Element {
    pub fn instruction(name: impl Into<String>, arguments: Vec<Operand>) -> Self {
        Element::Instruction(InstructionCall::new(name, arguments))
    }

    pub fn branch(paths: Vec<Vec<Element>>) -> Self {
        Element::Branch(Branch { paths })
    }
}

impl InstructionCall {
    pub fn new(name: impl Into<String>, arguments: Vec<Operand>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

impl Operand {
    /// Shorthand for a tag operand without segments.
    pub fn tag(base: impl Into<String>) -> Self {
        Operand::Tag(TagReference::new(base))
    }

    pub fn number(text: impl Into<String>) -> Self {
        Operand::Number(NumericLiteral::new(text))
    }

    pub fn as_tag(&self) -> Option<&TagReference> {
        match self {
            Operand::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Operand::Placeholder)
    }
}

impl TagReference {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            segments: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.segments.push(Segment::Member(member.into()));
        self
    }

    pub fn with_index(mut self, items: Vec<IndexItem>) -> Self {
        self.segments.push(Segment::Index(items));
        self
    }

    /// Whether the reference is a bare name with no segments.
    pub fn is_bare(&self) -> bool {
        self.segments.is_empty()
    }

    /// This reference followed by every tag used inside its indexes.
    pub fn tags(&self) -> Vec<&TagReference> {
        let mut out = vec![self];
        for segment in &self.segments {
            if let Segment::Index(items) = segment {
                for item in items {
                    if let IndexItem::Tag(inner) = item {
                        out.extend(inner.tags());
                    }
                }
            }
        }
        out
    }

    /// Visit this reference and every tag nested in its indexes.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut TagReference)) {
        f(self);
        for segment in &mut self.segments {
            if let Segment::Index(items) = segment {
                for item in items {
                    if let IndexItem::Tag(inner) = item {
                        inner.visit_mut(f);
                    }
                }
            }
        }
    }
}

impl NumericLiteral {
    /// Wrap literal text. The text is not checked.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Integer value, honouring `16#`, `8#` and `2#` prefixes.
    pub fn to_i64(&self) -> Option<i64> {
        let digits: String = self.text.chars().filter(|c| *c != '_').collect();
        let (radix, body) = match digits.split_once('#') {
            Some(("16", body)) => (16, body),
            Some(("8", body)) => (8, body),
            Some(("2", body)) => (2, body),
            Some(_) => return None,
            None => (10, digits.as_str()),
        };
        i64::from_str_radix(body, radix).ok()
    }

    /// Floating value of a decimal literal, or the integer value of a radix one.
    pub fn to_f64(&self) -> Option<f64> {
        if self.text.contains('#') {
            return self.to_i64().map(|v| v as f64);
        }
        self.text.replace('_', "").parse().ok()
    }
}
