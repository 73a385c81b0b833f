//! Node tree produced by template compilation

use std::sync::Arc;

use crate::template::{ComponentInvocation, MixinDefinition, MixinInvocation, SlotPlaceholder};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Literal value written directly in a template
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Head of an expression: a literal or a dotted variable lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Literal),
    /// `user.name` is stored as `["user", "name"]`
    Path(Vec<String>),
}

impl Operand {
    pub fn is_variable(&self) -> bool {
        matches!(self, Operand::Path(_))
    }
}

/// Filter application such as `|default:"x"`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub arg: Option<Operand>,
}

/// An operand followed by zero or more filters
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub operand: Operand,
    pub filters: Vec<Filter>,
    /// Source text of the expression, used in error messages
    pub token: String,
}

impl FilterExpr {
    /// Bare identifier with no filters, e.g. `with` or `only`
    pub fn as_word(&self) -> Option<&str> {
        match (&self.operand, self.filters.is_empty()) {
            (Operand::Path(segments), true) if segments.len() == 1 => Some(&segments[0]),
            _ => None,
        }
    }

    pub fn as_str_literal(&self) -> Option<&str> {
        match (&self.operand, self.filters.is_empty()) {
            (Operand::Literal(Literal::Str(s)), true) => Some(s),
            _ => None,
        }
    }
}

/// One whitespace-separated argument of a tag
#[derive(Debug, Clone, PartialEq)]
pub enum Bit {
    Expr(FilterExpr),
    Kwarg { key: String, value: FilterExpr },
}

/// Compiled template node
#[derive(Debug)]
pub enum Node {
    Text(String),
    Variable(Spanned<FilterExpr>),
    Comment,
    /// `{% extends parent %}`
    Extends(Spanned<FilterExpr>),
    Mixin(MixinDefinition),
    Mix(MixinInvocation),
    Component(ComponentInvocation),
    Slot(SlotPlaceholder),
}

impl Node {
    /// Whitespace-only text and comments
    pub fn is_blank(&self) -> bool {
        match self {
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment => true,
            _ => false,
        }
    }
}

/// Ordered sequence of nodes
///
/// Shared behind an `Arc` wherever the same body is rendered from several
/// places (mixin bodies, slot overrides).
#[derive(Debug, Default)]
pub struct NodeList {
    nodes: Vec<Node>,
}

impl NodeList {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn shared(self) -> Arc<NodeList> {
        Arc::new(self)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
