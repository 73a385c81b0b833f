//! Single forward pass turning template tokens into a node tree
//!
//! [`Parser`] exposes the primitives tag compilers need (`parse_until`,
//! `next_token`, `expect_end_tag`). Compile-time state that tags share, such
//! as the mixin table, lives in a [`CompileContext`] passed explicitly to every
//! tag compiler and dropped when compilation finishes.

use tracing::trace;

use crate::error::{Result, TemplateError};
use crate::parser::ast::{Bit, Node, NodeList, Span, Spanned};
use crate::parser::grammar::{parse_bits, parse_filter_expression};
use crate::parser::lexer::{lex, Token};
use crate::template::{component, mixin, slots, MixinTable};

/// State scoped to the compilation of one template
#[derive(Debug, Default)]
pub struct CompileContext {
    /// Name of the template being compiled, for relative paths
    origin: Option<String>,
    mixins: MixinTable,
}

impl CompileContext {
    pub fn new(origin: Option<&str>) -> Self {
        Self {
            origin: origin.map(str::to_string),
            mixins: MixinTable::new(),
        }
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn mixins(&self) -> &MixinTable {
        &self.mixins
    }

    pub fn mixins_mut(&mut self) -> &mut MixinTable {
        &mut self.mixins
    }
}

/// A `{% ... %}` token
#[derive(Debug, Clone, PartialEq)]
pub struct TagToken {
    /// Trimmed text between the delimiters
    pub contents: String,
    /// Range of the whole tag in the source
    pub span: Span,
    /// Position of `contents` in the source
    offset: usize,
}

impl TagToken {
    fn new(contents: String, span: Span, source: &str) -> Self {
        let offset = source[span.clone()]
            .find(contents.as_str())
            .map(|pos| span.start + pos)
            .unwrap_or(span.start);
        Self {
            contents,
            span,
            offset,
        }
    }

    /// Tag name, e.g. `component`
    pub fn name(&self) -> &str {
        self.contents.split_whitespace().next().unwrap_or("")
    }

    /// Whitespace-separated words, including the tag name
    pub fn words(&self) -> Vec<&str> {
        self.contents.split_whitespace().collect()
    }

    /// Arguments after the tag name, split into expressions and keyword pairs
    pub fn bits(&self) -> Result<Vec<Spanned<Bit>>> {
        let name_len = self.name().len();
        parse_bits(&self.contents[name_len..], self.offset + name_len)
    }

    pub fn syntax_error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax_at(message, self.span.clone())
    }
}

/// Recursive-descent parser over the template token stream
pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// Number of enclosing block tags
    nesting: usize,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            tokens: lex(source),
            pos: 0,
            nesting: 0,
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Compile the whole template
    pub fn parse(&mut self, cx: &mut CompileContext) -> Result<NodeList> {
        self.parse_until(cx, &[])
    }

    /// Compile nodes until a block tag named in `until` (left unconsumed) or
    /// the end of input
    pub fn parse_until(&mut self, cx: &mut CompileContext, until: &[&str]) -> Result<NodeList> {
        let mut nodes = Vec::new();

        while let Some((token, span)) = self.next_token() {
            let node = match token {
                Token::Text(text) => Node::Text(text),
                Token::Comment => Node::Comment,
                Token::Variable(contents) => {
                    let offset = self.source[span.clone()]
                        .find(contents.as_str())
                        .map(|pos| span.start + pos)
                        .unwrap_or(span.start);
                    Node::Variable(parse_filter_expression(&contents, offset)?)
                }
                Token::Block(contents) => {
                    let tag = TagToken::new(contents, span, self.source);
                    if until.contains(&tag.name()) {
                        self.pos -= 1;
                        break;
                    }
                    self.nesting += 1;
                    let node = self.compile_tag(cx, &tag);
                    self.nesting -= 1;
                    node?
                }
            };
            nodes.push(node);
        }

        Ok(NodeList::new(nodes))
    }

    /// Consume and return the next token
    pub fn next_token(&mut self) -> Option<(Token, Span)> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    /// Consume the closing tag of `opener`
    ///
    /// `acceptable` lists the full accepted tag contents, e.g. `endslot` and
    /// `endslot title`.
    pub fn expect_end_tag(&mut self, opener: &TagToken, acceptable: &[String]) -> Result<()> {
        match self.next_token() {
            Some((Token::Block(contents), span)) => {
                let normalized = contents.split_whitespace().collect::<Vec<_>>().join(" ");
                if acceptable.iter().any(|a| *a == normalized) {
                    Ok(())
                } else {
                    Err(TemplateError::syntax_at(
                        format!(
                            "invalid block tag '{}', expected {}",
                            contents,
                            quote_list(acceptable)
                        ),
                        span,
                    ))
                }
            }
            _ => Err(opener.syntax_error(format!(
                "unclosed tag '{}'. Looking for one of: {}",
                opener.name(),
                quote_list(acceptable)
            ))),
        }
    }

    fn compile_tag(&mut self, cx: &mut CompileContext, tag: &TagToken) -> Result<Node> {
        trace!(tag = tag.name(), "compiling tag");
        match tag.name() {
            "mixin" => mixin::compile_definition(self, cx, tag),
            "mix" => mixin::compile_invocation(cx, tag),
            "component" => component::compile(self, cx, tag),
            "slot" => slots::compile_placeholder(self, cx, tag),
            "extends" => self.compile_extends(tag),
            "comment" => self.skip_comment(tag),
            // Tag libraries are built in
            "load" => Ok(Node::Comment),
            other => Err(tag.syntax_error(format!("invalid block tag '{}'", other))),
        }
    }

    fn compile_extends(&mut self, tag: &TagToken) -> Result<Node> {
        // Called with nesting already incremented for this tag
        if self.nesting > 1 {
            return Err(tag.syntax_error("'extends' cannot appear inside another tag"));
        }
        let mut bits = tag.bits()?;
        if bits.len() != 1 {
            return Err(tag.syntax_error("'extends' takes one argument"));
        }
        match bits.remove(0) {
            Spanned {
                node: Bit::Expr(expr),
                span,
            } => Ok(Node::Extends(Spanned::new(expr, span))),
            Spanned { span, .. } => Err(TemplateError::syntax_at(
                "'extends' does not take keyword arguments",
                span,
            )),
        }
    }

    fn skip_comment(&mut self, tag: &TagToken) -> Result<Node> {
        while let Some((token, _)) = self.next_token() {
            if matches!(&token, Token::Block(contents) if contents == "endcomment") {
                return Ok(Node::Comment);
            }
        }
        Err(tag.syntax_error("unclosed tag 'comment'. Looking for one of: 'endcomment'"))
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("'{}'", i))
        .collect::<Vec<_>>()
        .join(", ")
}
