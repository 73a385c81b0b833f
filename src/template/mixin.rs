//! `{% mixin %}` definitions and `{% mix %}` invocations
//!
//! Definitions are collected into the [`MixinTable`](super::MixinTable) of the
//! current compilation as parsing proceeds, so a mixin has to appear before
//! its first `mix`.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Result, TemplateError};
use crate::parser::ast::{Bit, Node, NodeList};
use crate::parser::compiler::{CompileContext, Parser, TagToken};
use crate::renderer::Context;
use crate::template::TagOptions;

/// Placeholder left where a `mixin` tag was defined; renders nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinDefinition {
    pub name: String,
}

/// Compiled `{% mix name [with k=v ...] [only] %}`
#[derive(Debug)]
pub struct MixinInvocation {
    name: String,
    nodelist: Arc<NodeList>,
    options: TagOptions,
}

impl MixinInvocation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &TagOptions {
        &self.options
    }

    pub fn render_to(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        trace!(mixin = %self.name, isolated = self.options.isolated, "rendering mixin");
        let values = self.options.evaluate(ctx)?;
        self.options
            .apply(ctx, values, |ctx| self.nodelist.render_to(ctx, out))
    }
}

/// Compile `{% mixin name %} ... {% endmixin [name] %}`
pub fn compile_definition(
    parser: &mut Parser<'_>,
    cx: &mut CompileContext,
    tag: &TagToken,
) -> Result<Node> {
    let words = tag.words();
    if words.len() != 2 {
        return Err(tag.syntax_error(format!("'{}' tag takes only one argument", words[0])));
    }
    let name = words[1];

    cx.mixins_mut()
        .declare(name)
        .map_err(|e| tag.syntax_error(e.to_string()))?;

    let nodelist = parser.parse_until(cx, &["endmixin"])?;
    parser.expect_end_tag(tag, &["endmixin".to_string(), format!("endmixin {}", name)])?;

    cx.mixins_mut().define(name, nodelist.shared());
    debug!(mixin = name, "registered mixin");

    Ok(Node::Mixin(MixinDefinition {
        name: name.to_string(),
    }))
}

/// Compile `{% mix name [with k=v ...] [only] %}`
pub fn compile_invocation(cx: &mut CompileContext, tag: &TagToken) -> Result<Node> {
    let mut bits = tag.bits()?.into_iter();
    let Some(first) = bits.next() else {
        return Err(tag.syntax_error(
            "'mix' tag takes at least one argument: the name of the mixin to be rendered",
        ));
    };

    let name = match &first.node {
        Bit::Expr(expr) => expr.as_word().map(str::to_string),
        _ => None,
    };
    let Some(name) = name else {
        return Err(TemplateError::syntax_at(
            "'mix' tag expects a mixin name as its first argument",
            first.span,
        ));
    };

    let Some(nodelist) = cx.mixins().get(&name).map(Arc::clone) else {
        return Err(TemplateError::syntax_at(
            format!("'mix' tag with mixin '{}' cannot be found", name),
            first.span,
        ));
    };

    let options = TagOptions::parse("mix", bits)?;

    Ok(Node::Mix(MixinInvocation {
        name,
        nodelist,
        options,
    }))
}
