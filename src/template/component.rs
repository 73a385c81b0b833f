//! `{% component %}`: render another template in place, overriding its slots

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::environment::Template;
use crate::error::{Result, TemplateError};
use crate::parser::ast::{Bit, FilterExpr, Literal, Node, NodeList, Operand, Span, Spanned};
use crate::parser::compiler::{CompileContext, Parser, TagToken};
use crate::renderer::{Context, Value};
use crate::template::TagOptions;

/// Compiled `{% component target ... %}{% endcomponent %}`
#[derive(Debug)]
pub struct ComponentInvocation {
    /// Resolved per render; may be a variable
    target: Spanned<FilterExpr>,
    /// Direct slot tags of the body, in source order
    slots: Vec<(String, Arc<NodeList>)>,
    options: TagOptions,
}

impl ComponentInvocation {
    pub fn render_to(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let span = self.target.span.clone();
        let target = resolve_target(&self.target.node, ctx, "component")
            .map_err(|e| e.or_span(span.clone()))?;

        if target.extends().is_some() {
            return Err(TemplateError::syntax_at(
                format!(
                    "component target '{}' must not extend another template",
                    target.name().unwrap_or("<string>")
                ),
                span,
            ));
        }

        debug!(
            template = target.name().unwrap_or("<string>"),
            slots = self.slots.len(),
            isolated = self.options.isolated,
            "rendering component"
        );

        let mark = ctx
            .ensure_slot_registry()
            .register(self.slots.iter().map(|(name, nodelist)| (name.as_str(), nodelist)));

        let result = self
            .render_target(&target, ctx, out)
            .map_err(|e| e.nested(target.name()).or_span(span));

        if let Some(registry) = ctx.slot_registry_mut() {
            registry.release(mark);
        }
        result
    }

    fn render_target(&self, target: &Template, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let values = self.options.evaluate(ctx)?;
        self.options
            .apply(ctx, values, |ctx| target.render_nodes(ctx, out))
    }
}

/// Resolve the target of an `extends` or `component` tag to a compiled
/// template
///
/// Accepts a template value, a map wrapping one under `template`, or a name
/// looked up through the environment.
pub fn resolve_target(
    expr: &FilterExpr,
    ctx: &mut Context<'_>,
    tag_name: &str,
) -> Result<Arc<Template>> {
    let value = expr.resolve(ctx)?;
    if let Value::Template(template) = &value {
        return Ok(Arc::clone(template));
    }
    if let Value::Map(map) = &value {
        if let Some(Value::Template(template)) = map.get("template") {
            return Ok(Arc::clone(template));
        }
    }

    if !value.is_truthy() {
        let mut message = format!(
            "Invalid template name in '{}' tag: {}.",
            tag_name,
            quote_value(&value)
        );
        if expr.operand.is_variable() || !expr.filters.is_empty() {
            message.push_str(&format!(" Got this from the '{}' variable.", expr.token));
        }
        return Err(TemplateError::syntax(message));
    }

    match value {
        Value::String(name) | Value::Safe(name) => ctx
            .env()
            .get_template(&name)
            .map_err(|e| e.nested(Some(&name))),
        other => Err(invalid_target(expr, tag_name, &other)),
    }
}

fn invalid_target(expr: &FilterExpr, tag_name: &str, value: &Value) -> TemplateError {
    TemplateError::syntax(format!(
        "'{}' tag expects a template or template name, but '{}' resolved to {}",
        tag_name,
        expr.token,
        quote_value(value)
    ))
}

fn quote_value(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        other => format!("'{}'", other),
    }
}

/// Compile `{% component target [with k=v ...] [only] %} ... {% endcomponent %}`
pub fn compile(parser: &mut Parser<'_>, cx: &mut CompileContext, tag: &TagToken) -> Result<Node> {
    let mut bits = tag.bits()?.into_iter();
    let Some(first) = bits.next() else {
        return Err(tag.syntax_error(
            "'component' tag takes at least one argument: the name of the template to be rendered",
        ));
    };
    let target = match first.node {
        Bit::Expr(expr) => {
            let expr = relative_target(expr, cx.origin(), &first.span)?;
            Spanned::new(expr, first.span)
        }
        Bit::Kwarg { .. } => {
            return Err(TemplateError::syntax_at(
                "'component' tag expects a template name before any option",
                first.span,
            ))
        }
    };
    let options = TagOptions::parse("component", bits)?;

    let body = parser.parse_until(cx, &["endcomponent"])?;
    parser.expect_end_tag(tag, &["endcomponent".to_string()])?;

    let slots = collect_slots(&body, tag)?;
    trace!(
        component = %target.node.token,
        slots = ?slots.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
        "compiled component"
    );

    Ok(Node::Component(ComponentInvocation {
        target,
        slots,
        options,
    }))
}

/// Overrides declared directly in a component body
///
/// Only slot tags, whitespace and comments may appear at the top level.
fn collect_slots(body: &NodeList, tag: &TagToken) -> Result<Vec<(String, Arc<NodeList>)>> {
    let mut seen = HashSet::new();
    let mut slots = Vec::new();
    for node in body {
        match node {
            Node::Slot(slot) => {
                if !seen.insert(slot.name()) {
                    return Err(tag.syntax_error(format!(
                        "'slot' tag with name '{}' appears more than once in one 'component' tag",
                        slot.name()
                    )));
                }
                slots.push((slot.name().to_string(), Arc::clone(slot.nodelist())));
            }
            other if other.is_blank() => {}
            _ => return Err(tag.syntax_error("'component' only allows slots")),
        }
    }
    Ok(slots)
}

/// Rewrite a `./` or `../` string literal against the directory of `origin`
fn relative_target(expr: FilterExpr, origin: Option<&str>, span: &Span) -> Result<FilterExpr> {
    let (Some(path), Some(origin)) = (expr.as_str_literal(), origin) else {
        return Ok(expr);
    };
    if !(path.starts_with("./") || path.starts_with("../")) {
        return Ok(expr);
    }

    let origin = origin.trim_start_matches('/');
    let mut segments: Vec<&str> = origin.split('/').collect();
    // Drop the file name
    segments.pop();

    for part in path.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(TemplateError::syntax_at(
                        format!(
                            "the relative path '{}' points outside the file hierarchy that template '{}' is in",
                            path, origin
                        ),
                        span.clone(),
                    ));
                }
            }
            other => segments.push(other),
        }
    }

    let resolved = segments.join("/");
    if resolved == origin {
        return Err(TemplateError::syntax_at(
            format!(
                "the relative path '{}' was translated to template name '{}', the same template in which the tag appears",
                path, resolved
            ),
            span.clone(),
        ));
    }

    Ok(FilterExpr {
        operand: Operand::Literal(Literal::Str(resolved.clone())),
        filters: Vec::new(),
        token: format!("\"{}\"", resolved),
    })
}
