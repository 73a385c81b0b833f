//! Depth-first rendering of compiled node trees

mod context;
mod value;

pub use context::{Context, RenderState};
pub use value::{Bindings, Value};

use crate::error::{Result, TemplateError};
use crate::parser::ast::{FilterExpr, Literal, Node, NodeList, Operand};
use crate::template::resolve_target;

/// Filters understood by the expression evaluator
const FILTERS: &[&str] = &["safe", "escape", "upper", "lower", "default", "length"];

pub fn is_known_filter(name: &str) -> bool {
    FILTERS.contains(&name)
}

impl NodeList {
    /// Render every node in order against `ctx`
    pub fn render(&self, ctx: &mut Context<'_>) -> Result<String> {
        let mut out = String::new();
        self.render_to(ctx, &mut out)?;
        Ok(out)
    }

    pub fn render_to(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        for node in self {
            node.render_to(ctx, out)?;
        }
        Ok(())
    }
}

impl Node {
    pub fn render_to(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Comment | Node::Mixin(_) => {}
            Node::Variable(expr) => {
                let value = expr.node.resolve(ctx).map_err(|e| e.or_span(expr.span.clone()))?;
                write_value(ctx, &value, out);
            }
            Node::Extends(parent) => {
                let template = resolve_target(&parent.node, ctx, "extends")
                    .map_err(|e| e.or_span(parent.span.clone()))?;
                template
                    .render_nodes(ctx, out)
                    .map_err(|e| e.nested(template.name()).or_span(parent.span.clone()))?;
            }
            Node::Mix(mix) => mix.render_to(ctx, out)?,
            Node::Component(component) => component.render_to(ctx, out)?,
            Node::Slot(slot) => slot.render_to(ctx, out)?,
        }
        Ok(())
    }
}

fn write_value(ctx: &Context<'_>, value: &Value, out: &mut String) {
    let config = ctx.env().config();
    match value {
        Value::None if !config.string_if_invalid.is_empty() => {
            out.push_str(&config.string_if_invalid)
        }
        Value::Safe(s) => out.push_str(s),
        other if config.autoescape => out.push_str(&escape_html(&other.to_string())),
        other => out.push_str(&other.to_string()),
    }
}

/// Escape text for inclusion in HTML
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

impl Operand {
    pub fn resolve(&self, ctx: &mut Context<'_>) -> Result<Value> {
        match self {
            Operand::Literal(Literal::Str(s)) => Ok(Value::String(s.clone())),
            Operand::Literal(Literal::Int(n)) => Ok(Value::Int(*n)),
            Operand::Literal(Literal::Float(n)) => Ok(Value::Float(*n)),
            Operand::Path(segments) => resolve_path(segments, ctx),
        }
    }
}

/// Walk a dotted lookup path; missing links resolve to `Value::None`
fn resolve_path(segments: &[String], ctx: &mut Context<'_>) -> Result<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(Value::None);
    };

    let mut current = ctx.get(head).cloned().unwrap_or_default();
    for segment in rest {
        current = match current {
            Value::Slot(slot) if segment == "super" => slot.render_super(ctx)?,
            other => other.get_attr(segment).unwrap_or_default(),
        };
    }
    Ok(current)
}

impl FilterExpr {
    /// Evaluate the operand and apply each filter in turn
    pub fn resolve(&self, ctx: &mut Context<'_>) -> Result<Value> {
        let mut value = self.operand.resolve(ctx)?;
        for filter in &self.filters {
            let arg = match &filter.arg {
                Some(arg) => Some(arg.resolve(ctx)?),
                None => None,
            };
            value = apply_filter(&filter.name, value, arg)?;
        }
        Ok(value)
    }
}

fn apply_filter(name: &str, value: Value, arg: Option<Value>) -> Result<Value> {
    let value = match name {
        "safe" => match value {
            Value::Safe(s) => Value::Safe(s),
            other => Value::Safe(other.to_string()),
        },
        "escape" => match value {
            Value::Safe(s) => Value::Safe(s),
            other => Value::Safe(escape_html(&other.to_string())),
        },
        "upper" => map_text(value, |s| s.to_uppercase()),
        "lower" => map_text(value, |s| s.to_lowercase()),
        "default" if value.is_truthy() => value,
        "default" => arg.unwrap_or_default(),
        "length" => Value::Int(value.len().unwrap_or(0) as i64),
        other => return Err(TemplateError::syntax(format!("invalid filter: '{}'", other))),
    };
    Ok(value)
}

/// Apply a text transform, preserving safeness
fn map_text(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Safe(s) => Value::Safe(f(&s)),
        other => Value::String(f(&other.to_string())),
    }
}
