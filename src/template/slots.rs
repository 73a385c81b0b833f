//! Slot overrides, placeholders and the per-render slot registry
//!
//! A component invocation pushes the slot bodies written inside it onto the
//! [`SlotRegistry`] of the current render. When the target template reaches a
//! `{% slot name %}` placeholder, the placeholder pops the newest pending
//! override for `name`, falling back to its own default body.
//!
//! ```text
//! {# page.html #}
//! {% component "card.html" %}
//!     {% slot title %}Welcome, {{ slot.super }}{% endslot %}
//! {% endcomponent %}
//!
//! {# card.html #}
//! <h1>{% slot title %}Untitled{% endslot %}</h1>
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, TemplateError};
use crate::parser::ast::{Node, NodeList};
use crate::parser::compiler::{CompileContext, Parser, TagToken};
use crate::renderer::{Bindings, Context, Value};

/// Variable under which the active slot is exposed
pub const SLOT_VARIABLE: &str = "slot";

/// Pending slot overrides of one render, newest first per name
#[derive(Debug, Default)]
pub struct SlotRegistry {
    slots: HashMap<String, Vec<Arc<NodeList>>>,
}

/// Stack depths recorded by [`SlotRegistry::register`]
///
/// Passing it back to [`SlotRegistry::release`] drops whatever the
/// registration left unconsumed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[must_use]
pub struct SlotMark {
    depths: Vec<(String, usize)>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one override per entry, returning the depths before the push
    pub fn register<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (&'a str, &'a Arc<NodeList>)>,
    ) -> SlotMark {
        let mut mark = SlotMark::default();
        for (name, nodelist) in overrides {
            mark.depths.push((name.to_string(), self.depth(name)));
            self.push(name, Arc::clone(nodelist));
        }
        trace!(count = mark.depths.len(), "registered slot overrides");
        mark
    }

    pub fn push(&mut self, name: &str, nodelist: Arc<NodeList>) {
        self.slots.entry(name.to_string()).or_default().push(nodelist);
    }

    /// Remove and return the newest pending override for `name`
    pub fn pop(&mut self, name: &str) -> Option<Arc<NodeList>> {
        self.slots.get_mut(name).and_then(Vec::pop)
    }

    /// Newest pending override for `name`, left in place
    pub fn peek(&self, name: &str) -> Option<&Arc<NodeList>> {
        self.slots.get(name).and_then(|stack| stack.last())
    }

    /// Number of pending overrides for `name`
    pub fn depth(&self, name: &str) -> usize {
        self.slots.get(name).map_or(0, Vec::len)
    }

    /// Drop overrides pushed by the registration that produced `mark` and not
    /// consumed since
    ///
    /// Overrides that were pending before the registration are kept.
    pub fn release(&mut self, mark: SlotMark) {
        for (name, depth) in mark.depths {
            if let Some(stack) = self.slots.get_mut(&name) {
                stack.truncate(depth);
            }
        }
    }

    /// Total number of pending overrides
    pub fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The value bound to `slot` while a slot body renders
///
/// Built fresh for every placeholder render; the placeholder itself is never
/// mutated. An unbound instance comes from a placeholder rendered outside any
/// component and cannot render `super`.
#[derive(Debug, Clone)]
pub struct SlotInstance {
    name: Arc<str>,
    nodelist: Arc<NodeList>,
    bound: bool,
}

impl SlotInstance {
    fn unbound(name: Arc<str>, nodelist: Arc<NodeList>) -> Self {
        Self {
            name,
            nodelist,
            bound: false,
        }
    }

    fn bound(name: Arc<str>, nodelist: Arc<NodeList>) -> Self {
        Self {
            name,
            nodelist,
            bound: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body this instance renders
    pub fn nodelist(&self) -> &Arc<NodeList> {
        &self.nodelist
    }

    /// Render the next pending override for this slot name
    ///
    /// Yields a safe string, empty when nothing is pending.
    pub fn render_super(&self, ctx: &mut Context<'_>) -> Result<Value> {
        if !self.bound {
            return Err(TemplateError::attribute(format!(
                "slot '{}' has no render context; was slot.super used outside a component?",
                self.name
            )));
        }

        let pending = ctx
            .slot_registry()
            .is_some_and(|registry| registry.peek(&self.name).is_some());
        if !pending {
            return Ok(Value::Safe(String::new()));
        }

        let mut out = String::new();
        render_bound(&self.name, &self.nodelist, ctx, &mut out)?;
        Ok(Value::Safe(out))
    }
}

/// `{% slot name %}default{% endslot %}`
#[derive(Debug)]
pub struct SlotPlaceholder {
    name: Arc<str>,
    nodelist: Arc<NodeList>,
}

impl SlotPlaceholder {
    pub fn new(name: &str, nodelist: Arc<NodeList>) -> Self {
        Self {
            name: Arc::from(name),
            nodelist,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default body, also the override body when used inside a component tag
    pub fn nodelist(&self) -> &Arc<NodeList> {
        &self.nodelist
    }

    pub fn render_to(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        if ctx.slot_registry().is_none() {
            let instance = SlotInstance::unbound(Arc::clone(&self.name), Arc::clone(&self.nodelist));
            return ctx.scoped(slot_binding(instance), |ctx| self.nodelist.render_to(ctx, out));
        }
        render_bound(&self.name, &self.nodelist, ctx, out)
    }
}

/// Pop an override for `name` (or use `fallback`) and render it in a fresh
/// scope with a bound `slot` variable
fn render_bound(
    name: &Arc<str>,
    fallback: &Arc<NodeList>,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> Result<()> {
    let popped = ctx.slot_registry_mut().and_then(|registry| registry.pop(name));
    trace!(slot = %name, overridden = popped.is_some(), "rendering slot");
    let chosen = popped.unwrap_or_else(|| Arc::clone(fallback));

    let instance = SlotInstance::bound(Arc::clone(name), Arc::clone(&chosen));
    ctx.scoped(slot_binding(instance), |ctx| chosen.render_to(ctx, out))
}

fn slot_binding(instance: SlotInstance) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert(SLOT_VARIABLE.to_string(), Value::Slot(instance));
    bindings
}

/// Compile `{% slot name %} ... {% endslot [name] %}`
pub fn compile_placeholder(
    parser: &mut Parser<'_>,
    cx: &mut CompileContext,
    tag: &TagToken,
) -> Result<Node> {
    let words = tag.words();
    if words.len() != 2 {
        return Err(tag.syntax_error(format!("'{}' tag takes only one argument", words[0])));
    }
    let name = words[1];

    let nodelist = parser.parse_until(cx, &["endslot"])?;
    parser.expect_end_tag(tag, &["endslot".to_string(), format!("endslot {}", name)])?;

    Ok(Node::Slot(SlotPlaceholder::new(name, nodelist.shared())))
}
