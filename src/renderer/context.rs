//! Render context: scoped variable bindings plus per-render state
//!
//! A [`Context`] lives for exactly one top-level render. Everything the
//! component machinery needs to share between nested invocations is kept in
//! its [`RenderState`], so two renders never observe each other.

use crate::environment::Environment;
use crate::error::{Result, TemplateError};
use crate::renderer::value::{Bindings, Value};
use crate::template::SlotRegistry;

/// State shared by every node rendered during one top-level render
#[derive(Debug, Default)]
pub struct RenderState {
    /// Created by the first component invocation of the render
    slots: Option<SlotRegistry>,
    /// Number of templates currently rendering inside each other
    depth: usize,
}

impl RenderState {
    pub fn slot_registry(&self) -> Option<&SlotRegistry> {
        self.slots.as_ref()
    }

    pub fn slot_registry_mut(&mut self) -> Option<&mut SlotRegistry> {
        self.slots.as_mut()
    }

    pub fn ensure_slot_registry(&mut self) -> &mut SlotRegistry {
        self.slots.get_or_insert_with(SlotRegistry::new)
    }

    pub fn template_depth(&self) -> usize {
        self.depth
    }
}

/// Variable scopes and render state for one render call
#[derive(Debug)]
pub struct Context<'env> {
    env: &'env Environment,
    scopes: Vec<Bindings>,
    state: RenderState,
}

impl<'env> Context<'env> {
    /// Create a context whose outermost scope holds `globals`
    pub fn new(env: &'env Environment, globals: Bindings) -> Self {
        Self {
            env,
            scopes: vec![globals],
            state: RenderState::default(),
        }
    }

    pub fn env(&self) -> &'env Environment {
        self.env
    }

    /// Look a variable up, innermost scope first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn push(&mut self, bindings: Bindings) {
        self.scopes.push(bindings);
    }

    /// Remove the innermost scope; the outermost scope is never removed
    pub fn pop(&mut self) -> Option<Bindings> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Run `f` with `bindings` pushed as a new scope
    ///
    /// The scope is popped again whether or not `f` fails.
    pub fn scoped<T>(
        &mut self,
        bindings: Bindings,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let depth = self.scopes.len();
        self.push(bindings);
        let result = f(self);
        self.scopes.truncate(depth);
        result
    }

    /// Run `f` against a scope stack holding only `bindings`
    ///
    /// The calling scopes are invisible inside `f`; render state (and with it
    /// the slot registry) stays shared.
    pub fn isolated<T>(
        &mut self,
        bindings: Bindings,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.scopes, vec![bindings]);
        let result = f(self);
        self.scopes = saved;
        result
    }

    /// Run `f` one template deeper
    ///
    /// Fails with `name` once the depth reaches the configured recursion
    /// limit.
    pub fn with_template<T>(
        &mut self,
        name: Option<&str>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let limit = self.env.config().recursion_limit;
        if self.state.depth >= limit {
            return Err(TemplateError::RecursionLimit {
                limit,
                template: name.unwrap_or("<string>").to_string(),
            });
        }
        self.state.depth += 1;
        let result = f(self);
        self.state.depth -= 1;
        result
    }

    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    pub fn slot_registry(&self) -> Option<&SlotRegistry> {
        self.state.slot_registry()
    }

    pub fn slot_registry_mut(&mut self) -> Option<&mut SlotRegistry> {
        self.state.slot_registry_mut()
    }

    pub fn ensure_slot_registry(&mut self) -> &mut SlotRegistry {
        self.state.ensure_slot_registry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_scoped_shadows_and_restores() {
        let env = Environment::new();
        let mut ctx = Context::new(&env, bindings(&[("name", "outer")]));

        let inner = ctx
            .scoped(bindings(&[("name", "inner")]), |ctx| {
                Ok(ctx.get("name").map(|v| v.to_string()))
            })
            .expect("Should render");

        assert_eq!(inner.as_deref(), Some("inner"));
        assert_eq!(ctx.get("name").map(|v| v.to_string()).as_deref(), Some("outer"));
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_scoped_pops_on_error() {
        let env = Environment::new();
        let mut ctx = Context::new(&env, Bindings::new());

        let result: Result<()> = ctx.scoped(bindings(&[("a", "1")]), |ctx| {
            ctx.push(bindings(&[("b", "2")]));
            Err(TemplateError::syntax("boom"))
        });

        assert!(result.is_err());
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.get("a").is_none());
    }

    #[test]
    fn test_isolated_hides_calling_scope() {
        let env = Environment::new();
        let mut ctx = Context::new(&env, bindings(&[("secret", "x")]));

        let seen = ctx
            .isolated(bindings(&[("visible", "y")]), |ctx| {
                Ok((ctx.get("secret").is_some(), ctx.get("visible").is_some()))
            })
            .expect("Should render");

        assert_eq!(seen, (false, true));
        assert!(ctx.get("secret").is_some());
        assert!(ctx.get("visible").is_none());
    }

    #[test]
    fn test_isolated_shares_slot_registry() {
        let env = Environment::new();
        let mut ctx = Context::new(&env, Bindings::new());
        ctx.ensure_slot_registry();

        let has_registry = ctx
            .isolated(Bindings::new(), |ctx| Ok(ctx.slot_registry().is_some()))
            .expect("Should render");
        assert!(has_registry);
    }

    #[test]
    fn test_outermost_scope_is_never_popped() {
        let env = Environment::new();
        let mut ctx = Context::new(&env, Bindings::new());
        assert!(ctx.pop().is_none());
        ctx.push(Bindings::new());
        assert!(ctx.pop().is_some());
    }

    #[test]
    fn test_template_depth_respects_limit() {
        let env = Environment::with_config(crate::EngineConfig::default().with_recursion_limit(2));
        let mut ctx = Context::new(&env, Bindings::new());

        let result = ctx.with_template(Some("a"), |ctx| {
            ctx.with_template(Some("b"), |ctx| ctx.with_template(Some("c"), |_| Ok(())))
        });

        assert!(matches!(result, Err(TemplateError::RecursionLimit { limit: 2, .. })));
        assert_eq!(ctx.render_state().template_depth(), 0);
    }
}
