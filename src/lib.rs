//! Template Mixins - reusable fragments and slot-based components for HTML templates
//!
//! This library provides a small template engine with two constructs on top:
//! `mixin`/`mix` for fragments defined once and rendered with different
//! bindings, and `component`/`slot` for rendering another template in place
//! while overriding its named slots.
//!
//! # Example
//!
//! ```rust
//! use template_mixins::{Bindings, Environment};
//!
//! let mut env = Environment::new();
//! env.add_template("card.html", "<div>{% slot body %}empty{% endslot %}</div>");
//!
//! let out = env
//!     .render_str(
//!         r#"{% component "card.html" %}{% slot body %}hi{% endslot %}{% endcomponent %}"#,
//!         Bindings::new(),
//!     )
//!     .unwrap();
//! assert_eq!(out, "<div>hi</div>");
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod parser;
pub mod renderer;
pub mod template;

pub use config::{ConfigError, EngineConfig};
pub use environment::{Environment, Template};
pub use error::{Result, TemplateError};
pub use renderer::{Bindings, Context, Value};

/// Compile and render `source` with a default environment
pub fn render(source: &str, bindings: Bindings) -> Result<String> {
    Environment::new().render_str(source, bindings)
}
