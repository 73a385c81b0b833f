//! Template lookup and compilation

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Result, TemplateError};
use crate::parser::ast::{FilterExpr, Node, NodeList};
use crate::parser::compiler::{CompileContext, Parser};
use crate::renderer::{Bindings, Context};

/// A compiled template
///
/// Immutable once compiled; share it behind an `Arc` between renders.
pub struct Template {
    name: Option<String>,
    nodes: NodeList,
}

impl Template {
    /// Compile `source`, resolving relative component paths against `name`
    pub fn compile(name: Option<&str>, source: &str) -> Result<Self> {
        let mut cx = CompileContext::new(name);
        let nodes = Parser::new(source).parse(&mut cx)?;

        let mut seen_content = false;
        for node in &nodes {
            if let Node::Extends(parent) = node {
                if seen_content {
                    return Err(TemplateError::syntax_at(
                        "'extends' must be the first tag in the template",
                        parent.span.clone(),
                    ));
                }
            }
            if !node.is_blank() {
                seen_content = true;
            }
        }

        debug!(
            template = name.unwrap_or("<string>"),
            mixins = cx.mixins().len(),
            "compiled template"
        );
        Ok(Self {
            name: name.map(str::to_string),
            nodes,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    /// Parent expression of the template's `extends` tag, if it has one
    pub fn extends(&self) -> Option<&FilterExpr> {
        self.nodes.iter().find_map(|node| match node {
            Node::Extends(parent) => Some(&parent.node),
            _ => None,
        })
    }

    /// Render with a fresh context holding `bindings`
    pub fn render(&self, env: &Environment, bindings: Bindings) -> Result<String> {
        let mut ctx = Context::new(env, bindings);
        let mut out = String::new();
        self.render_nodes(&mut ctx, &mut out)?;
        Ok(out)
    }

    /// Render into an existing context
    ///
    /// A template that extends another renders only its parent, in the same
    /// context.
    pub fn render_nodes(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        ctx.with_template(self.name(), |ctx| {
            let extends = self
                .nodes
                .iter()
                .find(|node| matches!(node, Node::Extends(_)));
            match extends {
                Some(node) => node.render_to(ctx, out),
                None => self.nodes.render_to(ctx, out),
            }
        })
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// Template sources and engine settings
///
/// Templates are looked up among the sources added with
/// [`add_template`](Self::add_template) first, then in the configured
/// directories. Every lookup compiles afresh.
#[derive(Debug, Default)]
pub struct Environment {
    config: EngineConfig,
    templates: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            templates: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an inline template source under `name`
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    /// Find and compile the template called `name`
    pub fn get_template(&self, name: &str) -> Result<Arc<Template>> {
        if let Some(source) = self.templates.get(name) {
            debug!(template = name, "loading inline template");
            return Template::compile(Some(name), source).map(Arc::new);
        }

        for dir in &self.config.template_dirs {
            let Some(path) = template_path(dir, name) else {
                debug!(template = name, "template name escapes the template directories");
                break;
            };
            if !path.is_file() {
                continue;
            }
            debug!(template = name, path = %path.display(), "loading template file");
            let source = read_source(&path)?;
            return Template::compile(Some(name), &source).map(Arc::new);
        }

        Err(TemplateError::NotFound {
            name: name.to_string(),
        })
    }

    /// Compile an anonymous template
    pub fn template_from_str(&self, source: &str) -> Result<Template> {
        Template::compile(None, source)
    }

    /// Look up `name` and render it with `bindings`
    pub fn render(&self, name: &str, bindings: Bindings) -> Result<String> {
        self.get_template(name)?.render(self, bindings)
    }

    /// Compile and render an anonymous template
    pub fn render_str(&self, source: &str, bindings: Bindings) -> Result<String> {
        self.template_from_str(source)?.render(self, bindings)
    }
}

/// Join `name` onto `dir` unless it would leave `dir`
///
/// Absolute names and `..` segments climbing above `dir` give `None`.
fn template_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.into_iter().fold(dir.to_path_buf(), |path, part| path.join(part)))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
