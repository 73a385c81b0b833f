//! `with key=value ...` and `only` options shared by `mix` and `component`

use crate::error::{Result, TemplateError};
use crate::parser::ast::{Bit, FilterExpr, Spanned};
use crate::renderer::{Bindings, Context};

/// Extra bindings and isolation flag of an invocation tag
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TagOptions {
    /// Evaluated in the calling context at render time, in source order
    pub bindings: Vec<(String, FilterExpr)>,
    /// `only`: render with just `bindings`, hiding the calling scope
    pub isolated: bool,
}

impl TagOptions {
    /// Parse the option bits that follow a tag's first argument
    ///
    /// Each option may appear once; `with` needs at least one keyword argument.
    pub fn parse(tag_name: &str, bits: impl IntoIterator<Item = Spanned<Bit>>) -> Result<Self> {
        let mut options = TagOptions::default();
        let mut seen: Vec<String> = Vec::new();
        let mut bits = bits.into_iter().peekable();

        while let Some(bit) = bits.next() {
            let option = match &bit.node {
                Bit::Expr(expr) => expr.token.clone(),
                Bit::Kwarg { key, value } => format!("{}={}", key, value.token),
            };
            if seen.contains(&option) {
                return Err(TemplateError::syntax_at(
                    format!("the '{}' option was specified more than once", option),
                    bit.span,
                ));
            }

            match option.as_str() {
                "with" => {
                    while let Some(kwarg) =
                        bits.next_if(|b| matches!(b.node, Bit::Kwarg { .. }))
                    {
                        let Bit::Kwarg { key, value } = kwarg.node else {
                            continue;
                        };
                        if key.contains('.') {
                            return Err(TemplateError::syntax_at(
                                format!("invalid keyword argument name '{}'", key),
                                kwarg.span,
                            ));
                        }
                        options.bindings.push((key, value));
                    }
                    if options.bindings.is_empty() {
                        return Err(TemplateError::syntax_at(
                            format!(
                                "\"with\" in '{}' tag needs at least one keyword argument",
                                tag_name
                            ),
                            bit.span,
                        ));
                    }
                }
                "only" => options.isolated = true,
                _ => {
                    return Err(TemplateError::syntax_at(
                        format!("unknown argument for '{}' tag: '{}'", tag_name, option),
                        bit.span,
                    ))
                }
            }
            seen.push(option);
        }

        Ok(options)
    }

    /// Evaluate every binding against the calling context
    pub fn evaluate(&self, ctx: &mut Context<'_>) -> Result<Bindings> {
        let mut values = Bindings::new();
        for (name, expr) in &self.bindings {
            values.insert(name.clone(), expr.resolve(ctx)?);
        }
        Ok(values)
    }

    /// Render `f` with the evaluated bindings, isolated or layered on top of
    /// the calling scope
    pub fn apply<'env, T>(
        &self,
        ctx: &mut Context<'env>,
        values: Bindings,
        f: impl FnOnce(&mut Context<'env>) -> Result<T>,
    ) -> Result<T> {
        if self.isolated {
            ctx.isolated(values, f)
        } else {
            ctx.scoped(values, f)
        }
    }
}
