//! Error types for template compilation and rendering

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Errors raised while compiling or rendering a template
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Structural problem in the template, or an invalid component target
    #[error("syntax error: {message}")]
    Syntax { message: String, span: Option<Span> },

    /// Attribute access that is not available on the value
    #[error("attribute error: {message}")]
    Attribute { message: String },

    /// Template lookup failed
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Too many templates rendering inside each other
    #[error("recursion limit of {limit} exceeded while rendering '{template}'")]
    RecursionLimit { limit: usize, template: String },

    /// Template file could not be read
    #[error("error reading template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TemplateError>;

impl TemplateError {
    /// Create a syntax error without source location
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            span: None,
        }
    }

    /// Create a syntax error pointing at a range of the template source
    pub fn syntax_at(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn attribute(message: impl Into<String>) -> Self {
        Self::Attribute {
            message: message.into(),
        }
    }

    /// Attach a span to a syntax error that does not carry one yet
    pub fn or_span(self, span: Span) -> Self {
        match self {
            Self::Syntax {
                message,
                span: None,
            } => Self::Syntax {
                message,
                span: Some(span),
            },
            other => other,
        }
    }

    /// Re-anchor a syntax error raised inside another template
    ///
    /// Its span indexes that template's source, so it is dropped and the
    /// template name moves into the message. The caller then attaches the
    /// span of its own tag with [`or_span`](Self::or_span).
    pub fn nested(self, template: Option<&str>) -> Self {
        match self {
            Self::Syntax { message, .. } => Self::Syntax {
                message: format!(
                    "while rendering '{}': {}",
                    template.unwrap_or("<string>"),
                    message
                ),
                span: None,
            },
            other => other,
        }
    }

    /// Source range the error points at, if any
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Syntax { span, .. } => span.as_ref(),
            _ => None,
        }
    }

    /// Whether this is a compile-time/structural error
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    /// Format the error with source context using ariadne
    ///
    /// Errors without a span, or with one outside `source`, fall back to
    /// their `Display` output.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let (message, span) = match self {
            Self::Syntax {
                message,
                span: Some(span),
            } if span.end <= source.len() => (message, span),
            other => return other.to_string(),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(message)
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
