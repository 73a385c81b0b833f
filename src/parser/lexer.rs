//! Lexers for template source and tag contents using logos
//!
//! Lexing happens at two levels. [`Token`] splits raw template source into
//! text, `{{ variable }}`, `{% tag %}` and `{# comment #}` tokens. [`ArgToken`]
//! then tokenizes the inside of a variable or tag for the argument grammar.

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Strip the two-character delimiters from a tag-like slice and trim it
fn inner(slice: &str) -> String {
    slice[2..slice.len() - 2].trim().to_string()
}

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// `{% ... %}` with the delimiters stripped
    #[regex(r"\{%([^%]|%[^}])*%\}", |lex| inner(lex.slice()))]
    Block(String),

    /// `{{ ... }}` with the delimiters stripped
    #[regex(r"\{\{([^}]|\}[^}])*\}\}", |lex| inner(lex.slice()))]
    Variable(String),

    #[regex(r"\{#([^#]|#[^}])*#\}")]
    Comment,

    // A lone brace that does not open a tag is plain text
    #[regex(r"[^{]+", |lex| lex.slice().to_string())]
    #[token("{", |lex| lex.slice().to_string())]
    Text(String),
}

/// Tokenize template source, merging adjacent text runs
pub fn lex(input: &str) -> Vec<(Token, Span)> {
    let mut tokens: Vec<(Token, Span)> = Vec::new();

    for (tok, span) in Token::lexer(input).spanned() {
        let tok = tok.unwrap_or_else(|_| Token::Text(input[span.clone()].to_string()));
        if let Token::Text(text) = &tok {
            if let Some((Token::Text(prev), prev_span)) = tokens.last_mut() {
                prev.push_str(text);
                prev_span.end = span.end;
                continue;
            }
        }
        tokens.push((tok, span));
    }

    tokens
}

fn unquote(slice: &str) -> String {
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Tokens inside a `{{ }}` or `{% %}` body
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum ArgToken {
    #[token("=")]
    Equals,
    #[token("|")]
    Pipe,
    #[token(":")]
    Colon,

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),

    /// Identifier or dotted lookup path such as `slot.super` or `items.0`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z0-9_]+)*", |lex| lex.slice().to_string())]
    Name(String),
}

/// Tokenize the body of a tag or variable
///
/// Unrecognized input is reported as the byte range it occupies.
pub fn lex_args(input: &str) -> Result<Vec<(ArgToken, Span)>, Span> {
    ArgToken::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(tok) => Ok((tok, span)),
            Err(()) => Err(span),
        })
        .collect()
}
