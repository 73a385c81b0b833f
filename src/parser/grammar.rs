//! Tag argument and filter-expression grammar using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{Result, TemplateError};
use crate::parser::ast::*;
use crate::parser::lexer::{lex_args, ArgToken};
use crate::renderer::is_known_filter;

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Split tag arguments into positional expressions and `key=value` pairs
///
/// `offset` is the position of `contents` inside the template source; all
/// returned spans are shifted by it.
pub fn parse_bits(contents: &str, offset: usize) -> Result<Vec<Spanned<Bit>>> {
    let tokens = lex_tokens(contents, offset)?;
    let len = contents.len();
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    let bits = bits_parser(contents)
        .parse(token_stream)
        .into_result()
        .map_err(|errs| first_error(errs, contents, offset))?;

    for bit in &bits {
        let expr = match &bit.node {
            Bit::Expr(expr) => expr,
            Bit::Kwarg { value, .. } => value,
        };
        check_filters(expr, offset + bit.span.start..offset + bit.span.end)?;
    }

    Ok(bits
        .into_iter()
        .map(|bit| Spanned::new(bit.node, offset + bit.span.start..offset + bit.span.end))
        .collect())
}

/// Parse the body of a `{{ ... }}` variable
pub fn parse_filter_expression(contents: &str, offset: usize) -> Result<Spanned<FilterExpr>> {
    if contents.trim().is_empty() {
        return Err(TemplateError::syntax_at(
            "empty variable tag",
            offset..offset + contents.len(),
        ));
    }

    let tokens = lex_tokens(contents, offset)?;
    let len = contents.len();
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    let expr = filter_expr_parser(contents)
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| first_error(errs, contents, offset))?;

    let span = offset..offset + contents.len();
    check_filters(&expr, span.clone())?;
    Ok(Spanned::new(expr, span))
}

fn lex_tokens(contents: &str, offset: usize) -> Result<Vec<(ArgToken, Span)>> {
    lex_args(contents).map_err(|span| {
        TemplateError::syntax_at(
            format!(
                "unexpected character '{}' in '{}'",
                &contents[span.clone()],
                contents
            ),
            offset + span.start..offset + span.end,
        )
    })
}

fn check_filters(expr: &FilterExpr, span: Span) -> Result<()> {
    match expr.filters.iter().find(|f| !is_known_filter(&f.name)) {
        Some(filter) => Err(TemplateError::syntax_at(
            format!("invalid filter: '{}'", filter.name),
            span,
        )),
        None => Ok(()),
    }
}

fn first_error(errs: Vec<Rich<'_, ArgToken>>, contents: &str, offset: usize) -> TemplateError {
    match errs.into_iter().next() {
        Some(err) => {
            let found = match err.found() {
                Some(tok) => format_token(tok),
                None => "end of input".to_string(),
            };
            let span = err.span().into_range();
            TemplateError::syntax_at(
                format!("could not parse '{}': unexpected {}", contents, found),
                offset + span.start..offset + span.end,
            )
        }
        None => TemplateError::syntax_at(
            format!("could not parse '{}'", contents),
            offset..offset + contents.len(),
        ),
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &ArgToken) -> String {
    match tok {
        ArgToken::Equals => "'='".to_string(),
        ArgToken::Pipe => "'|'".to_string(),
        ArgToken::Colon => "':'".to_string(),
        ArgToken::Int(n) => format!("number {}", n),
        ArgToken::Float(n) => format!("number {}", n),
        ArgToken::Str(s) => format!("string \"{}\"", s),
        ArgToken::Name(s) => format!("name '{}'", s),
    }
}

fn operand_parser<'a, I>() -> impl Parser<'a, I, Operand, extra::Err<Rich<'a, ArgToken>>> + Clone
where
    I: ValueInput<'a, Token = ArgToken, Span = SimpleSpan>,
{
    select! {
        ArgToken::Str(s) => Operand::Literal(Literal::Str(s)),
        ArgToken::Int(n) => Operand::Literal(Literal::Int(n)),
        ArgToken::Float(n) => Operand::Literal(Literal::Float(n)),
        ArgToken::Name(path) => Operand::Path(path.split('.').map(str::to_string).collect()),
    }
}

fn filter_expr_parser<'a, I>(
    src: &'a str,
) -> impl Parser<'a, I, FilterExpr, extra::Err<Rich<'a, ArgToken>>> + Clone
where
    I: ValueInput<'a, Token = ArgToken, Span = SimpleSpan>,
{
    let filter_name = select! {
        ArgToken::Name(name) => name,
    };

    // |name or |name:arg
    let filter = just(ArgToken::Pipe)
        .ignore_then(filter_name)
        .then(just(ArgToken::Colon).ignore_then(operand_parser()).or_not())
        .map(|(name, arg)| Filter { name, arg });

    operand_parser()
        .then(filter.repeated().collect::<Vec<_>>())
        .map_with(move |(operand, filters), e| FilterExpr {
            operand,
            filters,
            token: src[span_range(&e.span())].to_string(),
        })
}

fn bits_parser<'a, I>(
    src: &'a str,
) -> impl Parser<'a, I, Vec<Spanned<Bit>>, extra::Err<Rich<'a, ArgToken>>> + Clone
where
    I: ValueInput<'a, Token = ArgToken, Span = SimpleSpan>,
{
    let key = select! {
        ArgToken::Name(name) => name,
    };

    let kwarg = key
        .then_ignore(just(ArgToken::Equals))
        .then(filter_expr_parser(src))
        .map(|(key, value)| Bit::Kwarg { key, value });

    // Keyword arguments first: both start with a name
    let bit = choice((kwarg, filter_expr_parser(src).map(Bit::Expr)))
        .map_with(|bit, e| Spanned::new(bit, span_range(&e.span())));

    bit.repeated().collect::<Vec<_>>().then_ignore(end())
}
