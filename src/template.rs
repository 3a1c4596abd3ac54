//! Message templates with embedded path-descent directives.
//!
//! A template is scanned left to right into literal text, argument placeholders and descent
//! directives. Each descent consumes the next argument as a child name: text accumulated so far
//! is emitted as a record at the current node, then the cursor moves one level deeper.
//!
//! | Directive | Meaning |
//! |-----------|---------|
//! | `%%` | literal `%` |
//! | `%` + ASCII letter (`%s`, `%d`, ...) | next argument, rendered with `Display` |
//! | [`DESCEND`] (`%0@`) | next argument names the child to descend into |
//!
//! Any other `%` is kept verbatim.

use std::fmt::{self, Write as _};

/// Reserved descent directive. `@` is never a printf conversion, so this cannot prefix one.
pub const DESCEND: &str = "%0@";

/// One lexical element of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Text copied as-is.
    Literal(String),
    /// Substitutes the next argument.
    Placeholder,
    /// Consumes the next argument as a child name.
    Descend,
}

/// Instruction produced by rendering a template against its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Record a message at the current node.
    Emit(String),
    /// Move the cursor into the named child, creating it if needed.
    Descend(String),
}

/// Split `template` into tokens.
pub fn parse(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            literal.push(ch);
            continue;
        }

        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                literal.push('%');
            }
            Some('0') => {
                let mut lookahead = chars.clone();
                lookahead.next();
                if lookahead.peek() == Some(&'@') {
                    chars.next();
                    chars.next();
                    flush_literal(&mut tokens, &mut literal);
                    tokens.push(Token::Descend);
                } else {
                    literal.push('%');
                }
            }
            Some(next) if next.is_ascii_alphabetic() => {
                chars.next();
                flush_literal(&mut tokens, &mut literal);
                tokens.push(Token::Placeholder);
            }
            _ => literal.push('%'),
        }
    }

    flush_literal(&mut tokens, &mut literal);
    tokens
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

/// Render parsed tokens into emit/descend steps.
///
/// Missing arguments render as nothing; a descent without an argument is ignored. The result
/// always holds at least one [`Step::Emit`]: when the template leaves no text to emit, an empty
/// message is recorded at the final node.
pub fn render(tokens: &[Token], args: &[&dyn fmt::Display]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut buffer = String::new();
    let mut args = args.iter();

    for token in tokens {
        match token {
            Token::Literal(text) => buffer.push_str(text),
            Token::Placeholder => {
                if let Some(arg) = args.next() {
                    let _ = write!(buffer, "{arg}");
                }
            }
            Token::Descend => {
                let Some(arg) = args.next() else {
                    continue;
                };
                if !buffer.is_empty() {
                    steps.push(Step::Emit(std::mem::take(&mut buffer)));
                }
                steps.push(Step::Descend(arg.to_string()));
            }
        }
    }

    let emitted = steps.iter().any(|step| matches!(step, Step::Emit(_)));
    if !buffer.is_empty() || !emitted {
        steps.push(Step::Emit(buffer));
    }
    steps
}

/// Parse and render in one go.
pub fn expand(template: &str, args: &[&dyn fmt::Display]) -> Vec<Step> {
    render(&parse(template), args)
}
