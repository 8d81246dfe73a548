//! Parser for the OData `$filter` subset produced by [`Filter::to_odata`]
//!
//! Grammar:
//!
//! ```text
//! or      := and ("or" and)*
//! and     := primary ("and" primary)*
//! primary := "(" or ")"
//!          | "startswith" "(" path "," literal ")"
//!          | path op literal
//! literal := 'string' | number | datetime'...' | true | false | null
//! ```

use super::builder::{Filter, FilterValue, Operator, PropFilter};
use crate::error::{ProxyError, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    DateTime(DateTime<Utc>),
    LParen,
    RParen,
    Comma,
}

impl Filter {
    /// Parse an OData filter clause
    pub fn parse(input: &str) -> Result<Filter> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ProxyError::invalid_filter(input, "empty filter"));
        }

        let mut parser = Parser {
            input,
            tokens,
            pos: 0,
        };
        let filter = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(format!("unexpected token {:?}", token)));
        }
        Ok(filter)
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '\'' => {
                let (s, next) = read_quoted(input, &chars, i)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '-' || chars[i] == '+')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal.parse().map_err(|_| {
                    ProxyError::invalid_filter(input, format!("invalid number '{}'", literal))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '/' | '.' | '-'))
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();

                if ident.eq_ignore_ascii_case("datetime") && chars.get(i) == Some(&'\'') {
                    let (raw, next) = read_quoted(input, &chars, i)?;
                    let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
                        ProxyError::invalid_filter(input, format!("invalid datetime '{}': {}", raw, e))
                    })?;
                    tokens.push(Token::DateTime(parsed.with_timezone(&Utc)));
                    i = next;
                } else {
                    tokens.push(Token::Ident(ident));
                }
            }
            other => {
                return Err(ProxyError::invalid_filter(
                    input,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

/// Read a single-quoted literal starting at `start`; `''` escapes a quote.
/// Returns the content and the index after the closing quote.
fn read_quoted(input: &str, chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(ProxyError::invalid_filter(input, "unterminated string")),
            Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 2;
            }
            Some('\'') => return Ok((out, i + 1)),
            Some(c) => {
                out.push(*c);
                i += 1;
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> ProxyError {
        ProxyError::invalid_filter(self.input, message)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(ref token) if *token == expected => Ok(()),
            other => Err(self.error(format!("expected {:?}, found {:?}", expected, other))),
        }
    }

    fn parse_or(&mut self) -> Result<Filter> {
        let mut children = vec![self.parse_and()?];
        while self.peek_keyword("or") {
            self.pos += 1;
            children.push(self.parse_and()?);
        }
        Ok(collapse(children, Filter::Or))
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut children = vec![self.parse_primary()?];
        while self.peek_keyword("and") {
            self.pos += 1;
            children.push(self.parse_primary()?);
        }
        Ok(collapse(children, Filter::And))
    }

    fn parse_primary(&mut self) -> Result<Filter> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name))
                if name.eq_ignore_ascii_case("startswith") && self.peek() == Some(&Token::LParen) =>
            {
                self.pos += 1;
                let path = self.parse_path()?;
                self.expect(Token::Comma)?;
                let value = self.parse_literal()?;
                self.expect(Token::RParen)?;
                Ok(Filter::Prop(PropFilter {
                    path,
                    op: Operator::StartsWith,
                    value,
                }))
            }
            Some(Token::Ident(path)) => {
                let op = match self.next() {
                    Some(Token::Ident(keyword)) => Operator::from_keyword(&keyword)
                        .ok_or_else(|| self.error(format!("unknown operator '{}'", keyword)))?,
                    other => return Err(self.error(format!("expected operator, found {:?}", other))),
                };
                let value = self.parse_literal()?;
                Ok(Filter::Prop(PropFilter { path, op, value }))
            }
            other => Err(self.error(format!("expected comparison, found {:?}", other))),
        }
    }

    fn parse_path(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Ident(path)) => Ok(path),
            other => Err(self.error(format!("expected property, found {:?}", other))),
        }
    }

    fn parse_literal(&mut self) -> Result<FilterValue> {
        match self.next() {
            Some(Token::Str(s)) => Ok(FilterValue::Str(s)),
            Some(Token::Number(n)) => Ok(FilterValue::Number(n)),
            Some(Token::DateTime(t)) => Ok(FilterValue::DateTime(t)),
            Some(Token::Ident(word)) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(FilterValue::Bool(true)),
                "false" => Ok(FilterValue::Bool(false)),
                "null" => Ok(FilterValue::Null),
                _ => Err(self.error(format!("expected literal, found '{}'", word))),
            },
            other => Err(self.error(format!("expected literal, found {:?}", other))),
        }
    }
}

fn collapse(mut children: Vec<Filter>, group: fn(Vec<Filter>) -> Filter) -> Filter {
    if children.len() == 1 {
        children.remove(0)
    } else {
        group(children)
    }
}
