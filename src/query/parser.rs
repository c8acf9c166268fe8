//! Tokenizer and parser for the wire query grammar.
//!
//! The tokenizer is a single left-to-right scan tracking paren depth, whether
//! it is inside a `[...]` date range, and whether it is inside a field value.
//! Field values may contain spaces: on whitespace inside a value the next word
//! is peeked, and the value only ends if that word is an operator keyword,
//! starts another `field:` term, or a parenthesis or the end of input follows.

use chrono::{DateTime, NaiveDate, Utc};

use super::builder::Query;
use super::node::{DateField, Field, Operator};

/// Errors produced while parsing a wire query string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid timestamp (expected YYYYMMDDhhmm): {0}")]
    InvalidTimestamp(String),

    #[error("Invalid date range format: {0}")]
    InvalidDateRange(String),

    #[error("Unterminated bracket in: {0}")]
    UnterminatedBracket(String),

    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid percent-encoding in: {0}")]
    InvalidEncoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
}

/// Parse a wire query string.
///
/// An empty string parses to an empty query.
pub fn parse(input: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    parse_sequence(&tokens, &mut pos, false)
}

/// Check whether a string is a well-formed query
pub fn is_valid_query(input: &str) -> bool {
    parse(input).is_ok()
}

struct Lexer {
    tokens: Vec<Token>,
    current: String,
    in_value: bool,
}

impl Lexer {
    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.tokens.push(Token::Word(std::mem::take(&mut self.current)));
        }
        self.in_value = false;
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut lexer = Lexer {
        tokens: Vec::new(),
        current: String::new(),
        in_value: false,
    };
    let mut depth = 0usize;
    let mut in_bracket = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_bracket {
            lexer.current.push(ch);
            if ch == ']' {
                in_bracket = false;
            }
            continue;
        }

        match ch {
            '(' => {
                lexer.flush();
                depth += 1;
                lexer.tokens.push(Token::Open);
            }
            ')' => {
                if depth == 0 {
                    return Err(ParseError::UnbalancedParens);
                }
                lexer.flush();
                depth -= 1;
                lexer.tokens.push(Token::Close);
            }
            '[' => {
                in_bracket = true;
                lexer.current.push(ch);
            }
            ':' => {
                lexer.current.push(ch);
                lexer.in_value = true;
            }
            c if c.is_whitespace() => {
                if lexer.in_value && !value_ends_before(&chars, i + 1) {
                    lexer.current.push(c);
                } else {
                    lexer.flush();
                }
            }
            c => lexer.current.push(c),
        }
    }

    if in_bracket {
        return Err(ParseError::UnterminatedBracket(lexer.current));
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedParens);
    }
    lexer.flush();

    Ok(lexer.tokens)
}

/// Lookahead from `from`: does the current field value end here?
fn value_ends_before(chars: &[char], from: usize) -> bool {
    let mut i = from;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= chars.len() || chars[i] == '(' || chars[i] == ')' {
        return true;
    }

    let start = i;
    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
        i += 1;
    }
    let word: String = chars[start..i].iter().collect();

    Operator::from_keyword(&word).is_some() || word.contains(':')
}

fn parse_sequence(tokens: &[Token], pos: &mut usize, nested: bool) -> Result<Query, ParseError> {
    let mut query = Query::new();

    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        match token {
            Token::Open => {
                let group = parse_sequence(tokens, pos, true)?;
                query.push_group(group);
            }
            Token::Close if nested => return Ok(query),
            Token::Close => return Err(ParseError::UnbalancedParens),
            Token::Word(word) => query = classify(query, word)?,
        }
    }

    if nested {
        Err(ParseError::UnbalancedParens)
    } else {
        Ok(query)
    }
}

fn classify(query: Query, word: &str) -> Result<Query, ParseError> {
    if let Some(op) = Operator::from_keyword(word) {
        return Ok(query.operator(op));
    }

    let (name, raw) = word
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedToken(word.to_string()))?;
    if name.is_empty() {
        return Err(ParseError::MalformedToken(word.to_string()));
    }

    if let Some(field) = DateField::from_name(name) {
        let (start, end) = parse_date_range(raw)?;
        return Ok(query.date_range(field, start, end));
    }

    let field: Field = name.parse()?;
    let value = urlencoding::decode(raw)
        .map_err(|_| ParseError::InvalidEncoding(raw.to_string()))?;

    Ok(query.term(field, value.into_owned()))
}

fn parse_date_range(raw: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), ParseError> {
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ParseError::InvalidDateRange(raw.to_string()))?;

    let (start, end) = inner
        .split_once(" TO ")
        .ok_or_else(|| ParseError::InvalidDateRange(raw.to_string()))?;

    Ok((parse_timestamp(start.trim())?, parse_timestamp(end.trim())?))
}

/// Parse a fixed 12-digit `YYYYMMDDhhmm` UTC timestamp
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    let invalid = || ParseError::InvalidTimestamp(s.to_string());

    if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let num = |range: std::ops::Range<usize>| s[range].parse::<u32>().map_err(|_| invalid());
    let year = num(0..4)? as i32;

    NaiveDate::from_ymd_opt(year, num(4..6)?, num(6..8)?)
        .and_then(|date| date.and_hms_opt(num(8..10).ok()?, num(10..12).ok()?, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(invalid)
}
