use std::fmt;
use std::str::FromStr;

use crate::error::BindingError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    Placeholder(String),
}

/// Parameterized SQL (or path) text with `:name` placeholders and an optional
/// trailing `{LIMIT n}` marker. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    source: String,
    segments: Vec<Segment>,
    placeholders: Vec<String>,
    row_limit: Option<u64>,
}

impl QueryTemplate {
    pub fn parse(text: &str) -> Result<Self, BindingError> {
        let (body, row_limit) = split_limit_marker(text)?;
        let segments = tokenize_placeholders(body)?;

        let mut placeholders: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Placeholder(name) = segment {
                if !placeholders.contains(name) {
                    placeholders.push(name.clone());
                }
            }
        }

        Ok(QueryTemplate {
            source: text.to_string(),
            segments,
            placeholders,
            row_limit,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of first appearance, without duplicates.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn row_limit(&self) -> Option<u64> {
        self.row_limit
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for QueryTemplate {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryTemplate::parse(s)
    }
}

impl fmt::Display for QueryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

// Tracks whether the scanner is inside a `'...'` literal or a `"..."`
// delimited identifier. The other quote character is plain text inside either.
fn track_quote(open: &mut Option<char>, ch: char) {
    match *open {
        None if ch == '\'' || ch == '"' => *open = Some(ch),
        Some(quote) if quote == ch => *open = None,
        _ => {}
    }
}

fn unterminated(open: Option<char>) -> Result<(), BindingError> {
    match open {
        Some('"') => Err(BindingError::MalformedTemplate(
            "unterminated quoted identifier".to_string(),
        )),
        Some(_) => Err(BindingError::MalformedTemplate(
            "unterminated string literal".to_string(),
        )),
        None => Ok(()),
    }
}

// Finds a `{LIMIT n}` marker outside quotes. It must be the last thing in
// the template; the returned body has trailing whitespace removed.
fn split_limit_marker(text: &str) -> Result<(&str, Option<u64>), BindingError> {
    let mut open_quote = None;

    for (idx, ch) in text.char_indices() {
        match ch {
            '\'' | '"' => track_quote(&mut open_quote, ch),
            '{' if open_quote.is_none() => {
                let Some((limit, consumed)) = parse_limit_marker(&text[idx..])? else {
                    continue; // other JDBC escapes pass through as text
                };
                if !text[idx + consumed..].trim().is_empty() {
                    return Err(BindingError::MalformedTemplate(
                        "{LIMIT n} must be the last clause of the statement".to_string(),
                    ));
                }
                let body = text[..idx].trim_end();
                if body.is_empty() {
                    return Err(BindingError::MalformedTemplate(
                        "{LIMIT n} requires a statement before it".to_string(),
                    ));
                }
                return Ok((body, Some(limit)));
            }
            _ => {}
        }
    }

    unterminated(open_quote)?;
    Ok((text, None))
}

// Accepts `{ LIMIT <digits> }` with any inner whitespace and any keyword case.
// Returns the limit and the number of bytes consumed, `None` for any other
// escape.
fn parse_limit_marker(input: &str) -> Result<Option<(u64, usize)>, BindingError> {
    let Some(rest) = input.strip_prefix('{') else {
        return Ok(None);
    };
    let after_ws = rest.trim_start();
    match after_ws.get(..5) {
        Some(keyword) if keyword.eq_ignore_ascii_case("limit") => {}
        _ => return Ok(None),
    }
    let after_keyword = &after_ws[5..];
    let digits_start = after_keyword.trim_start();
    if digits_start.len() == after_keyword.len() {
        return Ok(None); // keyword must be followed by whitespace
    }
    let digit_len = digits_start
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits_start.len());
    if digit_len == 0 {
        return Ok(None);
    }
    let Some(tail) = digits_start[digit_len..].trim_start().strip_prefix('}') else {
        return Ok(None);
    };
    let digits = &digits_start[..digit_len];
    let limit = digits.parse::<u64>().map_err(|_| {
        BindingError::MalformedTemplate(format!("row limit {} is out of range", digits))
    })?;
    Ok(Some((limit, input.len() - tail.len())))
}

fn tokenize_placeholders(body: &str) -> Result<Vec<Segment>, BindingError> {
    let mut segments = Vec::new();
    let mut current_text = String::new();
    let mut open_quote = None;
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                track_quote(&mut open_quote, ch);
                current_text.push(ch);
            }
            ':' if open_quote.is_none() => {
                // `::` is a cast, never a placeholder
                if chars.peek() == Some(&':') {
                    current_text.push(ch);
                    if let Some(next) = chars.next() {
                        current_text.push(next);
                    }
                    continue;
                }
                match chars.peek() {
                    Some(&next) if is_ident_start(next) => {
                        let mut name = String::new();
                        while let Some(&c) = chars.peek() {
                            if !is_ident_char(c) {
                                break;
                            }
                            name.push(c);
                            chars.next();
                        }
                        if !current_text.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut current_text)));
                        }
                        segments.push(Segment::Placeholder(name));
                    }
                    _ => current_text.push(ch),
                }
            }
            _ => current_text.push(ch),
        }
    }

    unterminated(open_quote)?;
    if !current_text.is_empty() {
        segments.push(Segment::Text(current_text));
    }
    Ok(segments)
}
