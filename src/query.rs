//! Rendering of query templates into request paths.
//!
//! Placeholder values are interpolated verbatim. Nothing here quotes or
//! escapes SQL: the values are identifiers echoed back by the server, and the
//! `query2js` endpoint executes the text exactly as received.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::BindingError;
use crate::parser::{QueryTemplate, Segment};
use crate::structs::Params;

/// Endpoint that executes the `query` parameter and returns rows as JSON.
pub const QUERY_ENDPOINT: &str = "/sqlresource/query2js";

// Same set `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Row-limit clause as the `query2js` backend expects it: the JDBC escape in
/// canonical form.
pub fn limit_clause(limit: u64) -> String {
    format!("{{LIMIT {}}}", limit)
}

/// Checks that `params` names exactly the template's placeholders.
pub fn check_params(template: &QueryTemplate, params: &Params) -> Result<(), BindingError> {
    for name in template.placeholders() {
        if params.get(name).is_none() {
            return Err(BindingError::MissingPlaceholder(name.clone()));
        }
    }
    for name in params.names() {
        if !template.placeholders().iter().any(|p| p == name) {
            return Err(BindingError::UnexpectedPlaceholder(name.to_string()));
        }
    }
    Ok(())
}

fn substitute<F>(template: &QueryTemplate, params: &Params, encode: F) -> Result<String, BindingError>
where
    F: Fn(&str) -> String,
{
    check_params(template, params)?;

    let mut rendered = String::with_capacity(template.source().len());
    for segment in template.segments() {
        match segment {
            Segment::Text(text) => rendered.push_str(text),
            Segment::Placeholder(name) => {
                let value = params
                    .get(name)
                    .ok_or_else(|| BindingError::MissingPlaceholder(name.clone()))?;
                rendered.push_str(&encode(value));
            }
        }
    }
    Ok(rendered)
}

/// Renders SQL text: placeholders replaced literally, `{LIMIT n}` appended in
/// canonical form.
///
/// Values are not quoted or escaped. Callers pass server-echoed identifiers
/// only; anything user-typed must be validated before it gets here.
pub fn render_sql(template: &QueryTemplate, params: &Params) -> Result<String, BindingError> {
    let mut sql = substitute(template, params, str::to_string)?;
    if let Some(limit) = template.row_limit() {
        sql.push(' ');
        sql.push_str(&limit_clause(limit));
    }
    Ok(sql)
}

/// Renders a path template, encoding each value as a single path segment.
pub fn render_path(template: &QueryTemplate, params: &Params) -> Result<String, BindingError> {
    substitute(template, params, encode_component)
}

/// Path and query string for executing `sql` through [`QUERY_ENDPOINT`].
pub fn query_request_path(sql: &str) -> String {
    format!("{}?query={}", QUERY_ENDPOINT, encode_component(sql))
}
