//! `{{.Var}}` placeholder scanning and substitution.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::RenderError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("placeholder pattern is valid")
});

/// A piece of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Var(&'a str),
}

fn tokenize(source: &str) -> Result<Vec<Segment<'_>>, RenderError> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        let start = offset + open;
        let after_open = &rest[open + 2..];
        let close = after_open
            .find("}}")
            .ok_or(RenderError::Unterminated { offset: start })?;
        let inner = &after_open[..close];
        let caps = PLACEHOLDER
            .captures(inner)
            .ok_or_else(|| RenderError::Malformed {
                offset: start,
                snippet: format!("{{{{{inner}}}}}"),
            })?;
        let name = caps.get(1).map_or("", |m| m.as_str());
        segments.push(Segment::Var(name));

        let consumed = open + 2 + close + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

/// Collect the distinct variable names referenced by `source`.
pub fn variables(source: &str) -> Result<BTreeSet<String>, RenderError> {
    Ok(tokenize(source)?
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Var(name) => Some(name.to_owned()),
            Segment::Text(_) => None,
        })
        .collect())
}

/// Deterministic stand-in for a variable nobody supplied a value for.
///
/// Address-like names get the zero address, flag-like names get `false`,
/// everything else gets `1` (valid as a Solidity integer literal and inside
/// a string literal).
pub fn dummy_value(name: &str) -> &'static str {
    const ADDRESS_HINTS: [&str; 5] = ["address", "owner", "admin", "recipient", "treasury"];

    let lower = name.to_ascii_lowercase();
    if ADDRESS_HINTS.iter().any(|hint| lower.contains(hint)) {
        "0x0000000000000000000000000000000000000000"
    } else if lower.starts_with("is") || lower.starts_with("enable") {
        "false"
    } else {
        "1"
    }
}

/// Render with an arbitrary resolver; `None` from the resolver is an
/// [`RenderError::Unresolved`].
pub fn render_with<'v, F>(source: &str, mut resolve: F) -> Result<String, RenderError>
where
    F: FnMut(&str) -> Option<&'v str>,
{
    let segments = tokenize(source)?;
    let mut out = String::with_capacity(source.len());
    for seg in segments {
        match seg {
            Segment::Text(text) => out.push_str(text),
            Segment::Var(name) => {
                let value = resolve(name).ok_or_else(|| RenderError::Unresolved {
                    name: name.to_owned(),
                })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Render `source`, resolving each variable from `values`, then `samples`,
/// then [`dummy_value`].
pub fn render(
    source: &str,
    values: &BTreeMap<String, String>,
    samples: &BTreeMap<String, String>,
) -> Result<String, RenderError> {
    render_with(source, |name| {
        values
            .get(name)
            .or_else(|| samples.get(name))
            .map(String::as_str)
            .or_else(|| Some(dummy_value(name)))
    })
}

/// Render `source` using only `values`; any missing variable is an error.
pub fn render_strict(
    source: &str,
    values: &BTreeMap<String, String>,
) -> Result<String, RenderError> {
    render_with(source, |name| values.get(name).map(String::as_str))
}
