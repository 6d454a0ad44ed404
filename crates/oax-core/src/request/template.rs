//! Path templates: `/pets/{id}`.

use indexmap::IndexMap;
use url::Url;

enum Part<'t> {
    Literal(&'t str),
    Variable(&'t str),
}

fn parts(template: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        if open > 0 {
            parts.push(Part::Literal(&rest[..open]));
        }
        parts.push(Part::Variable(&rest[open + 1..open + close]));
        rest = &rest[open + close + 1..];
    }
    if !rest.is_empty() {
        parts.push(Part::Literal(rest));
    }
    parts
}

/// Variable names in order of first appearance.
pub fn variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in parts(template) {
        if let Part::Variable(name) = part {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Substitute percent-encoded values. Variables without a value expand to "".
pub fn expand(template: &str, values: &IndexMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    for part in parts(template) {
        match part {
            Part::Literal(literal) => out.push_str(literal),
            Part::Variable(name) => {
                if let Some(value) = values.get(name) {
                    out.push_str(&urlencoding::encode(value));
                }
            }
        }
    }
    out
}

/// Match `path` against `template`, returning the decoded variable values.
/// A variable matches a non-empty run of characters other than `/`.
pub fn extract(template: &str, path: &str) -> Option<IndexMap<String, String>> {
    let parts = parts(template);
    let mut values = IndexMap::new();
    let mut rest = path;
    for (i, part) in parts.iter().enumerate() {
        match part {
            Part::Literal(literal) => {
                rest = rest.strip_prefix(literal)?;
            }
            Part::Variable(name) => {
                let end = match parts.get(i + 1) {
                    Some(Part::Literal(next)) => rest.find(next)?,
                    _ => rest.len(),
                };
                let raw = &rest[..end];
                if raw.is_empty() || raw.contains('/') {
                    return None;
                }
                let value = urlencoding::decode(raw).ok()?.into_owned();
                if let Some(previous) = values.get(*name) {
                    if previous != &value {
                        return None;
                    }
                }
                values.insert(name.to_string(), value);
                rest = &rest[end..];
            }
        }
    }
    rest.is_empty().then_some(values)
}

/// Concatenate a base URL and a path, collapsing the slashes between them.
/// Nothing else is normalized.
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Recover path variables from an absolute URL, given the base URL the
/// operation's path template hangs off. Query and fragment are ignored.
pub fn extract_url(base_url: &str, template: &str, url: &Url) -> Option<IndexMap<String, String>> {
    let base = Url::parse(base_url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| base_url.to_string());
    let mut target = url.clone();
    target.set_query(None);
    target.set_fragment(None);
    extract(&join(&base, template), target.as_str())
}
