//! JSON Pointer (RFC 6901) helpers.

use crate::error::ResolveError;

/// Escape a single reference token (`~` -> `~0`, `/` -> `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape_token`].
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Append one token to a pointer.
pub fn append(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}

/// The unescaped tokens of a pointer. The root pointer `""` has none.
pub fn tokens(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(unescape_token)
        .collect()
}

/// Convert the fragment of a `$ref` (the part after `#`) into a JSON pointer.
/// Fragments are URI-encoded, so they are percent-decoded first.
pub fn from_fragment(fragment: &str, reference: &str) -> Result<String, ResolveError> {
    let decoded = urlencoding::decode(fragment)
        .map_err(|_| ResolveError::InvalidRefFormat(reference.to_string()))?;
    if decoded.is_empty() || decoded.starts_with('/') {
        Ok(decoded.into_owned())
    } else {
        // plain-name anchors are not JSON pointers
        Err(ResolveError::InvalidRefFormat(reference.to_string()))
    }
}
