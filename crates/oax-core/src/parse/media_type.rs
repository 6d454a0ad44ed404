use std::fmt;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TEXT_PLAIN: &str = "text/plain";

/// Media types a structured request body can be serialized to, in order of
/// preference.
pub const SUPPORTED_REQUEST_MEDIA_TYPES: [&str; 2] = [APPLICATION_JSON, FORM_URLENCODED];

/// Content-Type sent for methods with a body when nothing was negotiated.
pub const FALLBACK_CONTENT_TYPE: &str = FORM_URLENCODED;

/// A parsed `Content-Type` value: lowercased `type/subtype` plus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    essence: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let params = parts
            .filter_map(|p| {
                let (name, value) = p.split_once('=')?;
                Some((
                    name.trim().to_ascii_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                ))
            })
            .collect();
        Self { essence, params }
    }

    /// `type/subtype`, without parameters.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn main_type(&self) -> &str {
        self.essence.split('/').next().unwrap_or_default()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `application/json` or any `+json` structured suffix.
    pub fn is_json(&self) -> bool {
        self.essence == APPLICATION_JSON || self.essence.ends_with("+json")
    }

    pub fn is_form_urlencoded(&self) -> bool {
        self.essence == FORM_URLENCODED
    }

    pub fn is_text_plain(&self) -> bool {
        self.essence == TEXT_PLAIN
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)?;
        for (name, value) in &self.params {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}

/// Pick the media type to send a structured body with.
///
/// A single candidate is used as is, whether or not a body can be serialized
/// to it. Among several, the first supported type wins; `None` means the
/// caller has to supply a raw body.
pub fn best_media_type<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
    if let [only] = candidates {
        return Some(only.as_ref().to_string());
    }
    SUPPORTED_REQUEST_MEDIA_TYPES.iter().find_map(|supported| {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|c| ContentType::parse(c).essence() == *supported)
            .map(str::to_string)
    })
}
