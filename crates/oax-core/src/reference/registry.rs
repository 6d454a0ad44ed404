use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use url::Url;

use crate::document::{Document, DocumentInner};
use crate::error::DocumentError;

/// Documents addressable by URI, for cross-document `$ref`s.
///
/// The registry holds weak handles: a document stays resolvable for as long
/// as whoever built it keeps it alive.
#[derive(Clone, Default)]
pub struct DocumentRegistry {
    documents: Arc<RwLock<HashMap<String, Weak<DocumentInner>>>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by documents that are not given one.
    pub fn global() -> &'static DocumentRegistry {
        static GLOBAL: OnceLock<DocumentRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DocumentRegistry::new)
    }

    /// Register a document under its URI, replacing any earlier registration.
    pub fn register(&self, document: &Document) -> Result<(), DocumentError> {
        let uri = document.uri().ok_or(DocumentError::MissingUri)?.to_string();
        log::debug!("registering document {uri}");
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        documents.retain(|_, doc| doc.strong_count() > 0);
        documents.insert(uri, document.downgrade());
        Ok(())
    }

    /// Look up a live document by URI. The URI is normalized first.
    pub fn get(&self, uri: &str) -> Option<Document> {
        let uri = normalize_uri(uri).ok()?;
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        documents.get(&uri).and_then(Document::upgrade)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }
}

impl fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DocumentRegistry")
            .field("documents", &documents.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Normalize an absolute URI for registry keys: scheme and host are
/// lowercased by the parser and any fragment is dropped.
pub fn normalize_uri(uri: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(uri)?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Resolve a possibly-relative URI against a base and normalize it.
pub fn join_uri(base: Option<&str>, uri: &str) -> Result<String, url::ParseError> {
    match Url::parse(uri) {
        Ok(_) => normalize_uri(uri),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or(url::ParseError::RelativeUrlWithoutBase)?;
            let mut joined = Url::parse(base)?.join(uri)?;
            joined.set_fragment(None);
            Ok(joined.to_string())
        }
        Err(e) => Err(e),
    }
}
