//! Located values and `$ref` resolution.
//!
//! A [`Node`] is a value inside a [`Document`], addressed by JSON pointer.
//! Nothing is dereferenced implicitly: [`Node::get`] reads the direct child
//! only, while [`Node::resolve`], [`Node::deref`] and [`Node::get_resolved`]
//! follow references on request.

pub mod pointer;
pub mod registry;

use std::fmt;
use std::sync::PoisonError;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::Document;
use crate::error::{DocumentError, ResolveError};

pub use registry::DocumentRegistry;

static NULL: Value = Value::Null;

/// True for an object carrying a string `$ref`.
pub fn is_reference(value: &Value) -> bool {
    value.get("$ref").is_some_and(Value::is_string)
}

/// A node's address without a strong handle on its document. Caches living
/// inside a document store these so the document never owns itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Location {
    /// `None` when the target lives in the owning document.
    pub uri: Option<String>,
    pub pointer: String,
}

impl Location {
    pub fn of(node: &Node, owner: &Document) -> Self {
        let uri = if Document::ptr_eq(node.document(), owner) {
            None
        } else {
            node.document().uri().map(str::to_string)
        };
        Self {
            uri,
            pointer: node.pointer().to_string(),
        }
    }

    pub fn node(&self, owner: &Document) -> Result<Node, ResolveError> {
        match &self.uri {
            None => Ok(Node::new(owner.clone(), self.pointer.clone())),
            Some(uri) => owner
                .registry()
                .get(uri)
                .map(|doc| Node::new(doc, self.pointer.clone()))
                .ok_or_else(|| ResolveError::UnregisteredDocument {
                    uri: uri.clone(),
                    reference: format!("{uri}#{}", self.pointer),
                }),
        }
    }
}

/// A value inside a document.
#[derive(Clone)]
pub struct Node {
    document: Document,
    pointer: String,
}

impl Node {
    pub fn new(document: Document, pointer: impl Into<String>) -> Self {
        Self {
            document,
            pointer: pointer.into(),
        }
    }

    pub fn root(document: &Document) -> Self {
        Self::new(document.clone(), "")
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// The value at this node, or `null` when nothing is there.
    pub fn value(&self) -> &Value {
        self.document.root().pointer(&self.pointer).unwrap_or(&NULL)
    }

    pub fn exists(&self) -> bool {
        self.document.root().pointer(&self.pointer).is_some()
    }

    /// The direct child under `key`. References are not followed.
    pub fn get(&self, key: &str) -> Option<Node> {
        self.value()
            .get(key)
            .map(|_| Node::new(self.document.clone(), pointer::append(&self.pointer, key)))
    }

    pub fn index(&self, index: usize) -> Option<Node> {
        self.value().get(index).map(|_| {
            Node::new(
                self.document.clone(),
                pointer::append(&self.pointer, &index.to_string()),
            )
        })
    }

    pub fn is_reference(&self) -> bool {
        is_reference(self.value())
    }

    pub fn reference(&self) -> Option<&str> {
        self.value().get("$ref").and_then(Value::as_str)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().as_str()
    }

    /// Object members as child nodes, in document order.
    pub fn entries(&self) -> Vec<(String, Node)> {
        self.value()
            .as_object()
            .map(|object| {
                object
                    .keys()
                    .map(|key| {
                        let child =
                            Node::new(self.document.clone(), pointer::append(&self.pointer, key));
                        (key.clone(), child)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Array elements as child nodes.
    pub fn items(&self) -> Vec<Node> {
        let len = self.value().as_array().map_or(0, Vec::len);
        (0..len).filter_map(|i| self.index(i)).collect()
    }

    /// Follow this node's `$ref` one hop. `None` when it is not a reference.
    pub fn resolve(&self) -> Result<Option<Node>, ResolveError> {
        let Some(reference) = self.reference() else {
            return Ok(None);
        };

        let cached = {
            let cache = self
                .document
                .ref_cache()
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            cache.get(&self.pointer).cloned()
        };
        if let Some(location) = cached {
            if let Ok(target) = location.node(&self.document) {
                return Ok(Some(target));
            }
        }

        let (uri_part, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let target_pointer = pointer::from_fragment(fragment, reference)?;
        let target_document = if uri_part.is_empty() {
            self.document.clone()
        } else {
            let uri = registry::join_uri(self.document.uri(), uri_part)
                .map_err(|_| ResolveError::InvalidRefFormat(reference.to_string()))?;
            if self.document.uri() == Some(uri.as_str()) {
                self.document.clone()
            } else {
                self.document.registry().get(&uri).ok_or_else(|| {
                    ResolveError::UnregisteredDocument {
                        uri: uri.clone(),
                        reference: reference.to_string(),
                    }
                })?
            }
        };

        let target = Node::new(target_document, target_pointer);
        if !target.exists() {
            return Err(ResolveError::RefTargetNotFound {
                reference: reference.to_string(),
            });
        }
        log::trace!("resolved {} to {}", self.key(), target.key());

        self.document
            .ref_cache()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.pointer.clone(), Location::of(&target, &self.document));
        Ok(Some(target))
    }

    /// Follow references until reaching a node that is not one. A node that is
    /// not a reference is returned unchanged.
    pub fn deref(&self) -> Result<Node, ResolveError> {
        let mut current = self.clone();
        let mut chain = vec![current.key()];
        while let Some(next) = current.resolve()? {
            let key = next.key();
            let revisited = chain.contains(&key);
            chain.push(key);
            if revisited {
                return Err(ResolveError::CircularRef { chain });
            }
            current = next;
        }
        Ok(current)
    }

    /// The direct child under `key` if present, otherwise the child of the
    /// dereferenced target.
    pub fn get_resolved(&self, key: &str) -> Result<Option<Node>, ResolveError> {
        if let Some(child) = self.get(key) {
            return Ok(Some(child));
        }
        if !self.is_reference() {
            return Ok(None);
        }
        Ok(self.deref()?.get(key))
    }

    /// Deserialize the value at this node.
    pub fn deserialize<T: DeserializeOwned>(&self, what: &'static str) -> Result<T, DocumentError> {
        T::deserialize(self.value()).map_err(|source| DocumentError::Malformed {
            what,
            pointer: self.pointer.clone(),
            source,
        })
    }

    /// `uri#pointer`, used to name nodes in logs and cycle errors.
    pub fn key(&self) -> String {
        format!(
            "{}#{}",
            self.document.uri().unwrap_or("<anonymous>"),
            self.pointer
        )
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Document::ptr_eq(&self.document, &other.document) && self.pointer == other.pointer
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.key())
    }
}
