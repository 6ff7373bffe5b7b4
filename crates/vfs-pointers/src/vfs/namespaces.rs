//! Protocol lookup for the namespaces a registry can track pointers in.

use std::sync::Arc;

use fnv::FnvHashMap;
use serde::Serialize;

use super::file::{Namespace, NamespaceKind};
use crate::error::{PointerError, Result};

/// Which of the two tries a namespace's pointers live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrieFamily {
    Persistent,
    Ephemeral,
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    by_protocol: FnvHashMap<String, Arc<dyn Namespace>>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `namespace`, returning the one it replaced.
    ///
    /// Archive namespaces need their host namespace registered first.
    pub fn register(&mut self, namespace: Arc<dyn Namespace>) -> Result<Option<Arc<dyn Namespace>>> {
        if namespace.kind() == NamespaceKind::Archive {
            let host = namespace.host_protocol().ok_or_else(|| {
                PointerError::UnknownNamespace(format!(
                    "archive namespace {} has no host protocol",
                    namespace.protocol()
                ))
            })?;
            match self.by_protocol.get(host) {
                Some(host_ns) if host_ns.kind() != NamespaceKind::Archive => {}
                _ => {
                    return Err(PointerError::UnknownNamespace(format!(
                        "host namespace {host} of {} is not registered",
                        namespace.protocol()
                    )))
                }
            }
        }
        Ok(self
            .by_protocol
            .insert(namespace.protocol().to_string(), namespace))
    }

    #[inline]
    pub fn get(&self, protocol: &str) -> Option<&Arc<dyn Namespace>> {
        self.by_protocol.get(protocol)
    }

    pub fn contains(&self, protocol: &str) -> bool {
        self.by_protocol.contains_key(protocol)
    }

    /// Protocol whose root directory anchors paths of `protocol`.
    pub fn root_protocol<'a>(&'a self, protocol: &'a str) -> Option<&'a str> {
        let namespace = self.get(protocol)?;
        match namespace.kind() {
            NamespaceKind::Archive => namespace.host_protocol(),
            _ => Some(protocol),
        }
    }

    pub fn family_of(&self, protocol: &str) -> Option<TrieFamily> {
        let root = self.get(self.root_protocol(protocol)?)?;
        match root.kind() {
            NamespaceKind::Ephemeral => Some(TrieFamily::Ephemeral),
            NamespaceKind::Persistent | NamespaceKind::Archive => Some(TrieFamily::Persistent),
        }
    }

    pub fn is_archive(&self, protocol: &str) -> bool {
        self.get(protocol)
            .is_some_and(|namespace| namespace.kind() == NamespaceKind::Archive)
    }

    /// Case rule for unresolved directories of `protocol`.
    pub fn default_case_sensitive(&self, protocol: &str) -> bool {
        self.get(protocol)
            .map_or(true, |namespace| namespace.is_case_sensitive())
    }

    pub fn len(&self) -> usize {
        self.by_protocol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_protocol.is_empty()
    }
}
