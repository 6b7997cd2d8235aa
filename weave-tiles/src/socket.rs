//! Socket definitions and the compatibility lookup between them.

use crate::CatalogError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved name of the empty socket. It needs no definition; by default it
/// is compatible only with itself.
pub const EMPTY_SOCKET: &str = "empty";

/// A named compatibility tag carried by one face of a tile.
///
/// Two facing sockets are compatible when either side lists the other in its
/// `compatible` set. `allow_empty` relaxes the empty-socket rule for this
/// socket: a face carrying it may also sit against an empty face.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SocketDefinition {
    pub name: String,
    pub compatible: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_empty: bool,
}

impl SocketDefinition {
    pub fn new(name: impl Into<String>, compatible: Vec<String>) -> Self {
        Self {
            name: name.into(),
            compatible,
            allow_empty: false,
        }
    }

    /// True if this definition lists `other` as compatible.
    pub fn lists(&self, other: &str) -> bool {
        self.compatible.iter().any(|c| c == other)
    }
}

/// The set of socket definitions referenced by a tile catalog, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SocketSet {
    definitions: HashMap<String, SocketDefinition>,
}

impl SocketSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, rejecting duplicate names.
    pub fn insert(&mut self, definition: SocketDefinition) -> Result<(), CatalogError> {
        if definition.name == EMPTY_SOCKET {
            // The empty socket is built in; an explicit definition would
            // shadow the reserved matching rule.
            return Err(CatalogError::DuplicateSocket(definition.name));
        }
        if self.definitions.contains_key(&definition.name) {
            return Err(CatalogError::DuplicateSocket(definition.name));
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SocketDefinition> {
        self.definitions.get(name)
    }

    /// True if `name` is the empty socket or has a definition.
    pub fn contains(&self, name: &str) -> bool {
        name == EMPTY_SOCKET || self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketDefinition> {
        self.definitions.values()
    }

    /// Checks whether two facing sockets may sit against each other.
    ///
    /// Empty faces match empty faces. A named socket with `allow_empty` also
    /// accepts an empty face. Otherwise the lookup is bidirectional: it is
    /// enough for either definition to list the other name, so asymmetric
    /// authoring still connects.
    pub fn compatible(&self, a: &str, b: &str) -> bool {
        match (a == EMPTY_SOCKET, b == EMPTY_SOCKET) {
            (true, true) => true,
            (true, false) => self.get(b).is_some_and(|def| def.allow_empty),
            (false, true) => self.get(a).is_some_and(|def| def.allow_empty),
            (false, false) => {
                let a_lists_b = self.get(a).is_some_and(|def| def.lists(b));
                let b_lists_a = self.get(b).is_some_and(|def| def.lists(a));
                a_lists_b || b_lists_a
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket(name: &str, compatible: &[&str]) -> SocketDefinition {
        SocketDefinition::new(name, compatible.iter().map(|s| (*s).to_owned()).collect())
    }

    #[test]
    fn test_empty_matches_only_empty() {
        let mut set = SocketSet::new();
        set.insert(socket("grass", &["grass"])).unwrap();
        assert!(set.compatible(EMPTY_SOCKET, EMPTY_SOCKET));
        assert!(!set.compatible("grass", EMPTY_SOCKET));
        assert!(!set.compatible(EMPTY_SOCKET, "grass"));
    }

    #[test]
    fn test_allow_empty_relaxes_empty_rule() {
        let mut set = SocketSet::new();
        let mut def = socket("ledge", &["ledge"]);
        def.allow_empty = true;
        set.insert(def).unwrap();
        assert!(set.compatible("ledge", EMPTY_SOCKET));
        assert!(set.compatible(EMPTY_SOCKET, "ledge"));
    }

    #[test]
    fn test_bidirectional_lookup() {
        let mut set = SocketSet::new();
        // Asymmetric authoring: only grass lists dirt.
        set.insert(socket("grass", &["dirt"])).unwrap();
        set.insert(socket("dirt", &[])).unwrap();
        assert!(set.compatible("grass", "dirt"));
        assert!(set.compatible("dirt", "grass"));
        assert!(!set.compatible("dirt", "dirt"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = SocketSet::new();
        set.insert(socket("grass", &[])).unwrap();
        let err = set.insert(socket("grass", &[])).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateSocket("grass".to_owned()));
    }

    #[test]
    fn test_empty_name_reserved() {
        let mut set = SocketSet::new();
        assert!(set.insert(socket(EMPTY_SOCKET, &[])).is_err());
    }

    #[test]
    fn test_unknown_sockets_incompatible() {
        let set = SocketSet::new();
        assert!(!set.compatible("grass", "dirt"));
    }
}
