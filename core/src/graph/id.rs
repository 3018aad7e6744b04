use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a node owned by a [`DependencyGraph`](super::DependencyGraph).
/// Wraps a Uuid so ids stay stable across JSON snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a new random NodeId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derive an ID from a node name, so that the same model file
    /// always yields the same ids.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_ids_are_deterministic() {
        assert_eq!(NodeId::from_name("mass"), NodeId::from_name("mass"));
        assert_ne!(NodeId::from_name("mass"), NodeId::from_name("width"));
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(NodeId::new(), NodeId::new());
    }
}
