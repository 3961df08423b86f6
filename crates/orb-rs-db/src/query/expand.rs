//! Expansion trees: which relationships to load eagerly, and in what shape.
//!
//! A tree maps relationship names to subtrees. Inside a subtree the keys
//! `ids`, `count`, `records`, `first`, and `last` are terminal markers that
//! pick the output shape; any other key is a nested expansion on the related
//! schema.
//!
//! ```
//! use orb_rs_db::query::{ExpandTree, Marker};
//!
//! let tree = ExpandTree::from_paths(["roles.ids", "roles.count", "address"]);
//! let roles = tree.get("roles").unwrap();
//! assert_eq!(roles.markers(), vec![Marker::Count, Marker::Ids]);
//! assert!(tree.get("address").unwrap().is_empty());
//! ```

use std::collections::BTreeMap;

use orb_rs_core::{OrbError, OrbResult};

/// A terminal output shape for pipes and reverse lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Marker {
    Count,
    First,
    Ids,
    Last,
    Records,
}

impl Marker {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ids" => Some(Self::Ids),
            "count" => Some(Self::Count),
            "records" => Some(Self::Records),
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            _ => None,
        }
    }

    /// The key used when several markers are combined into one object.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ids => "ids",
            Self::Count => "count",
            Self::Records => "records",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

/// A nested eager-load request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandTree {
    children: BTreeMap<String, ExpandTree>,
}

impl ExpandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from dotted paths such as `roles.permissions.ids`.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert_path(path.as_ref());
        }
        tree
    }

    /// Builds a tree from JSON: a comma-separated string of paths, an array
    /// of paths or objects, or a nested object whose values are `true`,
    /// `null`, path strings, or further objects.
    pub fn from_json(value: &serde_json::Value) -> OrbResult<Self> {
        let mut tree = Self::new();
        tree.merge_json(value)?;
        Ok(tree)
    }

    fn merge_json(&mut self, value: &serde_json::Value) -> OrbResult<()> {
        use serde_json::Value as Json;

        match value {
            Json::Null | Json::Bool(true) => Ok(()),
            Json::String(paths) => {
                for path in paths.split(',') {
                    self.insert_path(path.trim());
                }
                Ok(())
            }
            Json::Array(items) => items.iter().try_for_each(|item| self.merge_json(item)),
            Json::Object(map) => {
                for (key, sub) in map {
                    if matches!(sub, Json::Bool(false)) {
                        continue;
                    }
                    let mut child = Self::new();
                    child.merge_json(sub)?;
                    self.children.entry(key.clone()).or_default().merge(child);
                }
                Ok(())
            }
            other => Err(OrbError::SerializationError(format!(
                "invalid expansion tree: {other}"
            ))),
        }
    }

    /// Adds one dotted path; empty segments are ignored.
    pub fn insert_path(&mut self, path: &str) {
        let mut node = self;
        for part in path.split('.').map(str::trim).filter(|p| !p.is_empty()) {
            node = node.children.entry(part.to_string()).or_default();
        }
    }

    fn merge(&mut self, other: Self) {
        for (key, sub) in other.children {
            self.children.entry(key).or_default().merge(sub);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Self> {
        self.children.get(name)
    }

    /// Every child in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Self)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `name` is requested at this level.
    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// The terminal markers at this level, in a stable order.
    pub fn markers(&self) -> Vec<Marker> {
        let mut markers: Vec<Marker> = self.children.keys().filter_map(|k| Marker::parse(k)).collect();
        markers.sort();
        markers
    }

    /// The nested relationship expansions at this level.
    pub fn nested(&self) -> Self {
        Self {
            children: self
                .children
                .iter()
                .filter(|(k, _)| Marker::parse(k).is_none())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paths_nested() {
        let tree = ExpandTree::from_paths(["roles.permissions", "roles.ids", " .address. "]);
        let roles = tree.get("roles").unwrap();
        assert!(roles.contains("permissions"));
        assert_eq!(roles.markers(), vec![Marker::Ids]);
        assert!(roles.nested().contains("permissions"));
        assert!(!roles.nested().contains("ids"));
        assert!(tree.contains("address"));
    }

    #[test]
    fn test_from_json_string() {
        let tree = ExpandTree::from_json(&serde_json::json!("roles, address.country")).unwrap();
        assert!(tree.contains("roles"));
        assert!(tree.get("address").unwrap().contains("country"));
    }

    #[test]
    fn test_from_json_object_and_array() {
        let tree = ExpandTree::from_json(&serde_json::json!([
            {"roles": {"count": true, "ids": null}},
            {"groups": false},
            "address"
        ]))
        .unwrap();
        assert_eq!(
            tree.get("roles").unwrap().markers(),
            vec![Marker::Count, Marker::Ids]
        );
        assert!(!tree.contains("groups"));
        assert!(tree.contains("address"));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = ExpandTree::from_json(&serde_json::json!(5)).unwrap_err();
        assert!(matches!(err, OrbError::SerializationError(_)));
    }

    #[test]
    fn test_iteration_order_is_sorted() {
        let tree = ExpandTree::from_paths(["zeta", "alpha", "mid"]);
        let names: Vec<&str> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
