//! Merged configuration tree.
//!
//! The tree is handed to cfgmgr daemons with schema defaults already
//! applied. It is a plain JSON document whose nested objects mirror the
//! configuration hierarchy, e.g. `interfaces -> tunnel -> tun10 -> ...`.
//! Valueless leaf nodes (flags) are represented by an empty object.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{CfgMgrError, CfgMgrResult};

/// Top-level node holding all interface kinds.
pub const INTERFACES: &str = "interfaces";

/// 802.1Q sub-interface node, `<parent>.<vlan>`.
pub const VIF: &str = "vif";
/// 802.1ad service sub-interface node, `<parent>.<svlan>`.
pub const VIF_S: &str = "vif-s";
/// Customer VLAN under a `vif-s`, `<parent>.<svlan>.<cvlan>`.
pub const VIF_C: &str = "vif-c";

/// Interface name -> every kind it is configured under (`tunnel`,
/// `ethernet`, `dummy`, ...), in tree order.
pub type InterfaceIndex = BTreeMap<String, Vec<String>>;

/// Read-only view over a merged configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl ConfigTree {
    /// Wraps an already parsed document.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parses a tree from JSON text.
    pub fn from_json_str(text: &str) -> CfgMgrResult<Self> {
        let root: Value = serde_json::from_str(text).map_err(|e| CfgMgrError::TreeLoad {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        Self::checked(root, Path::new("<inline>"))
    }

    /// Loads a tree from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> CfgMgrResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CfgMgrError::TreeLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let root: Value = serde_json::from_str(&text).map_err(|e| CfgMgrError::TreeLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::checked(root, path)
    }

    fn checked(root: Value, path: &Path) -> CfgMgrResult<Self> {
        if !root.is_object() {
            return Err(CfgMgrError::TreeLoad {
                path: path.to_path_buf(),
                message: "top-level node must be an object".to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Returns the node at `path`, if present.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.root, |node, key| node.get(*key))
    }

    /// Returns true if the node at `path` exists.
    pub fn exists(&self, path: &[&str]) -> bool {
        self.get(path).is_some()
    }

    /// Returns the child nodes of the object at `path`, in key order.
    ///
    /// A missing or non-object node has no children.
    pub fn children(&self, path: &[&str]) -> Vec<(&str, &Value)> {
        match self.get(path) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            _ => Vec::new(),
        }
    }

    /// Collects every configured interface name with its kind.
    ///
    /// VLAN sub-interfaces are indexed by their kernel name and carry
    /// the kind of their parent.
    pub fn interfaces(&self) -> InterfaceIndex {
        let mut index = InterfaceIndex::new();
        let mut insert = |name: String, kind: &str| {
            index.entry(name).or_default().push(kind.to_string());
        };
        for (kind, _) in self.children(&[INTERFACES]) {
            for (name, node) in self.children(&[INTERFACES, kind]) {
                insert(name.to_string(), kind);
                for (vlan, _) in object_children(node, VIF) {
                    insert(format!("{name}.{vlan}"), kind);
                }
                for (svlan, svlan_node) in object_children(node, VIF_S) {
                    insert(format!("{name}.{svlan}"), kind);
                    for (cvlan, _) in object_children(svlan_node, VIF_C) {
                        insert(format!("{name}.{svlan}.{cvlan}"), kind);
                    }
                }
            }
        }
        index
    }
}

fn object_children<'a>(node: &'a Value, key: &str) -> impl Iterator<Item = (&'a str, &'a Value)> {
    node.get(key)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn sample() -> ConfigTree {
        ConfigTree::new(json!({
            "interfaces": {
                "tunnel": {
                    "tun10": { "encapsulation": "gre" },
                    "tun20": { "encapsulation": "ipip" }
                },
                "dummy": { "dum2222": { "address": ["192.0.2.1/32"] } }
            }
        }))
    }

    #[test]
    fn test_get_and_exists() {
        let tree = sample();
        assert_eq!(
            tree.get(&["interfaces", "tunnel", "tun10", "encapsulation"]),
            Some(&json!("gre"))
        );
        assert!(tree.exists(&["interfaces", "dummy"]));
        assert!(!tree.exists(&["interfaces", "bridge"]));
        assert!(tree.exists(&[]));
    }

    #[test]
    fn test_children_sorted() {
        let tree = sample();
        let names: Vec<&str> = tree
            .children(&["interfaces", "tunnel"])
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(names, vec!["tun10", "tun20"]);
        assert!(tree.children(&["protocols"]).is_empty());
    }

    #[test]
    fn test_interface_index() {
        let index = sample().interfaces();
        assert_eq!(index.len(), 3);
        assert_eq!(index["dum2222"], vec!["dummy"]);
        assert_eq!(index["tun20"], vec!["tunnel"]);
    }

    #[test]
    fn test_interface_index_keeps_every_kind() {
        let tree = ConfigTree::new(json!({
            "interfaces": {
                "tunnel": { "eth0": { "encapsulation": "gre" } },
                "ethernet": { "eth0": {} }
            }
        }));
        assert_eq!(tree.interfaces()["eth0"], vec!["ethernet", "tunnel"]);
    }

    #[test]
    fn test_interface_index_vlan_subinterfaces() {
        let tree = ConfigTree::new(json!({
            "interfaces": {
                "ethernet": {
                    "eth0": {
                        "vif": { "100": {} },
                        "vif-s": { "200": { "vif-c": { "300": {} } } }
                    }
                },
                "bonding": { "bond0": { "vif": { "10": { "address": ["10.0.0.1/24"] } } } }
            }
        }));
        let index = tree.interfaces();
        assert_eq!(
            index.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["bond0", "bond0.10", "eth0", "eth0.100", "eth0.200", "eth0.200.300"]
        );
        assert_eq!(index["eth0.100"], vec!["ethernet"]);
        assert_eq!(index["bond0.10"], vec!["bonding"]);
        // vlan ids are not interface names on their own
        assert!(!index.contains_key("100"));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(ConfigTree::from_json_str("[1, 2]").is_err());
        assert!(ConfigTree::from_json_str("{").is_err());
        assert_eq!(ConfigTree::from_json_str("{}").unwrap(), ConfigTree::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"interfaces": {{"ethernet": {{"eth0": {{}}}}}}}}"#).unwrap();

        let tree = ConfigTree::load(file.path()).unwrap();
        assert!(tree.exists(&["interfaces", "ethernet", "eth0"]));

        assert!(ConfigTree::load("/nonexistent/tree.json").is_err());
    }
}
