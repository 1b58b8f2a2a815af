//! Inventory emitter: the sink a finished derivation is handed to.
//!
//! Every operation must be idempotent: repeating an identical call is a no-op.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tosca_inventory_core::{Error, Result};
use tracing::warn;

pub trait InventoryEmitter {
    type Group: Clone;

    fn ensure_group(&mut self, name: &str) -> Result<Self::Group>;

    fn add_child_group(&mut self, parent: &Self::Group, child: &Self::Group) -> Result<()>;

    fn add_host(&mut self, host: &str, group: &Self::Group) -> Result<()>;
}

/// Group names Ansible defines implicitly.
const IMPLICIT_GROUPS: &[&str] = &["all", "ungrouped"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct GroupEntry {
    hosts: BTreeSet<String>,
    children: BTreeSet<String>,
}

/// In-memory inventory in the shape Ansible's dynamic-inventory protocol expects.
///
/// Anonymous (empty-named) hosts are dropped here: Ansible has no way to
/// address them.
#[derive(Clone, Debug, Default)]
pub struct AnsibleInventory {
    groups: BTreeMap<String, GroupEntry>,
    hosts: BTreeSet<String>,
}

impl AnsibleInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn hosts_of(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group).map(|g| &g.hosts)
    }

    pub fn children_of(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group).map(|g| &g.children)
    }

    /// Groups that are nobody's child.
    fn top_level(&self) -> Vec<&str> {
        let nested: BTreeSet<&str> = self
            .groups
            .values()
            .flat_map(|g| g.children.iter().map(String::as_str))
            .collect();
        self.groups
            .keys()
            .map(String::as_str)
            .filter(|name| !nested.contains(name))
            .collect()
    }

    /// Whether `target` is reachable from `from` through child links.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(name) = stack.pop() {
            if name == target {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(entry) = self.groups.get(name) {
                stack.extend(entry.children.iter().map(String::as_str));
            }
        }
        false
    }

    fn entry_mut(&mut self, group: &str) -> Result<&mut GroupEntry> {
        self.groups
            .get_mut(group)
            .ok_or_else(|| Error::emitter(format!("unknown group: {}", group)))
    }

    /// Output for `--list`.
    pub fn to_list_json(&self) -> Value {
        let mut doc = Map::new();

        let hostvars: Map<String, Value> = self
            .hosts
            .iter()
            .map(|h| (h.clone(), json!({})))
            .collect();
        doc.insert("_meta".into(), json!({ "hostvars": hostvars }));
        doc.insert("all".into(), json!({ "children": self.top_level() }));

        for (name, entry) in &self.groups {
            let mut group = Map::new();
            if !entry.hosts.is_empty() {
                group.insert("hosts".into(), json!(entry.hosts));
            }
            if !entry.children.is_empty() {
                group.insert("children".into(), json!(entry.children));
            }
            doc.insert(name.clone(), Value::Object(group));
        }
        Value::Object(doc)
    }

    /// Output for `--host <name>`. Variables are not derived, so this is always empty.
    pub fn host_vars(&self, _host: &str) -> Value {
        json!({})
    }

    /// Indented tree in the style of `ansible-inventory --graph`.
    pub fn to_graph(&self) -> String {
        let mut out = String::from("@all:\n");
        for name in self.top_level() {
            self.write_graph(&mut out, name, 1);
        }
        out
    }

    fn write_graph(&self, out: &mut String, name: &str, depth: usize) {
        let indent = "  |".repeat(depth);
        out.push_str(&format!("{}--@{}:\n", indent, name));
        let Some(entry) = self.groups.get(name) else {
            return;
        };
        for child in &entry.children {
            self.write_graph(out, child, depth + 1);
        }
        let host_indent = "  |".repeat(depth + 1);
        for host in &entry.hosts {
            out.push_str(&format!("{}--{}\n", host_indent, host));
        }
    }
}

impl InventoryEmitter for AnsibleInventory {
    type Group = String;

    fn ensure_group(&mut self, name: &str) -> Result<String> {
        if IMPLICIT_GROUPS.contains(&name) {
            return Err(Error::emitter(format!("group name is reserved: {}", name)));
        }
        if self.hosts.contains(name) {
            return Err(Error::emitter(format!(
                "cannot add group {}: a host with that name exists",
                name
            )));
        }
        self.groups.entry(name.to_string()).or_default();
        Ok(name.to_string())
    }

    fn add_child_group(&mut self, parent: &String, child: &String) -> Result<()> {
        if !self.groups.contains_key(child) {
            return Err(Error::emitter(format!("unknown group: {}", child)));
        }
        if self.reaches(child, parent) {
            return Err(Error::emitter(format!(
                "adding {} under {} would create a cycle",
                child, parent
            )));
        }
        self.entry_mut(parent)?.children.insert(child.clone());
        Ok(())
    }

    fn add_host(&mut self, host: &str, group: &String) -> Result<()> {
        if host.is_empty() {
            warn!(group = %group, "dropping anonymous host");
            return Ok(());
        }
        if self.groups.contains_key(host) {
            return Err(Error::emitter(format!(
                "cannot add host {}: a group with that name exists",
                host
            )));
        }
        self.entry_mut(group)?.hosts.insert(host.to_string());
        self.hosts.insert(host.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_are_idempotent() {
        let mut inv = AnsibleInventory::new();
        let root = inv.ensure_group("tosca").unwrap();
        let again = inv.ensure_group("tosca").unwrap();
        assert_eq!(root, again);

        let web = inv.ensure_group("web").unwrap();
        inv.add_child_group(&root, &web).unwrap();
        inv.add_child_group(&root, &web).unwrap();
        inv.add_host("node1", &web).unwrap();
        inv.add_host("node1", &web).unwrap();

        assert_eq!(inv.group_names().count(), 2);
        assert_eq!(inv.children_of("tosca").unwrap().len(), 1);
        assert_eq!(inv.hosts_of("web").unwrap().len(), 1);
    }

    #[test]
    fn group_and_host_names_conflict() {
        let mut inv = AnsibleInventory::new();
        let g = inv.ensure_group("tosca").unwrap();
        inv.add_host("db", &g).unwrap();
        assert!(matches!(inv.ensure_group("db"), Err(Error::EmitterError(_))));
        assert!(matches!(inv.add_host("tosca", &g), Err(Error::EmitterError(_))));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let mut inv = AnsibleInventory::new();
        assert!(inv.ensure_group("all").is_err());
        assert!(inv.ensure_group("ungrouped").is_err());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut inv = AnsibleInventory::new();
        let a = inv.ensure_group("a").unwrap();
        let b = inv.ensure_group("b").unwrap();
        inv.add_child_group(&a, &b).unwrap();
        assert!(inv.add_child_group(&b, &a).is_err());
        assert!(inv.add_child_group(&a, &a).is_err());
    }

    #[test]
    fn unknown_group_is_an_error() {
        let mut inv = AnsibleInventory::new();
        assert!(inv.add_host("h", &"missing".to_string()).is_err());
    }

    #[test]
    fn anonymous_host_is_dropped() {
        let mut inv = AnsibleInventory::new();
        let g = inv.ensure_group("tosca").unwrap();
        inv.add_host("", &g).unwrap();
        assert!(inv.hosts_of("tosca").unwrap().is_empty());
    }

    #[test]
    fn list_json_layout() {
        let mut inv = AnsibleInventory::new();
        let root = inv.ensure_group("tosca").unwrap();
        let web = inv.ensure_group("web").unwrap();
        inv.add_child_group(&root, &web).unwrap();
        inv.add_host("host-a", &web).unwrap();
        inv.add_host("host-z", &root).unwrap();

        let doc = inv.to_list_json();
        assert_eq!(doc["all"]["children"], json!(["tosca"]));
        assert_eq!(doc["tosca"]["children"], json!(["web"]));
        assert_eq!(doc["tosca"]["hosts"], json!(["host-z"]));
        assert_eq!(doc["web"]["hosts"], json!(["host-a"]));
        assert!(doc["web"].get("children").is_none());
        assert_eq!(doc["_meta"]["hostvars"]["host-a"], json!({}));
        assert_eq!(inv.host_vars("host-a"), json!({}));
    }

    #[test]
    fn graph_lists_children_then_hosts() {
        let mut inv = AnsibleInventory::new();
        let root = inv.ensure_group("tosca").unwrap();
        let web = inv.ensure_group("web").unwrap();
        inv.add_child_group(&root, &web).unwrap();
        inv.add_host("host-a", &web).unwrap();
        inv.add_host("host-z", &root).unwrap();

        assert_eq!(
            inv.to_graph(),
            "@all:\n  |--@tosca:\n  |  |--@web:\n  |  |  |--host-a\n  |  |--host-z\n"
        );
    }
}
