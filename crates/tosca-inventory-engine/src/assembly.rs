//! Group assembler: an arena of groups built up over one derivation pass.
//!
//! Groups are addressed by `GroupId`, an index into the arena. Asking for a
//! group that already exists returns the existing id; the root group is
//! created lazily on first use.

use crate::emitter::InventoryEmitter;
use std::collections::{BTreeSet, HashMap};
use tosca_inventory_core::{Result, ServiceDescriptor, ROOT_GROUP};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub parent: Option<GroupId>,
    /// Every placement, in order. A host placed twice appears twice;
    /// deduplication is the emitter's job.
    hosts: Vec<String>,
}

impl Group {
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Distinct host names.
    pub fn members(&self) -> BTreeSet<&str> {
        self.hosts.iter().map(String::as_str).collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct GroupAssembler {
    groups: Vec<Group>,
    by_name: HashMap<String, GroupId>,
    root: Option<GroupId>,
}

impl GroupAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root group, created on first call.
    pub fn root(&mut self) -> GroupId {
        if let Some(root) = self.root {
            return root;
        }
        let root = self.ensure_group(ROOT_GROUP, None);
        self.root = Some(root);
        root
    }

    /// Look up `name`, creating it under `parent` if it does not exist yet.
    /// An existing group keeps its original parent.
    pub fn ensure_group(&mut self, name: &str, parent: Option<GroupId>) -> GroupId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            name: name.to_string(),
            parent,
            hosts: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// The group a service's hosts go into: the root group for unnamed or
    /// root-named services, otherwise a named child of the root group.
    pub fn target_group(&mut self, service: &ServiceDescriptor) -> GroupId {
        let root = self.root();
        match service.group_name() {
            None => root,
            Some(name) => self.ensure_group(name, Some(root)),
        }
    }

    pub fn add_host(&mut self, group: GroupId, host: impl Into<String>) {
        self.groups[group.0].hosts.push(host.into());
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn find(&self, name: &str) -> Option<&Group> {
        self.by_name.get(name).map(|id| self.group(*id))
    }

    /// Groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &Group)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(i, g)| (GroupId(i), g))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Replay the assembled groups into an emitter: groups first, then
    /// parent links, then host placements.
    pub fn emit<E: InventoryEmitter>(&self, emitter: &mut E) -> Result<()> {
        let handles = self
            .groups
            .iter()
            .map(|g| emitter.ensure_group(&g.name))
            .collect::<Result<Vec<_>>>()?;

        for (i, group) in self.groups.iter().enumerate() {
            if let Some(parent) = group.parent {
                emitter.add_child_group(&handles[parent.0], &handles[i])?;
            }
        }

        for (i, group) in self.groups.iter().enumerate() {
            for host in &group.hosts {
                emitter.add_host(host, &handles[i])?;
            }
        }
        Ok(())
    }
}
