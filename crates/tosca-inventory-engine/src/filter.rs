//! Conformance filter.
//!
//! Node types narrow: a node must declare *every* required node type.
//! Capability types widen: a node passes if *any* capability declares *any*
//! required capability type. Capability types are only consulted once the
//! node-type check has passed. Empty filters accept everything.

use tosca_inventory_core::{ServiceDescriptor, TypeSet};
use tosca_inventory_graph::NodeInstance;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeFilter {
    pub node_types: TypeSet,
    pub capability_types: TypeSet,
}

impl TypeFilter {
    pub fn new(node_types: TypeSet, capability_types: TypeSet) -> Self {
        Self {
            node_types,
            capability_types,
        }
    }

    pub fn for_service(service: &ServiceDescriptor) -> Self {
        Self::new(service.node_types.clone(), service.capability_types.clone())
    }

    pub fn allows(&self, node: &NodeInstance) -> bool {
        is_allowed(node, &self.node_types, &self.capability_types)
    }
}

pub fn is_allowed(
    node: &NodeInstance,
    required_node_types: &TypeSet,
    required_capability_types: &TypeSet,
) -> bool {
    if !required_node_types
        .iter()
        .all(|t| node.declared_types.contains(t))
    {
        return false;
    }

    if !required_capability_types.is_empty() {
        return node
            .capability_types()
            .any(|t| required_capability_types.contains(t));
    }

    true
}
