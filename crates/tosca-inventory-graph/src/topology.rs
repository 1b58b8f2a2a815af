//! In-memory typed graph. Same accessor contract as a clout document, without
//! any shape checking to do: every vertex is well-formed by construction.

use crate::vertex::{Capability, CompiledGraph, VertexKind, VertexView};
use std::collections::BTreeMap;
use tosca_inventory_core::{InspectionError, TypeSet};

#[derive(Clone, Debug)]
pub struct Vertex {
    pub id: String,
    pub kind: VertexKind,
    pub name: String,
    pub declared_types: TypeSet,
    pub capabilities: BTreeMap<String, Capability>,
}

impl Vertex {
    /// A node-instance vertex whose id and name are both `name`.
    pub fn node(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            kind: VertexKind::NodeInstance,
            name,
            declared_types: TypeSet::new(),
            capabilities: BTreeMap::new(),
        }
    }

    pub fn other(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: VertexKind::Other(kind.into()),
            name: String::new(),
            declared_types: TypeSet::new(),
            capabilities: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn with_capability<I, S>(mut self, name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.insert(name.into(), Capability::new(types));
        self
    }
}

impl VertexView for Vertex {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> VertexKind {
        self.kind.clone()
    }

    fn name(&self) -> Result<String, InspectionError> {
        Ok(self.name.clone())
    }

    fn declared_types(&self) -> Result<TypeSet, InspectionError> {
        Ok(self.declared_types.clone())
    }

    fn capabilities(&self) -> Result<BTreeMap<String, Capability>, InspectionError> {
        Ok(self.capabilities.clone())
    }
}

/// Vertices keyed by id.
#[derive(Clone, Debug, Default)]
pub struct TopologyGraph {
    vertices: BTreeMap<String, Vertex>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex. Replaces any existing vertex with the same id.
    pub fn insert(&mut self, vertex: Vertex) {
        self.vertices.insert(vertex.id.clone(), vertex);
    }

    pub fn with(mut self, vertex: Vertex) -> Self {
        self.insert(vertex);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }
}

impl FromIterator<Vertex> for TopologyGraph {
    fn from_iter<T: IntoIterator<Item = Vertex>>(iter: T) -> Self {
        let mut graph = Self::new();
        for vertex in iter {
            graph.insert(vertex);
        }
        graph
    }
}

impl CompiledGraph for TopologyGraph {
    fn vertices(&self) -> Box<dyn Iterator<Item = &dyn VertexView> + '_> {
        Box::new(self.vertices.values().map(|v| v as &dyn VertexView))
    }

    fn len(&self) -> usize {
        self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::inspect;

    #[test]
    fn builder_produces_node_instances() {
        let graph = TopologyGraph::new()
            .with(Vertex::node("host-a").with_types(["Server", "Linux"]))
            .with(Vertex::other("rel-1", "RelationshipTemplate"));
        assert_eq!(graph.len(), 2);

        let inspected: Vec<_> = graph
            .vertices()
            .filter_map(|v| inspect(v).unwrap())
            .collect();
        assert_eq!(inspected.len(), 1);
        assert_eq!(inspected[0].name, "host-a");
    }

    #[test]
    fn ids_are_unique() {
        let graph: TopologyGraph = vec![
            Vertex::node("a").with_types(["X"]),
            Vertex::node("a").with_types(["Y"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(graph.len(), 1);
        assert!(graph.get("a").unwrap().declared_types.contains("Y"));
    }

    #[test]
    fn anonymous_node_keeps_its_id() {
        let v = Vertex::node("").with_id("vertex-7");
        let node = inspect(&v).unwrap().unwrap();
        assert_eq!(node.id, "vertex-7");
        assert_eq!(node.name, "");
    }
}
