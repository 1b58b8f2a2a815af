//! Vertex view: the only shape of the compiled graph the inventory depends on.

use std::collections::BTreeMap;
use std::fmt;
use tosca_inventory_core::{InspectionError, TypeSet};

/// Kind tag the compiler puts on vertices that represent deployable node instances.
pub const NODE_TEMPLATE_KIND: &str = "NodeTemplate";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VertexKind {
    NodeInstance,
    /// Relationships, metadata-only vertices, anything else the compiler emits.
    Other(String),
    /// No kind tag at all.
    Untagged,
}

impl VertexKind {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(NODE_TEMPLATE_KIND) => Self::NodeInstance,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Untagged,
        }
    }

    pub fn is_node_instance(&self) -> bool {
        matches!(self, Self::NodeInstance)
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeInstance => write!(f, "{}", NODE_TEMPLATE_KIND),
            Self::Other(kind) => write!(f, "{}", kind),
            Self::Untagged => write!(f, "untagged"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capability {
    pub declared_types: TypeSet,
}

impl Capability {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared_types: types.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read-only view of one vertex. Implemented by every graph representation.
///
/// Only `kind` is infallible: the remaining accessors are consulted for node
/// instances only, and report shape anomalies instead of guessing.
pub trait VertexView {
    fn id(&self) -> &str;

    fn kind(&self) -> VertexKind;

    /// Deployable identity. May be empty.
    fn name(&self) -> Result<String, InspectionError>;

    /// The node's own type and all its ancestors.
    fn declared_types(&self) -> Result<TypeSet, InspectionError>;

    fn capabilities(&self) -> Result<BTreeMap<String, Capability>, InspectionError>;
}

/// A compiled topology graph. One per compilation, never shared or mutated.
pub trait CompiledGraph: Send + Sync {
    /// Every vertex, in a stable order.
    fn vertices(&self) -> Box<dyn Iterator<Item = &dyn VertexView> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of a node-instance vertex, as the conformance filter sees it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeInstance {
    pub id: String,
    pub name: String,
    pub declared_types: TypeSet,
    pub capabilities: BTreeMap<String, Capability>,
}

impl NodeInstance {
    /// All capability types, across every capability.
    pub fn capability_types(&self) -> impl Iterator<Item = &str> {
        self.capabilities
            .values()
            .flat_map(|c| c.declared_types.iter().map(String::as_str))
    }
}

/// Inspect a vertex. `Ok(None)` means the vertex is not a node instance and is
/// irrelevant to the inventory.
pub fn inspect(vertex: &dyn VertexView) -> Result<Option<NodeInstance>, InspectionError> {
    if !vertex.kind().is_node_instance() {
        return Ok(None);
    }
    Ok(Some(NodeInstance {
        id: vertex.id().to_string(),
        name: vertex.name()?,
        declared_types: vertex.declared_types()?,
        capabilities: vertex.capabilities()?,
    }))
}
