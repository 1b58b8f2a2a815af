//! tosca-inventory-graph: read-only access to compiled topology graphs.
//!
//! The compiler is external. This crate owns the narrow view the inventory
//! needs of its output (vertex kind, name, flattened types, capabilities) and
//! the adapters that invoke it.

pub mod clout;
pub mod compiler;
pub mod topology;
pub mod vertex;

pub use clout::{CloutGraph, CloutVertex};
pub use compiler::{
    create_compiler, parse_problems, CloutFileCompiler, CommandCompiler, Compiler, TimeoutCompiler,
};
pub use topology::{TopologyGraph, Vertex};
pub use vertex::{
    inspect, Capability, CompiledGraph, NodeInstance, VertexKind, VertexView, NODE_TEMPLATE_KIND,
};
