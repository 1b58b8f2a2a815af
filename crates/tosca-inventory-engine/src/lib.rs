//! tosca-inventory-engine: filter-and-group derivation over compiled topologies.
//!
//! One derivation pass: for each service descriptor, compile its template,
//! keep the node instances that conform to its type filter, and place them
//! into the service's group (or the shared root group).

pub mod assembly;
pub mod deriver;
pub mod emitter;
pub mod filter;

pub use assembly::{Group, GroupAssembler, GroupId};
pub use deriver::{assemble_graph, Derivation, Deriver, ServiceReport};
pub use emitter::{AnsibleInventory, InventoryEmitter};
pub use filter::{is_allowed, TypeFilter};
