//! tosca-inventory core - types, configuration and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{CompilerConfig, CompilerKind, DeriveOptions, InventorySource};
pub use error::{CompilationFailure, CompileError, Error, InspectionError, Result};
pub use types::*;
