//! Error types for tosca-inventory

use crate::types::Problem;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Compilation(CompilationFailure),

    #[error("{} service(s) failed to compile:\n{}", .0.len(), join_failures(.0))]
    CompilationFailed(Vec<CompilationFailure>),

    #[error("emitter error: {0}")]
    EmitterError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn emitter(message: impl Into<String>) -> Self {
        Self::EmitterError(message.into())
    }

    /// Every compilation failure carried by this error.
    pub fn failures(&self) -> &[CompilationFailure] {
        match self {
            Self::Compilation(failure) => std::slice::from_ref(failure),
            Self::CompilationFailed(failures) => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[CompilationFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raised at the compiler boundary: the template could not be turned into a graph.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub problems: Vec<Problem>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            problems: Vec::new(),
        }
    }

    pub fn with_problems(message: impl Into<String>, problems: Vec<Problem>) -> Self {
        Self {
            message: message.into(),
            problems,
        }
    }
}

/// A compile error tied back to the service descriptor that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationFailure {
    /// Position of the descriptor in the `services` list.
    pub index: usize,
    pub service: Option<String>,
    pub template: String,
    pub error: CompileError,
}

impl fmt::Display for CompilationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "services[{}]", self.index)?;
        if let Some(name) = &self.service {
            write!(f, " ({})", name)?;
        }
        write!(f, ": failed to compile {}: {}", self.template, self.error.message)?;
        for problem in &self.error.problems {
            write!(f, "\n  {}", problem)?;
        }
        Ok(())
    }
}

/// A vertex whose metadata does not have the expected shape.
/// Recoverable: the vertex is skipped and the pass continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectionError {
    #[error("vertex {vertex}: field `{field}` should be {expected}")]
    WrongShape {
        vertex: String,
        field: String,
        expected: &'static str,
    },

    #[error("vertex {vertex}: missing `{field}`")]
    Missing { vertex: String, field: String },
}

impl InspectionError {
    pub fn wrong_shape(
        vertex: impl Into<String>,
        field: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::WrongShape {
            vertex: vertex.into(),
            field: field.into(),
            expected,
        }
    }

    pub fn missing(vertex: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Missing {
            vertex: vertex.into(),
            field: field.into(),
        }
    }
}
