//! Shared types: service descriptors, compiler problems, source locations.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of the shared root group. Services that are unnamed, or named exactly
/// this, place their hosts directly into it.
pub const ROOT_GROUP: &str = "tosca";

/// Inputs passed to the compiler, by input name.
pub type Inputs = BTreeMap<String, Value>;

/// Flattened type names (a type and all of its ancestors).
pub type TypeSet = BTreeSet<String>;

// ---------------------------------------------------------------------------
// ServiceDescriptor
// ---------------------------------------------------------------------------

/// One configured unit of work: a template to compile plus the filters that
/// select which of its node instances become inventory hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    pub template: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: Inputs,
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_types: TypeSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capability_types: TypeSet,
}

/// A key written with no value (`node_types:`) reads as null; treat it as absent.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServiceDescriptor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            name: None,
            template: template.into(),
            inputs: Inputs::new(),
            node_types: TypeSet::new(),
            capability_types: TypeSet::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn with_node_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capability_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capability_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// The child group this service contributes to, or `None` for the root group.
    pub fn group_name(&self) -> Option<&str> {
        match self.name.as_deref() {
            None | Some("") | Some(ROOT_GROUP) => None,
            Some(name) => Some(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Problems reported by the compiler
// ---------------------------------------------------------------------------

/// Where in a template a problem was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub url: String,
    pub row: Option<usize>,
    pub column: Option<usize>,
}

impl SourceLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            row: None,
            column: None,
        }
    }

    pub fn at(mut self, row: usize, column: usize) -> Self {
        self.row = Some(row);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)?;
        if let Some(row) = self.row {
            write!(f, ":{}", row)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// A structured problem record from the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub message: String,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_and_reserved_names_target_root() {
        assert_eq!(ServiceDescriptor::new("t.yaml").group_name(), None);
        assert_eq!(ServiceDescriptor::new("t.yaml").named("").group_name(), None);
        assert_eq!(ServiceDescriptor::new("t.yaml").named(ROOT_GROUP).group_name(), None);
        assert_eq!(
            ServiceDescriptor::new("t.yaml").named("web").group_name(),
            Some("web")
        );
    }

    #[test]
    fn location_display_omits_missing_parts() {
        assert_eq!(SourceLocation::new("a.yaml").to_string(), "a.yaml");
        assert_eq!(SourceLocation::new("a.yaml").at(3, 7).to_string(), "a.yaml:3:7");
        let loc = SourceLocation {
            url: "a.yaml".into(),
            row: Some(3),
            column: None,
        };
        assert_eq!(loc.to_string(), "a.yaml:3");
    }

    #[test]
    fn problem_display_includes_location() {
        let p = Problem::new("unknown type: Server").at(SourceLocation::new("t.yaml").at(10, 5));
        assert_eq!(p.to_string(), "t.yaml:10:5: unknown type: Server");
        assert_eq!(Problem::new("boom").to_string(), "boom");
    }
}
