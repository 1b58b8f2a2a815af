//! Clout documents: the compiler's serialized graph format.
//!
//! ```yaml
//! vertexes:
//!   <id>:
//!     metadata: { puccini: { kind: NodeTemplate } }
//!     properties:
//!       name: host-a
//!       types: { Server: {...}, Root: {...} }
//!       capabilities:
//!         endpoint: { types: { Endpoint: {...} } }
//! ```
//!
//! Type sets may be written as mappings (the keys are the names) or as plain
//! sequences of names.

use crate::vertex::{Capability, CompiledGraph, VertexKind, VertexView};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tosca_inventory_core::{CompileError, InspectionError, TypeSet};

/// A vertex of a clout document. Shape is checked lazily, on inspection.
#[derive(Clone, Debug)]
pub struct CloutVertex {
    id: String,
    value: Value,
}

impl CloutVertex {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    fn properties(&self) -> Result<&Map<String, Value>, InspectionError> {
        match self.value.get("properties") {
            None | Some(Value::Null) => Err(InspectionError::missing(&self.id, "properties")),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(InspectionError::wrong_shape(
                &self.id,
                "properties",
                "a mapping",
            )),
        }
    }

    fn type_names(&self, field: &str, value: Option<&Value>) -> Result<TypeSet, InspectionError> {
        match value {
            None | Some(Value::Null) => Ok(TypeSet::new()),
            Some(Value::Object(map)) => Ok(map.keys().cloned().collect()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(InspectionError::wrong_shape(
                        &self.id,
                        field,
                        "a sequence of type names",
                    )),
                })
                .collect(),
            Some(_) => Err(InspectionError::wrong_shape(
                &self.id,
                field,
                "a mapping or sequence of type names",
            )),
        }
    }
}

impl VertexView for CloutVertex {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> VertexKind {
        VertexKind::from_tag(
            self.value
                .pointer("/metadata/puccini/kind")
                .and_then(Value::as_str),
        )
    }

    fn name(&self) -> Result<String, InspectionError> {
        match self.properties()?.get("name") {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(name)) => Ok(name.clone()),
            Some(_) => Err(InspectionError::wrong_shape(
                &self.id,
                "properties.name",
                "a string",
            )),
        }
    }

    fn declared_types(&self) -> Result<TypeSet, InspectionError> {
        let properties = self.properties()?;
        self.type_names("properties.types", properties.get("types"))
    }

    fn capabilities(&self) -> Result<BTreeMap<String, Capability>, InspectionError> {
        let capabilities = match self.properties()?.get("capabilities") {
            None | Some(Value::Null) => return Ok(BTreeMap::new()),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(InspectionError::wrong_shape(
                    &self.id,
                    "properties.capabilities",
                    "a mapping",
                ))
            }
        };

        let mut out = BTreeMap::new();
        for (name, capability) in capabilities {
            let field = format!("properties.capabilities.{}", name);
            let types = match capability {
                Value::Null => TypeSet::new(),
                Value::Object(fields) => {
                    self.type_names(&format!("{}.types", field), fields.get("types"))?
                }
                _ => return Err(InspectionError::wrong_shape(&self.id, field, "a mapping")),
            };
            out.insert(
                name.clone(),
                Capability {
                    declared_types: types,
                },
            );
        }
        Ok(out)
    }
}

/// A parsed clout document.
#[derive(Clone, Debug, Default)]
pub struct CloutGraph {
    vertexes: Vec<CloutVertex>,
}

impl CloutGraph {
    /// Build from a parsed document. Only the top-level layout is validated here;
    /// individual vertices are checked when inspected.
    pub fn from_value(doc: Value) -> Result<Self, CompileError> {
        let vertexes = match doc {
            Value::Null => return Ok(Self::default()),
            Value::Object(mut root) => match root.remove("vertexes") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Object(map)) => map
                    .into_iter()
                    .map(|(id, value)| CloutVertex::new(id, value))
                    .collect(),
                Some(_) => {
                    return Err(CompileError::new(
                        "clout document `vertexes` should be a mapping",
                    ))
                }
            },
            _ => return Err(CompileError::new("clout document should be a mapping")),
        };
        Ok(Self { vertexes })
    }

    /// Parse YAML or JSON text.
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Value = serde_yaml::from_str(text)
            .map_err(|e| CompileError::new(format!("invalid clout document: {}", e)))?;
        Self::from_value(doc)
    }
}

impl CompiledGraph for CloutGraph {
    fn vertices(&self) -> Box<dyn Iterator<Item = &dyn VertexView> + '_> {
        Box::new(self.vertexes.iter().map(|v| v as &dyn VertexView))
    }

    fn len(&self) -> usize {
        self.vertexes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::inspect;
    use serde_json::json;

    fn vertex(value: Value) -> CloutVertex {
        CloutVertex::new("v1", value)
    }

    #[test]
    fn node_template_is_inspected() {
        let v = vertex(json!({
            "metadata": {"puccini": {"kind": "NodeTemplate"}},
            "properties": {
                "name": "host-a",
                "types": {"Server": {}, "Root": {}},
                "capabilities": {
                    "endpoint": {"types": ["Endpoint", "Root"]},
                    "host": {"types": {"Container": {}}}
                }
            }
        }));
        let node = inspect(&v).unwrap().unwrap();
        assert_eq!(node.id, "v1");
        assert_eq!(node.name, "host-a");
        assert!(node.declared_types.contains("Server"));
        assert!(node.declared_types.contains("Root"));
        assert_eq!(node.capabilities.len(), 2);
        assert!(node.capabilities["host"].declared_types.contains("Container"));
    }

    #[test]
    fn other_kinds_are_ignored() {
        let relationship = vertex(json!({
            "metadata": {"puccini": {"kind": "RelationshipTemplate"}},
            "properties": 42
        }));
        assert_eq!(inspect(&relationship).unwrap(), None);
        assert_eq!(inspect(&vertex(json!({}))).unwrap(), None);
        assert_eq!(inspect(&vertex(json!("scalar"))).unwrap(), None);
    }

    #[test]
    fn absent_fields_are_empty() {
        let v = vertex(json!({
            "metadata": {"puccini": {"kind": "NodeTemplate"}},
            "properties": {}
        }));
        let node = inspect(&v).unwrap().unwrap();
        assert_eq!(node.name, "");
        assert!(node.declared_types.is_empty());
        assert!(node.capabilities.is_empty());
    }

    #[test]
    fn malformed_fields_are_anomalies() {
        let no_props = vertex(json!({"metadata": {"puccini": {"kind": "NodeTemplate"}}}));
        assert_eq!(
            inspect(&no_props).unwrap_err(),
            InspectionError::missing("v1", "properties")
        );

        let bad_types = vertex(json!({
            "metadata": {"puccini": {"kind": "NodeTemplate"}},
            "properties": {"types": 5}
        }));
        assert!(matches!(
            inspect(&bad_types).unwrap_err(),
            InspectionError::WrongShape { field, .. } if field == "properties.types"
        ));

        let bad_cap = vertex(json!({
            "metadata": {"puccini": {"kind": "NodeTemplate"}},
            "properties": {"capabilities": {"endpoint": {"types": [1, 2]}}}
        }));
        assert!(matches!(
            inspect(&bad_cap).unwrap_err(),
            InspectionError::WrongShape { field, .. } if field == "properties.capabilities.endpoint.types"
        ));

        let bad_name = vertex(json!({
            "metadata": {"puccini": {"kind": "NodeTemplate"}},
            "properties": {"name": ["a"]}
        }));
        assert!(inspect(&bad_name).is_err());
    }

    #[test]
    fn graph_parse_layouts() {
        assert!(CloutGraph::parse("").unwrap().is_empty());
        assert!(CloutGraph::parse("version: 1\n").unwrap().is_empty());
        assert_eq!(
            CloutGraph::parse("vertexes:\n  a: {}\n  b: {}\n").unwrap().len(),
            2
        );
        assert!(CloutGraph::parse("vertexes: [a, b]\n").is_err());
        assert!(CloutGraph::parse("- a\n").is_err());
        assert!(CloutGraph::parse("vertexes: {a: [\n").is_err());
    }
}
