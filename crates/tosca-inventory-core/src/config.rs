//! Inventory source document - the YAML file handed to us by the orchestration host.
//!
//! Pure types and parsing only. Compiling the referenced templates lives in the graph crate.

use crate::error::{Error, Result};
use crate::types::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name suffixes recognized as inventory sources.
pub const SOURCE_SUFFIXES: &[&str] = &["tosca.yaml", "tosca.yml"];

#[derive(Debug, Clone, Default)]
pub struct InventorySource {
    /// Informational, as written in the document.
    pub plugin: Option<String>,
    pub services: Vec<ServiceDescriptor>,
    pub compiler: CompilerConfig,
    pub options: DeriveOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    /// Templates are already-compiled clout documents.
    Clout,
    /// Templates are compiled by an external executable.
    #[default]
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub kind: CompilerKind,
    /// Program and leading arguments. The template reference is appended.
    pub command: Vec<String>,
    /// Flag used to pass each input as `name=<json>`.
    pub input_flag: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            kind: CompilerKind::Command,
            command: vec!["puccini-tosca".into(), "compile".into()],
            input_flag: "--input".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveOptions {
    /// Compile service templates concurrently.
    pub parallel: bool,
    /// Stop at the first compilation failure instead of collecting all of them.
    pub fail_fast: bool,
    /// Upper bound for a single compile call. Expiry counts as a compilation failure.
    pub compile_timeout_secs: Option<u64>,
}

impl DeriveOptions {
    pub fn compile_timeout(&self) -> Option<Duration> {
        self.compile_timeout_secs.map(Duration::from_secs)
    }
}

impl InventorySource {
    /// Whether `path` looks like an inventory source we should handle.
    pub fn verify_path(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| SOURCE_SUFFIXES.iter().any(|s| n.ends_with(s)))
    }

    /// Load from a file. Relative template paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read inventory source {}: {}", path.display(), e))
        })?;
        let mut source = Self::parse(&content)?;
        if let Some(dir) = path.parent() {
            source.resolve_templates(dir);
        }
        Ok(source)
    }

    /// Parse a source document. Structural problems are reported with the
    /// offending service index.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(Error::config("parsed empty inventory source"));
        }
        let doc: Value = serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("invalid YAML: {}", e)))?;

        let root = match doc {
            Value::Null => return Err(Error::config("parsed empty inventory source")),
            Value::Object(map) => map,
            other => {
                return Err(Error::config(format!(
                    "inventory source has invalid structure, it should be a mapping, got: {}",
                    kind_of(&other)
                )))
            }
        };

        let plugin = match root.get("plugin") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(Error::config(format!(
                    "`plugin` should be a string, got: {}",
                    kind_of(other)
                )))
            }
        };

        let services = match root.get("services") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(i, entry)| parse_service(i, entry))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(Error::config(format!(
                    "`services` should be a sequence, got: {}",
                    kind_of(other)
                )))
            }
        };

        let compiler = section(&root, "compiler")?.unwrap_or_default();
        let options = section(&root, "options")?.unwrap_or_default();

        Ok(Self {
            plugin,
            services,
            compiler,
            options,
        })
    }

    /// Rewrite relative, non-URL template references to live under `base`.
    pub fn resolve_templates(&mut self, base: &Path) {
        for service in &mut self.services {
            if service.template.contains("://") {
                continue;
            }
            let template = PathBuf::from(&service.template);
            if template.is_relative() {
                service.template = base.join(template).display().to_string();
            }
        }
    }
}

fn parse_service(index: usize, entry: &Value) -> Result<ServiceDescriptor> {
    let Value::Object(fields) = entry else {
        return Err(Error::config(format!(
            "services[{}] should be a mapping, got: {}",
            index,
            kind_of(entry)
        )));
    };
    match fields.get("template") {
        Some(Value::String(t)) if !t.is_empty() => {}
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(Error::config(format!(
                "services[{}]: missing required `template`",
                index
            )))
        }
        Some(other) => {
            return Err(Error::config(format!(
                "services[{}]: `template` should be a string, got: {}",
                index,
                kind_of(other)
            )))
        }
    }
    serde_json::from_value(entry.clone())
        .map_err(|e| Error::config(format!("services[{}]: {}", index, e)))
}

fn section<T: serde::de::DeserializeOwned>(
    root: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::config(format!("`{}`: {}", key, e))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_path_accepts_tosca_suffixes() {
        assert!(InventorySource::verify_path(Path::new("inv/hosts.tosca.yaml")));
        assert!(InventorySource::verify_path(Path::new("tosca.yml")));
        assert!(!InventorySource::verify_path(Path::new("hosts.yaml")));
        assert!(!InventorySource::verify_path(Path::new("hosts.tosca.yaml.bak")));
    }

    #[test]
    fn missing_services_is_empty() {
        let source = InventorySource::parse("plugin: puccini.tosca.hosts\n").unwrap();
        assert_eq!(source.plugin.as_deref(), Some("puccini.tosca.hosts"));
        assert!(source.services.is_empty());
        assert_eq!(source.compiler, CompilerConfig::default());
    }

    #[test]
    fn relative_templates_resolve_against_base() {
        let mut source = InventorySource::parse(
            "services:\n- template: t1.yaml\n- template: /abs/t2.yaml\n- template: https://example.com/t3.yaml\n",
        )
        .unwrap();
        source.resolve_templates(Path::new("/etc/inv"));
        assert_eq!(source.services[0].template, "/etc/inv/t1.yaml");
        assert_eq!(source.services[1].template, "/abs/t2.yaml");
        assert_eq!(source.services[2].template, "https://example.com/t3.yaml");
    }

    #[test]
    fn timeout_converts_to_duration() {
        let options = DeriveOptions {
            compile_timeout_secs: Some(30),
            ..Default::default()
        };
        assert_eq!(options.compile_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(DeriveOptions::default().compile_timeout(), None);
    }
}
