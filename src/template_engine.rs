//! YAML template engine
//!
//! Templates are ordinary YAML documents in which a scalar may start with a
//! `${name}` placeholder. Rendering parses the document, swaps placeholders for
//! values from a [`TemplateData`] map and serializes the result again:
//!
//! - `key: ${cores}` takes the value with its own type (`cores: 3`)
//! - `key: ${size}Gi` appends the suffix to the stringified value (`key: 3Gi`)
//!
//! Resolution happens on the parsed value tree owned by the engine, so parsing
//! elsewhere in the process is unaffected. Substituted text is never scanned
//! again.
//!
//! The parsed tree does not remember how a scalar was written, so quoted
//! scalars are resolved too: `name: "${x}"` renders the same as `name: ${x}`.
//! There is no escape for a literal leading `${...}`; put any character in
//! front of it instead, since only a leading placeholder is resolved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Values inserted into a template, keyed by placeholder name
pub type TemplateData = BTreeMap<String, Value>;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{([^}^{]+)\}").expect("valid regex"));

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("No value for template variable '{0}'")]
    MissingKey(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Manifests shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Parameters: `namespace`
    Namespace,
    /// Parameters: `namespace`, `network_policy_name`
    NetworkPolicy,
    /// Parameters: `namespace`, `vmi_name`, `cores`, `memory`, `vm_image`
    VirtualMachineInstance,
}

impl Template {
    pub const ALL: [Template; 3] = [
        Template::Namespace,
        Template::NetworkPolicy,
        Template::VirtualMachineInstance,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Template::Namespace => "namespace_template.yaml",
            Template::NetworkPolicy => "network_policy_template.yaml",
            Template::VirtualMachineInstance => "vmi_template.yaml",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Template::Namespace => include_str!("../templates/namespace_template.yaml"),
            Template::NetworkPolicy => include_str!("../templates/network_policy_template.yaml"),
            Template::VirtualMachineInstance => include_str!("../templates/vmi_template.yaml"),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, TemplateError> {
        Self::ALL
            .into_iter()
            .find(|t| t.file_name() == name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }
}

// ============================================================================
// SBIO: Pure substitution logic (no I/O)
// ============================================================================

/// Text used when a value is followed by a literal suffix
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn resolve_scalar(
    scalar: String,
    data: &TemplateData,
    strict: bool,
) -> Result<Value, TemplateError> {
    let placeholder = PLACEHOLDER
        .captures(&scalar)
        .and_then(|caps| Some((caps.get(0)?.end(), caps.get(1)?.as_str().to_string())));
    let Some((end, name)) = placeholder else {
        return Ok(Value::String(scalar));
    };

    let value = match data.get(&name) {
        Some(v) => v.clone(),
        None if strict => return Err(TemplateError::MissingKey(name)),
        None => Value::Null,
    };

    let suffix = &scalar[end..];
    if suffix.is_empty() {
        Ok(value)
    } else {
        Ok(Value::String(format!("{}{}", stringify(&value), suffix)))
    }
}

/// Replace every placeholder in `value`, keys included
pub fn substitute(
    value: Value,
    data: &TemplateData,
    strict: bool,
) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => resolve_scalar(s, data, strict),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| substitute(item, data, strict))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                out.insert(substitute(k, data, strict)?, substitute(v, data, strict)?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            Ok(Value::Tagged(Box::new(TaggedValue {
                tag,
                value: substitute(value, data, strict)?,
            })))
        }
        other => Ok(other),
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Renders YAML manifests. Stateless; cheap to copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Parse `yaml` and resolve its placeholders.
    ///
    /// With `strict`, a placeholder without a value is an error; otherwise it
    /// becomes null (or an empty string in front of a suffix).
    pub fn load(
        &self,
        yaml: &str,
        data: &TemplateData,
        strict: bool,
    ) -> Result<Value, TemplateError> {
        let parsed: Value = serde_yaml::from_str(yaml)?;
        substitute(parsed, data, strict)
    }

    pub fn load_template(
        &self,
        template: Template,
        data: &TemplateData,
        strict: bool,
    ) -> Result<Value, TemplateError> {
        self.load(template.source(), data, strict)
    }

    pub fn load_file(
        &self,
        path: &Path,
        data: &TemplateData,
        strict: bool,
    ) -> Result<Value, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(&content, data, strict)
    }

    pub fn dump(&self, value: &Value) -> Result<String, TemplateError> {
        Ok(serde_yaml::to_string(value)?)
    }

    pub fn replace_template(
        &self,
        template: Template,
        data: &TemplateData,
        strict: bool,
    ) -> Result<String, TemplateError> {
        let value = self.load_template(template, data, strict)?;
        self.dump(&value)
    }

    pub fn replace_file(
        &self,
        path: &Path,
        data: &TemplateData,
        strict: bool,
    ) -> Result<String, TemplateError> {
        let value = self.load_file(path, data, strict)?;
        self.dump(&value)
    }

    /// Non-strict replacement in a YAML string
    pub fn replace(&self, yaml: &str, data: &TemplateData) -> Result<String, TemplateError> {
        let value = self.load(yaml, data, false)?;
        self.dump(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn data(pairs: &[(&str, Value)]) -> TemplateData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_replace_whole_scalar() {
        let engine = TemplateEngine::new();
        let out = engine
            .replace("name: ${namespace}", &data(&[("namespace", "lab-1".into())]))
            .unwrap();
        assert_eq!(out, "name: lab-1\n");
    }

    #[test]
    fn test_missing_key_non_strict() {
        let out = TemplateEngine::new()
            .replace("name: ${namespace}", &TemplateData::new())
            .unwrap();
        assert_eq!(out, "name: null\n");
    }

    #[test]
    fn test_missing_key_strict() {
        let err = TemplateEngine::new()
            .load("name: ${namespace}", &TemplateData::new(), true)
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingKey(ref k) if k == "namespace"));
    }

    #[test]
    fn test_native_types_are_kept() {
        let engine = TemplateEngine::new();
        let value = engine
            .load(
                "cores: ${cores}\nenabled: ${enabled}\nlabel: ${label}",
                &data(&[
                    ("cores", 3.into()),
                    ("enabled", true.into()),
                    ("label", "x".into()),
                ]),
                true,
            )
            .unwrap();
        assert_eq!(value["cores"], Value::from(3));
        assert_eq!(value["enabled"], Value::Bool(true));
        assert_eq!(value["label"], Value::from("x"));
        assert_eq!(engine.dump(&value).unwrap(), "cores: 3\nenabled: true\nlabel: x\n");
    }

    #[test]
    fn test_suffix_is_concatenated() {
        let engine = TemplateEngine::new();
        let value = engine
            .load("memory: ${size}Gi", &data(&[("size", 3.into())]), true)
            .unwrap();
        assert_eq!(value["memory"], Value::from("3Gi"));

        let value = engine.load("memory: ${size}Gi", &TemplateData::new(), false).unwrap();
        assert_eq!(value["memory"], Value::from("Gi"));
    }

    #[test]
    fn test_placeholder_must_lead() {
        let value = TemplateEngine::new()
            .load("name: pre-${x}", &data(&[("x", "y".into())]), true)
            .unwrap();
        assert_eq!(value["name"], Value::from("pre-${x}"));
    }

    #[test]
    fn test_quoted_scalars_are_resolved() {
        let params = data(&[("x", 3.into())]);
        let engine = TemplateEngine::new();
        for yaml in ["a: \"${x}\"", "a: '${x}'", "a: ${x}"] {
            let value = engine.load(yaml, &params, true).unwrap();
            assert_eq!(value["a"], Value::from(3), "{}", yaml);
        }
        let value = engine.load("a: \" ${x}\"", &params, true).unwrap();
        assert_eq!(value["a"], Value::from(" ${x}"));
    }

    #[test]
    fn test_single_pass() {
        let value = TemplateEngine::new()
            .load(
                "a: ${first}",
                &data(&[("first", "${second}".into()), ("second", "nope".into())]),
                true,
            )
            .unwrap();
        assert_eq!(value["a"], Value::from("${second}"));
    }

    #[test]
    fn test_sequences_and_keys() {
        let yaml = "items:\n  - ${a}\n  - plain\n${key}: value\n";
        let value = TemplateEngine::new()
            .load(yaml, &data(&[("a", 1.into()), ("key", "resolved".into())]), true)
            .unwrap();
        assert_eq!(value["items"][0], Value::from(1));
        assert_eq!(value["items"][1], Value::from("plain"));
        assert_eq!(value["resolved"], Value::from("value"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = TemplateEngine::new()
            .load("a: [unclosed", &TemplateData::new(), false)
            .unwrap_err();
        assert!(matches!(err, TemplateError::Yaml(_)));
    }

    #[test]
    fn test_namespace_template() {
        let out = TemplateEngine::new()
            .replace_template(
                Template::Namespace,
                &data(&[("namespace", "p-u-1".into())]),
                true,
            )
            .unwrap();
        let value: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(value["kind"], Value::from("Namespace"));
        assert_eq!(value["metadata"]["name"], Value::from("p-u-1"));
    }

    #[test]
    fn test_vmi_template() {
        let engine = TemplateEngine::new();
        let params = data(&[
            ("cores", 3.into()),
            ("memory", "3G".into()),
            ("vm_image", "user/ubuntu:22.04".into()),
            ("vmi_name", "ubuntu".into()),
            ("namespace", "p-u-1".into()),
        ]);
        let value = engine
            .load_template(Template::VirtualMachineInstance, &params, true)
            .unwrap();
        assert_eq!(value["metadata"]["name"], Value::from("ubuntu"));
        assert_eq!(value["spec"]["domain"]["cpu"]["cores"], Value::from(3));
        assert_eq!(
            value["spec"]["domain"]["resources"]["requests"]["memory"],
            Value::from("3G")
        );
        assert_eq!(
            value["spec"]["volumes"][0]["containerDisk"]["image"],
            Value::from("user/ubuntu:22.04")
        );

        let mut partial = params.clone();
        partial.remove("vm_image");
        assert!(matches!(
            engine.load_template(Template::VirtualMachineInstance, &partial, true),
            Err(TemplateError::MissingKey(_))
        ));
    }

    #[test]
    fn test_all_templates_parse() {
        for template in Template::ALL {
            assert!(TemplateEngine::new()
                .load_template(template, &TemplateData::new(), false)
                .is_ok());
            assert_eq!(Template::from_name(template.file_name()).unwrap(), template);
        }
        assert!(matches!(
            Template::from_name("pod_template.yaml"),
            Err(TemplateError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_replace_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"metadata:\n  name: ${name}\n").unwrap();

        let out = TemplateEngine::new()
            .replace_file(file.path(), &data(&[("name", "vm1".into())]), true)
            .unwrap();
        assert_eq!(out, "metadata:\n  name: vm1\n");

        let err = TemplateEngine::new()
            .replace_file(Path::new("/nonexistent.yaml"), &TemplateData::new(), false)
            .unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }
}
