//! Chart definition and loading

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::values::Values;

/// File name of the chart metadata at the chart root
pub const METADATA_FILE: &str = "Chart.yaml";

/// Directory holding the template sources
pub const TEMPLATES_DIR: &str = "templates";

/// Extension of template source files (kept on the rendered output)
pub const TEMPLATE_EXTENSION: &str = ".tf";

/// Chart metadata, as read from `Chart.yaml`
///
/// Required fields default to empty strings so that a chart missing them
/// still loads and is rejected later by the validator with a clear reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartMetadata {
    /// Chart name (required)
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: String,

    /// Chart version (required, SemVer recommended)
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,

    /// Provider family, e.g. `aws`, `gcp`, `azure`
    #[serde(rename = "type", default, deserialize_with = "scalar_string")]
    pub chart_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Home URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Maintainer information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fail on undefined variables
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_true() -> bool {
    true
}

/// Accept any YAML scalar where a string is expected (`version: 1.0`)
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected a scalar value")),
    }
}

/// One template source file
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateUnit {
    /// File name, extension included (`network.tf`)
    pub name: String,

    /// Path relative to the templates directory; also the output path
    /// relative to the output directory
    pub relative_path: PathBuf,

    /// Raw template source
    pub content: String,
}

impl TemplateUnit {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            relative_path: PathBuf::from(&name),
            name,
            content: content.into(),
        }
    }

    /// The top-level values key whose presence enables this template
    pub fn enablement_key(&self) -> &str {
        self.name
            .strip_suffix(TEMPLATE_EXTENSION)
            .unwrap_or(&self.name)
    }
}

/// A loaded chart: metadata, the values driving it and its templates
#[derive(Debug, Clone)]
pub struct Chart {
    pub metadata: ChartMetadata,

    /// Values document for this render (empty until attached)
    pub values: Values,

    /// Templates, sorted by file name
    pub templates: Vec<TemplateUnit>,

    /// Root directory of the chart (empty for in-memory charts)
    pub root: PathBuf,
}

impl Chart {
    /// Build a chart in memory
    pub fn new(metadata: ChartMetadata, templates: Vec<TemplateUnit>) -> Self {
        Self {
            metadata,
            values: Values::new(),
            templates,
            root: PathBuf::new(),
        }
    }

    /// Attach the values document driving this render
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    /// Load a chart from a directory
    ///
    /// Reads `Chart.yaml`, creates `templates/` if it is missing and reads
    /// every `.tf` file directly inside it. An empty chart loads fine; it is
    /// the validator's job to reject it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let metadata_path = root.join(METADATA_FILE);
        let content = std::fs::read_to_string(&metadata_path)
            .map_err(|e| CoreError::io(&metadata_path, e))?;
        let metadata = ChartMetadata::from_yaml(&content, &metadata_path.display().to_string())?;

        let templates_dir = root.join(TEMPLATES_DIR);
        std::fs::create_dir_all(&templates_dir).map_err(|e| CoreError::io(&templates_dir, e))?;
        let templates = load_templates(&templates_dir)?;

        Ok(Self {
            metadata,
            values: Values::new(),
            templates,
            root,
        })
    }

    /// Look up a template by file name
    pub fn template(&self, name: &str) -> Option<&TemplateUnit> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Run the structural validator on this chart
    pub fn validate(&self) -> Result<()> {
        crate::validate::validate_chart(Some(self))
    }
}

impl ChartMetadata {
    /// Parse metadata, naming `source` in any error
    pub fn from_yaml(yaml: &str, source: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CoreError::parse(source, e))
    }
}

/// Read the immediate `.tf` files of the templates directory
fn load_templates(templates_dir: &Path) -> Result<Vec<TemplateUnit>> {
    let entries =
        std::fs::read_dir(templates_dir).map_err(|e| CoreError::io(templates_dir, e))?;

    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(templates_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(TEMPLATE_EXTENSION) {
            continue;
        }

        let content = std::fs::read_to_string(&path).map_err(|e| CoreError::io(&path, e))?;
        templates.push(TemplateUnit::new(name, content));
    }

    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}
