//! Raw API document types: the parts of OpenAPI 3 and RAML 1.0 that describe models and paths.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OpenApiDocument {
    #[serde(default)]
    pub openapi: Option<String>,
    #[serde(default)]
    pub info: Option<InfoObject>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default)]
    pub components: Components,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InfoObject {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaObject>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchemaObject {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaObject>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,
}

/// Only which methods a path declares matters; operation bodies are not modelled.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<serde_yaml::Value>,
    #[serde(default)]
    pub put: Option<serde_yaml::Value>,
    #[serde(default)]
    pub post: Option<serde_yaml::Value>,
    #[serde(default)]
    pub patch: Option<serde_yaml::Value>,
    #[serde(default)]
    pub delete: Option<serde_yaml::Value>,
}

impl PathItem {
    pub fn methods(&self) -> Vec<&'static str> {
        [
            ("GET", self.get.is_some()),
            ("PUT", self.put.is_some()),
            ("POST", self.post.is_some()),
            ("PATCH", self.patch.is_some()),
            ("DELETE", self.delete.is_some()),
        ]
        .into_iter()
        .filter_map(|(m, present)| present.then_some(m))
        .collect()
    }
}

/// RAML document. Resources are the top-level keys starting with `/`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RamlDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub types: BTreeMap<String, RamlType>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RamlType {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, RamlProperty>,
}

/// `name: string` shorthand or the expanded map form.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RamlProperty {
    Shorthand(String),
    Full {
        #[serde(rename = "type", default)]
        type_: Option<String>,
        #[serde(default)]
        required: Option<bool>,
        #[serde(default)]
        format: Option<String>,
    },
}

impl RamlProperty {
    pub fn type_name(&self) -> Option<&str> {
        match self {
            RamlProperty::Shorthand(s) => Some(s.as_str()),
            RamlProperty::Full { type_, .. } => type_.as_deref(),
        }
    }

    pub fn format(&self) -> Option<&str> {
        match self {
            RamlProperty::Shorthand(_) => None,
            RamlProperty::Full { format, .. } => format.as_deref(),
        }
    }

    /// RAML properties are required unless marked otherwise.
    pub fn required(&self) -> bool {
        match self {
            RamlProperty::Shorthand(_) => true,
            RamlProperty::Full { required, .. } => required.unwrap_or(true),
        }
    }
}

/// Which document format to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocFormat {
    OpenApi,
    Raml,
}

impl DocFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openapi" | "swagger" => Some(DocFormat::OpenApi),
            "raml" => Some(DocFormat::Raml),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("raml") => DocFormat::Raml,
            _ => DocFormat::OpenApi,
        }
    }
}
