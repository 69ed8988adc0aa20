use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// CodeSystem as read back from a bundle file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeSystemEntry {
    pub url: Option<String>,
    pub name: Option<String>,
    pub count: Option<u64>,
    pub concepts: Vec<ConceptEntry>,
}

/// ValueSet as read back from a bundle file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueSetEntry {
    pub url: Option<String>,
    pub name: Option<String>,
    pub includes: Vec<IncludeEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeEntry {
    pub system: Option<String>,
    pub concepts: Vec<ConceptEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub code: String,
    pub display: Option<String>,
    pub definition: Option<String>,
}

/// Loosely-typed view of a transaction bundle, so that malformed files can
/// still be inspected field by field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleSummary {
    pub resource_type: Option<String>,
    pub bundle_type: Option<String>,
    pub entry_count: usize,
    pub code_system: Option<CodeSystemEntry>,
    pub value_set: Option<ValueSetEntry>,
}

pub struct BundleR4Parser;

impl BundleR4Parser {
    /// Parse a FHIR R4 Bundle JSON file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<BundleSummary> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read bundle file {:?}", path.as_ref()))?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<BundleSummary> {
        let bundle: Value = serde_json::from_str(content).context("Failed to parse JSON")?;
        Ok(Self::summarize(&bundle))
    }

    fn summarize(bundle: &Value) -> BundleSummary {
        let mut summary = BundleSummary {
            resource_type: str_field(bundle, "resourceType"),
            bundle_type: str_field(bundle, "type"),
            ..Default::default()
        };

        let entries = match bundle.get("entry").and_then(|v| v.as_array()) {
            Some(entries) => entries,
            None => return summary,
        };
        summary.entry_count = entries.len();

        for resource in entries.iter().filter_map(|e| e.get("resource")) {
            match resource.get("resourceType").and_then(|v| v.as_str()) {
                Some("CodeSystem") if summary.code_system.is_none() => {
                    summary.code_system = Some(Self::parse_code_system(resource));
                }
                Some("ValueSet") if summary.value_set.is_none() => {
                    summary.value_set = Some(Self::parse_value_set(resource));
                }
                _ => {}
            }
        }

        summary
    }

    fn parse_code_system(resource: &Value) -> CodeSystemEntry {
        CodeSystemEntry {
            url: str_field(resource, "url"),
            name: str_field(resource, "name"),
            count: resource.get("count").and_then(|v| v.as_u64()),
            concepts: Self::parse_concepts(resource.get("concept")),
        }
    }

    fn parse_value_set(resource: &Value) -> ValueSetEntry {
        let includes = resource
            .get("compose")
            .and_then(|c| c.get("include"))
            .and_then(|v| v.as_array())
            .map(|includes| {
                includes
                    .iter()
                    .map(|include| IncludeEntry {
                        system: str_field(include, "system"),
                        concepts: Self::parse_concepts(include.get("concept")),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ValueSetEntry {
            url: str_field(resource, "url"),
            name: str_field(resource, "name"),
            includes,
        }
    }

    /// Concepts without a string `code` are dropped
    fn parse_concepts(concepts: Option<&Value>) -> Vec<ConceptEntry> {
        concepts
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(ConceptEntry {
                            code: item.get("code")?.as_str()?.to_string(),
                            display: str_field(item, "display"),
                            definition: str_field(item, "definition"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}
