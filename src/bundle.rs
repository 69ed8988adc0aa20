//! FHIR R4 resources emitted for a catalog and the builder that assembles them.
//!
//! Field order on every struct follows the order the resources are written in,
//! so the serialized JSON reads the same as hand-maintained master data.

use crate::catalogs::BundleConfig;
use crate::error::BundleError;
use crate::parsers::{CatalogCsvParser, CatalogRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_CANONICAL_BASE: &str = "http://terminology.hl7.org";
pub const RESOURCE_VERSION: &str = "1.0.0";
pub const PUBLISHER: &str = "FHIR Service";
pub const IDENTIFIER_SYSTEM: &str = "urn:ietf:rfc:3986";

/// Publication date stamped on generated resources unless overridden
pub fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 5).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: Resource,
    pub request: BundleRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRequest {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    CodeSystem(CodeSystem),
    ValueSet(ValueSet),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystem {
    pub id: String,
    pub url: String,
    pub identifier: Vec<Identifier>,
    pub version: String,
    pub name: String,
    pub title: String,
    pub status: String,
    pub experimental: bool,
    pub date: NaiveDate,
    pub publisher: String,
    pub description: String,
    pub case_sensitive: bool,
    pub value_set: String,
    pub content: String,
    pub count: usize,
    pub concept: Vec<CodeSystemConcept>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSystemConcept {
    pub code: String,
    pub display: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    pub id: String,
    pub url: String,
    pub identifier: Vec<Identifier>,
    pub version: String,
    pub name: String,
    pub title: String,
    pub status: String,
    pub experimental: bool,
    pub date: NaiveDate,
    pub publisher: String,
    pub description: String,
    pub purpose: String,
    pub compose: Compose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compose {
    pub include: Vec<ComposeInclude>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeInclude {
    pub system: String,
    pub concept: Vec<ValueSetConcept>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSetConcept {
    pub code: String,
    pub display: String,
}

impl Bundle {
    pub fn code_system(&self) -> Option<&CodeSystem> {
        self.entry.iter().find_map(|e| match &e.resource {
            Resource::CodeSystem(cs) => Some(cs),
            _ => None,
        })
    }

    pub fn value_set(&self) -> Option<&ValueSet> {
        self.entry.iter().find_map(|e| match &e.resource {
            Resource::ValueSet(vs) => Some(vs),
            _ => None,
        })
    }

    /// Number of concepts carried by the CodeSystem
    pub fn concept_count(&self) -> usize {
        self.code_system().map(|cs| cs.concept.len()).unwrap_or(0)
    }
}

/// Settings shared by every bundle in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub date: NaiveDate,
    /// Base for canonical CodeSystem/ValueSet urls, without trailing slash
    pub canonical_base: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            date: default_date(),
            canonical_base: DEFAULT_CANONICAL_BASE.to_string(),
        }
    }
}

impl BuildOptions {
    pub fn code_system_url(&self, bundle_name: &str) -> String {
        format!("{}/CodeSystem/{}", self.canonical_base, bundle_name)
    }

    pub fn value_set_url(&self, bundle_name: &str) -> String {
        format!("{}/ValueSet/{}", self.canonical_base, bundle_name)
    }
}

pub struct BundleBuilder<'a> {
    config: &'a BundleConfig,
    options: &'a BuildOptions,
}

impl<'a> BundleBuilder<'a> {
    pub fn new(config: &'a BundleConfig, options: &'a BuildOptions) -> Self {
        Self { config, options }
    }

    /// Read a catalog CSV and build its transaction bundle
    pub fn build_from_csv(&self, csv_path: &Path) -> Result<Bundle, BundleError> {
        debug!("Reading catalog rows from {:?}", csv_path);
        let rows = CatalogCsvParser::read_all(csv_path)?;
        debug!("Read {} rows for {}", rows.len(), self.config.bundle_name);
        Ok(self.build(&rows))
    }

    pub fn build(&self, rows: &[CatalogRow]) -> Bundle {
        let prefix = &self.config.code_system.definition_prefix;

        let (concepts, vs_concepts): (Vec<_>, Vec<_>) = rows
            .iter()
            .map(|row| {
                (
                    CodeSystemConcept {
                        code: row.code.clone(),
                        display: row.display.clone(),
                        definition: format!("{}: {}", prefix, row.display),
                    },
                    ValueSetConcept {
                        code: row.code.clone(),
                        display: row.display.clone(),
                    },
                )
            })
            .unzip();

        let name = &self.config.bundle_name;

        Bundle {
            resource_type: "Bundle".to_string(),
            bundle_type: "transaction".to_string(),
            entry: vec![
                BundleEntry {
                    full_url: format!("urn:uuid:{}-codesystem", name),
                    resource: Resource::CodeSystem(self.code_system(concepts)),
                    request: BundleRequest {
                        method: "POST".to_string(),
                        url: "CodeSystem".to_string(),
                    },
                },
                BundleEntry {
                    full_url: format!("urn:uuid:{}-valueset", name),
                    resource: Resource::ValueSet(self.value_set(vs_concepts)),
                    request: BundleRequest {
                        method: "POST".to_string(),
                        url: "ValueSet".to_string(),
                    },
                },
            ],
        }
    }

    fn code_system(&self, concept: Vec<CodeSystemConcept>) -> CodeSystem {
        let info = &self.config.code_system;
        let name = &self.config.bundle_name;

        CodeSystem {
            id: name.clone(),
            url: self.options.code_system_url(name),
            identifier: vec![Identifier {
                system: IDENTIFIER_SYSTEM.to_string(),
                value: info.oid.clone(),
            }],
            version: RESOURCE_VERSION.to_string(),
            name: info.name.clone(),
            title: info.title.clone(),
            status: "active".to_string(),
            experimental: false,
            date: self.options.date,
            publisher: PUBLISHER.to_string(),
            description: info.description.clone(),
            case_sensitive: true,
            value_set: self.options.value_set_url(name),
            content: "complete".to_string(),
            count: concept.len(),
            concept,
        }
    }

    fn value_set(&self, concept: Vec<ValueSetConcept>) -> ValueSet {
        let info = &self.config.value_set;
        let name = &self.config.bundle_name;

        ValueSet {
            id: format!("{}-vs", name),
            url: self.options.value_set_url(name),
            identifier: vec![Identifier {
                system: IDENTIFIER_SYSTEM.to_string(),
                value: info.oid.clone(),
            }],
            version: RESOURCE_VERSION.to_string(),
            name: info.name.clone(),
            title: info.title.clone(),
            status: "active".to_string(),
            experimental: false,
            date: self.options.date,
            publisher: PUBLISHER.to_string(),
            description: info.description.clone(),
            purpose: info.purpose.clone(),
            compose: Compose {
                include: vec![ComposeInclude {
                    system: self.options.code_system_url(name),
                    concept,
                }],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogs;
    use std::io::Write;

    fn rows(pairs: &[(&str, &str)]) -> Vec<CatalogRow> {
        pairs
            .iter()
            .map(|(code, display)| CatalogRow {
                code: code.to_string(),
                display: display.to_string(),
            })
            .collect()
    }

    fn route() -> BundleConfig {
        catalogs::find(&catalogs::builtin(), "route.csv").unwrap().clone()
    }

    #[test]
    fn test_concepts_and_definitions() {
        let config = route();
        let options = BuildOptions::default();
        let bundle = BundleBuilder::new(&config, &options)
            .build(&rows(&[("PO", "Oral"), ("IV", "Intravenous"), ("SC", "Subcutaneous")]));

        let cs = bundle.code_system().unwrap();
        assert_eq!(cs.count, 3);
        assert_eq!(cs.concept.len(), 3);
        assert_eq!(cs.concept[1].code, "IV");
        assert_eq!(cs.concept[1].definition, "Medication route: Intravenous");
        assert_eq!(bundle.concept_count(), 3);
    }

    #[test]
    fn test_value_set_mirrors_code_system() {
        let config = route();
        let options = BuildOptions::default();
        let bundle = BundleBuilder::new(&config, &options)
            .build(&rows(&[("PO", "Oral"), ("IV", "Intravenous")]));

        let cs = bundle.code_system().unwrap();
        let vs = bundle.value_set().unwrap();
        assert_eq!(vs.compose.include.len(), 1);

        let include = &vs.compose.include[0];
        assert_eq!(include.system, cs.url);
        let pairs: Vec<_> = include.concept.iter().map(|c| (&c.code, &c.display)).collect();
        let expected: Vec<_> = cs.concept.iter().map(|c| (&c.code, &c.display)).collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_resource_metadata() {
        let config = route();
        let options = BuildOptions::default();
        let bundle = BundleBuilder::new(&config, &options).build(&[]);

        assert_eq!(bundle.resource_type, "Bundle");
        assert_eq!(bundle.bundle_type, "transaction");
        assert_eq!(bundle.entry.len(), 2);
        assert_eq!(bundle.entry[0].full_url, "urn:uuid:route-codesystem");
        assert_eq!(bundle.entry[0].request.url, "CodeSystem");
        assert_eq!(bundle.entry[1].full_url, "urn:uuid:route-valueset");
        assert_eq!(bundle.entry[1].request.method, "POST");

        let cs = bundle.code_system().unwrap();
        assert_eq!(cs.id, "route");
        assert_eq!(cs.url, "http://terminology.hl7.org/CodeSystem/route");
        assert_eq!(cs.value_set, "http://terminology.hl7.org/ValueSet/route");
        assert_eq!(cs.identifier[0].value, "urn:oid:2.16.840.1.113883.4.642.1.2008");

        let vs = bundle.value_set().unwrap();
        assert_eq!(vs.id, "route-vs");
        assert_eq!(vs.url, "http://terminology.hl7.org/ValueSet/route");
        assert_eq!(vs.identifier[0].system, IDENTIFIER_SYSTEM);
        assert_eq!(vs.name, "RouteVS");
    }

    #[test]
    fn test_empty_catalog() {
        let config = route();
        let options = BuildOptions::default();
        let bundle = BundleBuilder::new(&config, &options).build(&[]);

        let cs = bundle.code_system().unwrap();
        assert_eq!(cs.count, 0);
        assert!(cs.concept.is_empty());
        assert!(bundle.value_set().unwrap().compose.include[0].concept.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let config = route();
        let options = BuildOptions::default();
        let bundle = BundleBuilder::new(&config, &options).build(&rows(&[("PO", "Oral")]));

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["type"], "transaction");
        let cs = &value["entry"][0]["resource"];
        assert_eq!(cs["resourceType"], "CodeSystem");
        assert_eq!(cs["caseSensitive"], true);
        assert_eq!(cs["experimental"], false);
        assert_eq!(cs["date"], "2025-08-05");
        assert_eq!(cs["count"], 1);
        assert_eq!(cs["concept"][0]["definition"], "Medication route: Oral");

        let vs = &value["entry"][1]["resource"];
        assert_eq!(vs["resourceType"], "ValueSet");
        assert!(vs["compose"]["include"][0]["concept"][0].get("definition").is_none());

        let parsed: Bundle = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn test_custom_options() {
        let config = route();
        let options = BuildOptions {
            date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            canonical_base: "https://example.org/fhir".to_string(),
        };
        let bundle = BundleBuilder::new(&config, &options).build(&[]);
        let cs = bundle.code_system().unwrap();
        assert_eq!(cs.url, "https://example.org/fhir/CodeSystem/route");
        assert_eq!(cs.date, options.date);
    }

    #[test]
    fn test_build_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("Route Code,Route Name\n\"PO\",\"Oral\"\nIM,Intramuscular\n".as_bytes())
            .unwrap();

        let config = route();
        let options = BuildOptions::default();
        let bundle = BundleBuilder::new(&config, &options)
            .build_from_csv(file.path())
            .unwrap();
        let cs = bundle.code_system().unwrap();
        assert_eq!(cs.count, 2);
        assert_eq!(cs.concept[0].code, "PO");
        assert_eq!(cs.concept[1].definition, "Medication route: Intramuscular");
    }

    #[test]
    fn test_build_from_missing_csv() {
        let config = route();
        let options = BuildOptions::default();
        let err = BundleBuilder::new(&config, &options)
            .build_from_csv(Path::new("/no/such/route.csv"))
            .unwrap_err();
        assert!(matches!(err, BundleError::Io(_)));
    }
}
