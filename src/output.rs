use crate::bundle::Bundle;
use crate::error::BundleError;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which generator produced a bundle; decides the output file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `generate-all`: `<slug>-bundle.json`
    Batch,
    /// `generate`: `<slug>-bundle-complete.json`
    Single,
}

impl OutputMode {
    pub fn file_name(&self, bundle_name: &str) -> String {
        match self {
            OutputMode::Batch => format!("{}-bundle.json", bundle_name),
            OutputMode::Single => format!("{}-bundle-complete.json", bundle_name),
        }
    }
}

/// A bundle that made it to disk
#[derive(Debug, Clone)]
pub struct WrittenBundle {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

/// Serialize with 4-space indentation and non-ASCII text left as-is
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, BundleError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Write a bundle into `output_dir`, creating the directory if needed
pub async fn write_bundle(
    bundle: &Bundle,
    bundle_name: &str,
    output_dir: &Path,
    mode: OutputMode,
) -> Result<WrittenBundle, BundleError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let path = output_dir.join(mode.file_name(bundle_name));
    let json = to_pretty_json(bundle)?;
    let sha256 = sha256_hex(&json);

    debug!("Writing {} bytes to {:?}", json.len(), path);
    tokio::fs::write(&path, &json).await?;
    info!("Wrote {:?} (sha256 {})", path, sha256);

    Ok(WrittenBundle {
        path,
        sha256,
        bytes: json.len(),
    })
}

/// Check a file against an expected SHA-256 hex digest (case-insensitive)
pub async fn validate_file_hash(path: &Path, expected_hash: &str) -> Result<bool, BundleError> {
    let bytes = tokio::fs::read(path).await?;
    let computed = sha256_hex(&bytes);
    debug!("Expected hash: {}", expected_hash);
    debug!("Computed hash: {}", computed);
    Ok(computed.eq_ignore_ascii_case(expected_hash.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BuildOptions, BundleBuilder};
    use crate::catalogs;
    use crate::parsers::CatalogRow;

    fn strength_bundle() -> Bundle {
        let config = catalogs::find(&catalogs::builtin(), "strength").unwrap().clone();
        let options = BuildOptions::default();
        BundleBuilder::new(&config, &options).build(&[CatalogRow {
            code: "mcg".to_string(),
            display: "Mikrogramm (µg)".to_string(),
        }])
    }

    #[test]
    fn test_file_names() {
        assert_eq!(OutputMode::Batch.file_name("route"), "route-bundle.json");
        assert_eq!(
            OutputMode::Single.file_name("brand-medications"),
            "brand-medications-bundle-complete.json"
        );
    }

    #[test]
    fn test_pretty_json_layout() {
        let json = String::from_utf8(to_pretty_json(&strength_bundle()).unwrap()).unwrap();

        assert!(json.starts_with("{\n    \"resourceType\": \"Bundle\",\n    \"type\": \"transaction\","));
        assert!(json.contains("\n            \"resource\": {\n                \"resourceType\": \"CodeSystem\","));
        assert!(json.contains("Mikrogramm (µg)"));
        assert!(!json.contains("\\u00b5"));
        assert!(!json.ends_with('\n'));

        let cs_pos = json.find("\"caseSensitive\"").unwrap();
        let count_pos = json.find("\"count\"").unwrap();
        let concept_pos = json.find("\"concept\"").unwrap();
        assert!(cs_pos < count_pos && count_pos < concept_pos);
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_write_bundle_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("master-data");
        let bundle = strength_bundle();

        let written = write_bundle(&bundle, "strength", &out, OutputMode::Batch)
            .await
            .unwrap();
        assert_eq!(written.path, out.join("strength-bundle.json"));

        let on_disk = std::fs::read(&written.path).unwrap();
        assert_eq!(on_disk.len(), written.bytes);
        assert_eq!(sha256_hex(&on_disk), written.sha256);

        let parsed: Bundle = serde_json::from_slice(&on_disk).unwrap();
        assert_eq!(parsed, bundle);

        assert!(validate_file_hash(&written.path, &written.sha256.to_uppercase())
            .await
            .unwrap());
        assert!(!validate_file_hash(&written.path, "00").await.unwrap());
    }
}
