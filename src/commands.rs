use crate::bundle::BundleBuilder;
use crate::catalogs::{self, BundleConfig};
use crate::config::Settings;
use crate::error::BundleError;
use crate::output::{self, OutputMode, WrittenBundle};
use crate::parsers::BundleR4Parser;
use crate::verify;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateStatus {
    Generated { concepts: usize, file_name: String },
    NotFound,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    pub csv_file: String,
    pub bundle_name: String,
    pub status: GenerateStatus,
}

impl GenerateResult {
    pub fn success(&self) -> bool {
        matches!(self.status, GenerateStatus::Generated { .. })
    }
}

/// Build and write one catalog's bundle
async fn generate_catalog(
    config: &BundleConfig,
    settings: &Settings,
    mode: OutputMode,
) -> Result<(usize, WrittenBundle), BundleError> {
    let csv_path = settings.input_dir.join(&config.csv_file);
    let bundle = BundleBuilder::new(config, &settings.build).build_from_csv(&csv_path)?;
    let written =
        output::write_bundle(&bundle, &config.bundle_name, &settings.output_dir, mode).await?;
    Ok((bundle.concept_count(), written))
}

/// Generate every configured catalog. A missing or broken catalog is reported
/// and skipped; the rest still get generated.
pub async fn generate_all<W: Write>(settings: &Settings, out: &mut W) -> Result<Vec<GenerateResult>> {
    let mut results = Vec::with_capacity(settings.catalogs.len());

    for config in &settings.catalogs {
        let csv_path = settings.input_dir.join(&config.csv_file);

        let status = if !csv_path.exists() {
            warn!("Catalog CSV not found: {:?}", csv_path);
            writeln!(out, "✗ {}: File not found", config.csv_file)?;
            GenerateStatus::NotFound
        } else {
            match generate_catalog(config, settings, OutputMode::Batch).await {
                Ok((concepts, written)) => {
                    let file_name = OutputMode::Batch.file_name(&config.bundle_name);
                    writeln!(
                        out,
                        "✓ {}: Generated complete bundle with {} concepts",
                        config.csv_file,
                        format_thousands(concepts)
                    )?;
                    writeln!(out, "  Saved to: {}", file_name)?;
                    info!(
                        "{} -> {:?} ({} concepts, sha256 {})",
                        config.csv_file, written.path, concepts, written.sha256
                    );
                    GenerateStatus::Generated { concepts, file_name }
                }
                Err(e) => {
                    error!("Failed to generate {}: {}", config.csv_file, e);
                    writeln!(out, "✗ {}: Error - {}", config.csv_file, e)?;
                    GenerateStatus::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        results.push(GenerateResult {
            csv_file: config.csv_file.clone(),
            bundle_name: config.bundle_name.clone(),
            status,
        });
    }

    writeln!(
        out,
        "\nGeneration complete! All bundles now contain complete data with explicit ValueSet concepts."
    )?;

    Ok(results)
}

/// Generate a single catalog. Any failure is returned to the caller.
pub async fn generate_one<W: Write>(
    settings: &Settings,
    key: &str,
    out: &mut W,
) -> Result<WrittenBundle> {
    let config = catalogs::find(&settings.catalogs, key)?;

    let (concepts, written) = generate_catalog(config, settings, OutputMode::Single)
        .await
        .with_context(|| format!("Failed to generate bundle for {}", config.csv_file))?;

    writeln!(out, "Generated complete bundle with {} concepts", concepts)?;
    writeln!(out, "Saved to: {}", written.path.display())?;
    info!("{} bytes, sha256 {}", written.bytes, written.sha256);

    Ok(written)
}

/// Check a bundle file on disk. Returns `true` when no problems were found.
pub async fn verify_bundle<W: Write>(
    path: &Path,
    expected_sha256: Option<&str>,
    out: &mut W,
) -> Result<bool> {
    let summary = BundleR4Parser::parse_file(path)?;
    let mut problems = verify::check_bundle(&summary);

    if let Some(expected) = expected_sha256 {
        let matches = output::validate_file_hash(path, expected)
            .await
            .context("Failed to hash bundle file")?;
        if !matches {
            problems.push(format!("SHA-256 does not match {}", expected));
        }
    }

    if problems.is_empty() {
        let concepts = summary
            .code_system
            .as_ref()
            .map(|cs| cs.concepts.len())
            .unwrap_or(0);
        writeln!(
            out,
            "✓ {}: {} concepts, CodeSystem and ValueSet consistent",
            path.display(),
            format_thousands(concepts)
        )?;
        Ok(true)
    } else {
        for problem in &problems {
            writeln!(out, "✗ {}: {}", path.display(), problem)?;
        }
        Ok(false)
    }
}

pub fn list_catalogs<W: Write>(settings: &Settings, out: &mut W) -> Result<()> {
    for config in &settings.catalogs {
        writeln!(
            out,
            "{:<18} {:<22} {}",
            config.csv_file, config.bundle_name, config.code_system.title
        )?;
    }
    Ok(())
}

/// `1234567` -> `"1,234,567"`
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(c);
    }
    formatted
}
