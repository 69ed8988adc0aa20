use crate::bundle::{default_date, BuildOptions, DEFAULT_CANONICAL_BASE};
use crate::catalogs::{self, BundleConfig};
use crate::error::BundleError;
use chrono::NaiveDate;
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

pub const ENV_INPUT_DIR: &str = "FHIR_BUNDLES_INPUT_DIR";
pub const ENV_OUTPUT_DIR: &str = "FHIR_BUNDLES_OUTPUT_DIR";
pub const ENV_CATALOGS: &str = "FHIR_BUNDLES_CATALOGS";
pub const ENV_DATE: &str = "FHIR_BUNDLES_DATE";
pub const ENV_CANONICAL_BASE: &str = "FHIR_BUNDLES_CANONICAL_BASE";

pub const DEFAULT_INPUT_DIR: &str = ".";
pub const DEFAULT_OUTPUT_DIR: &str = "../master-data";

/// Values given on the command line; `None` falls through to the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub catalogs: Option<PathBuf>,
    pub date: Option<String>,
    pub canonical_base: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub catalogs: Vec<BundleConfig>,
    pub build: BuildOptions,
}

impl Settings {
    /// Resolve from CLI overrides, then process environment, then defaults
    pub fn from_env(overrides: Overrides) -> Result<Self, BundleError> {
        let user_catalogs = ProjectDirs::from("org", "fhir-service", "fhir-bundles")
            .map(|dirs| dirs.config_dir().join("catalogs.json"))
            .filter(|path| path.exists());

        Self::resolve(overrides, |key| std::env::var(key).ok(), user_catalogs)
    }

    pub fn resolve<F>(
        overrides: Overrides,
        env: F,
        user_catalogs: Option<PathBuf>,
    ) -> Result<Self, BundleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input_dir = overrides
            .input_dir
            .or_else(|| env(ENV_INPUT_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));

        let output_dir = overrides
            .output_dir
            .or_else(|| env(ENV_OUTPUT_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let catalogs = match overrides
            .catalogs
            .or_else(|| env(ENV_CATALOGS).map(PathBuf::from))
            .or(user_catalogs)
        {
            Some(path) => {
                debug!("Loading catalog table from {:?}", path);
                catalogs::load(&path)?
            }
            None => catalogs::builtin(),
        };

        let date = match overrides.date.or_else(|| env(ENV_DATE)) {
            Some(raw) => parse_date(&raw)?,
            None => default_date(),
        };

        let canonical_base = match overrides.canonical_base.or_else(|| env(ENV_CANONICAL_BASE)) {
            Some(raw) => parse_canonical_base(&raw)?,
            None => DEFAULT_CANONICAL_BASE.to_string(),
        };

        Ok(Self {
            input_dir,
            output_dir,
            catalogs,
            build: BuildOptions {
                date,
                canonical_base,
            },
        })
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, BundleError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| BundleError::InvalidDate(raw.to_string()))
}

/// Accepts an absolute http(s) URL and drops any trailing slash
pub fn parse_canonical_base(raw: &str) -> Result<String, BundleError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|_| BundleError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(BundleError::InvalidUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(Overrides::default(), env_of(&[]), None).unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("."));
        assert_eq!(settings.output_dir, PathBuf::from("../master-data"));
        assert_eq!(settings.catalogs.len(), 10);
        assert_eq!(settings.build, BuildOptions::default());
    }

    #[test]
    fn test_cli_beats_env() {
        let overrides = Overrides {
            output_dir: Some(PathBuf::from("cli-out")),
            date: Some("2026-03-01".to_string()),
            ..Default::default()
        };
        let env = env_of(&[
            (ENV_OUTPUT_DIR, "env-out"),
            (ENV_INPUT_DIR, "env-in"),
            (ENV_DATE, "2020-01-01"),
            (ENV_CANONICAL_BASE, "https://fhir.example.org/"),
        ]);
        let settings = Settings::resolve(overrides, env, None).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("cli-out"));
        assert_eq!(settings.input_dir, PathBuf::from("env-in"));
        assert_eq!(settings.build.date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(settings.build.canonical_base, "https://fhir.example.org");
    }

    #[test]
    fn test_catalog_file_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&catalogs::builtin()[..1]).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let path = file.path().to_path_buf();
        let settings = Settings::resolve(
            Overrides::default(),
            env_of(&[]),
            Some(path.clone()),
        )
        .unwrap();
        assert_eq!(settings.catalogs.len(), 1);

        // Explicit env path wins over the user config file
        let env_path = path.to_string_lossy().to_string();
        let err = Settings::resolve(
            Overrides::default(),
            env_of(&[(ENV_CATALOGS, "/missing/catalogs.json")]),
            Some(path),
        )
        .unwrap_err();
        assert!(matches!(err, BundleError::Config(_)));

        let settings = Settings::resolve(
            Overrides::default(),
            env_of(&[(ENV_CATALOGS, env_path.as_str())]),
            None,
        )
        .unwrap();
        assert_eq!(settings.catalogs[0].bundle_name, "allergies");
    }

    #[test]
    fn test_invalid_values() {
        let overrides = Overrides {
            date: Some("05/08/2025".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(overrides, env_of(&[]), None).unwrap_err();
        assert!(matches!(err, BundleError::InvalidDate(_)));

        assert!(parse_canonical_base("not a url").is_err());
        assert!(parse_canonical_base("ftp://example.org").is_err());
        assert!(parse_canonical_base("mailto:someone@example.org").is_err());
        assert_eq!(
            parse_canonical_base("http://terminology.hl7.org/").unwrap(),
            "http://terminology.hl7.org"
        );
    }
}
