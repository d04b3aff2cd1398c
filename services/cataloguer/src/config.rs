//! Configuration for the `cmip5` command.
//!
//! Catalogue locations are resolved in priority order: command-line flags,
//! the YAML file, the environment (`CMIP5_ROOT`, `CMIP5_CATALOGUE`,
//! `CMIP5_SHARED_CATALOGUE`), then built-in defaults.
//!
//! YAML content supports `${VAR}` and `${VAR:-default}` substitution, and
//! paths may start with `~`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use catalogue::{expand_path, CatalogueConfig};

// ============================================================================
// File configuration (cmip5.yaml)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub catalogue: CatalogueSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueSection {
    pub root_dir: Option<String>,
    pub local_file: Option<String>,
    pub shared_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    /// `text` or `json`
    pub format: Option<String>,
}

/// Load a YAML configuration file.
pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let expanded = expand_env_vars(&content)?;
    serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Catalogue locations given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub root_dir: Option<PathBuf>,
    pub local_file: Option<PathBuf>,
    pub shared_file: Option<PathBuf>,
}

/// Combine flags, file configuration and `base` (environment or defaults).
pub fn resolve(overrides: &PathOverrides, file: &FileConfig, base: CatalogueConfig) -> CatalogueConfig {
    let pick = |flag: &Option<PathBuf>, yaml: &Option<String>, fallback: PathBuf| {
        flag.as_deref()
            .map(|p| expand_path(&p.to_string_lossy()))
            .or_else(|| yaml.as_deref().map(expand_path))
            .unwrap_or(fallback)
    };
    let section = &file.catalogue;

    CatalogueConfig::new(
        pick(&overrides.root_dir, &section.root_dir, base.root_dir),
        pick(&overrides.local_file, &section.local_file, base.local_file),
        pick(&overrides.shared_file, &section.shared_file, base.shared_file),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("CMIP5_TEST_ROOT", "/data/cmip5");
        let result = expand_env_vars("root_dir: ${CMIP5_TEST_ROOT}/output1").unwrap();
        assert_eq!(result, "root_dir: /data/cmip5/output1");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let result = expand_env_vars("${CMIP5_TEST_UNSET_VAR:-/badc}/cmip5").unwrap();
        assert_eq!(result, "/badc/cmip5");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        assert!(expand_env_vars("${CMIP5_TEST_REQUIRED_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmip5.yaml");
        fs::write(&path, "catalogue:\n  root_dir: /archive/output1\nlogging:\n  format: json\n").unwrap();

        let config = load_file_config(&path).unwrap();
        assert_eq!(config.catalogue.root_dir.as_deref(), Some("/archive/output1"));
        assert_eq!(config.catalogue.local_file, None);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.logging.level, None);
    }

    #[test]
    fn test_load_shipped_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/cmip5.yaml");
        let config = load_file_config(&path).unwrap();
        assert!(config.catalogue.root_dir.is_some());
    }

    #[test]
    fn test_resolve_priority() {
        let base = CatalogueConfig::new("/env/root", "/env/local.csv", "/env/shared.csv");
        let file = FileConfig {
            catalogue: CatalogueSection {
                root_dir: Some("/yaml/root".into()),
                local_file: Some("/yaml/local.csv".into()),
                shared_file: None,
            },
            ..Default::default()
        };
        let overrides = PathOverrides {
            root_dir: Some(PathBuf::from("/cli/root")),
            ..Default::default()
        };

        let config = resolve(&overrides, &file, base);
        assert_eq!(config.root_dir, PathBuf::from("/cli/root"));
        assert_eq!(config.local_file, PathBuf::from("/yaml/local.csv"));
        assert_eq!(config.shared_file, PathBuf::from("/env/shared.csv"));
    }
}
