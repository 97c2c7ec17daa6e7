// env_loader.rs
//! `.env` support for the binaries. Variables already present in the process
//! environment always win over file entries.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_FILE_CANDIDATES: [&str; 3] = [".env", ".env.local", "../.env"];

/// Loads the first `.env` candidate that exists. Returns the file used, if any.
pub fn load_env() -> Option<PathBuf> {
    for candidate in ENV_FILE_CANDIDATES {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match load_env_from_file(path) {
            Ok(applied) => {
                info!("Loaded {} environment variables from {}", applied, candidate);
                return Some(path.to_path_buf());
            }
            Err(e) => warn!("Failed to load environment from {}: {:#}", candidate, e),
        }
    }
    info!("No .env file found, using environment variables from system");
    None
}

/// Applies every `KEY=value` entry of `path` that is not already set.
/// Returns how many variables were set.
pub fn load_env_from_file(path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;

    let mut applied = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(&key).is_some() {
            debug!("Keeping existing value for {}", key);
            continue;
        }
        std::env::set_var(&key, &value);
        debug!("Set env var from file: {} = {}", key, value);
        applied += 1;
    }
    Ok(applied)
}

/// Parses one line. Comments, blank lines and lines without `=` yield `None`.
/// An `export ` prefix and surrounding quotes on the value are dropped.
pub fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_quoted_values() {
        assert_eq!(
            parse_env_line("GRAPH_OUTPUT_DIR=outputs"),
            Some(("GRAPH_OUTPUT_DIR".to_string(), "outputs".to_string()))
        );
        assert_eq!(
            parse_env_line(r#"export GRAPH_MODE = "org_org" "#),
            Some(("GRAPH_MODE".to_string(), "org_org".to_string()))
        );
        assert_eq!(
            parse_env_line("GRAPH_OUTPUT_FORMAT='kumu'"),
            Some(("GRAPH_OUTPUT_FORMAT".to_string(), "kumu".to_string()))
        );
    }

    #[test]
    fn skips_comments_and_junk() {
        assert_eq!(parse_env_line("# GRAPH_MODE=org_org"), None);
        assert_eq!(parse_env_line("   "), None);
        assert_eq!(parse_env_line("no equals sign"), None);
        assert_eq!(parse_env_line("=value"), None);
    }

    #[test]
    fn file_values_do_not_override_existing_variables() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "ATTENDANCE_GRAPH_TEST_PRESET=from_file\nATTENDANCE_GRAPH_TEST_NEW=fresh\n",
        )
        .unwrap();
        std::env::set_var("ATTENDANCE_GRAPH_TEST_PRESET", "from_process");

        let applied = load_env_from_file(&path).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(
            std::env::var("ATTENDANCE_GRAPH_TEST_PRESET").unwrap(),
            "from_process"
        );
        assert_eq!(std::env::var("ATTENDANCE_GRAPH_TEST_NEW").unwrap(), "fresh");
    }
}
