use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::filter::SortOrder;

/// Default reviews per page requested from the upstream.
pub const DEFAULT_PAGE_COUNT: u32 = 25;
/// Upstream cap on the per-page count.
pub const MAX_PAGE_COUNT: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub source: SourceConfig,
}

/// Where and how pages are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the reviews endpoint.
    #[serde(default)]
    pub url: Option<String>,
    /// Reviews per page, clamped to 1..=500 by the resolver.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Upstream sort order.
    #[serde(default)]
    pub sort: SortOrder,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            count: default_count(),
            sort: SortOrder::default(),
        }
    }
}

/// Settings after layering CLI flags over env vars over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub count: u32,
    pub sort: SortOrder,
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("raves/config.toml"))
}

pub fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the fetch source. Precedence: CLI flag, then `RAVES_API_URL` /
/// `RAVES_PAGE_COUNT`, then the config file, then defaults. Fails only when
/// no layer provides a URL.
pub fn resolve_source(
    cli_url: Option<&str>,
    cli_count: Option<u32>,
    cli_sort: Option<SortOrder>,
    config: &UserConfig,
) -> Result<ResolvedSource> {
    let env_url = env::var("RAVES_API_URL").ok();
    let env_count = env::var("RAVES_PAGE_COUNT")
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok());

    resolve_source_inner(cli_url, cli_count, cli_sort, env_url, env_count, config)
}

fn resolve_source_inner(
    cli_url: Option<&str>,
    cli_count: Option<u32>,
    cli_sort: Option<SortOrder>,
    env_url: Option<String>,
    env_count: Option<u32>,
    config: &UserConfig,
) -> Result<ResolvedSource> {
    let url = cli_url
        .map(ToString::to_string)
        .or(env_url)
        .or_else(|| config.source.url.clone())
        .context("No reviews API URL configured; pass --url or set RAVES_API_URL")?;

    let count = cli_count
        .or(env_count)
        .unwrap_or(config.source.count)
        .clamp(1, MAX_PAGE_COUNT);

    let sort = cli_sort.unwrap_or(config.source.sort);

    Ok(ResolvedSource { url, count, sort })
}

const fn default_count() -> u32 {
    DEFAULT_PAGE_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_user_config_from(&dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, UserConfig::default());
        assert_eq!(cfg.source.count, DEFAULT_PAGE_COUNT);
        assert_eq!(cfg.source.sort, SortOrder::DateDesc);
    }

    #[test]
    fn config_file_parses_source_table() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[source]
url = "https://reviews.example.com/api"
count = 50
sort = "stars"
"#,
        )
        .expect("write config");

        let cfg = load_user_config_from(&path).expect("load");
        assert_eq!(
            cfg.source.url.as_deref(),
            Some("https://reviews.example.com/api")
        );
        assert_eq!(cfg.source.count, 50);
        assert_eq!(cfg.source.sort, SortOrder::Stars);
    }

    #[test]
    fn broken_config_file_reports_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "source = 3").expect("write config");

        let err = load_user_config_from(&path).expect_err("parse should fail");
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn cli_url_beats_env_and_file() {
        let config = UserConfig {
            source: SourceConfig {
                url: Some("https://file.example.com".to_string()),
                ..SourceConfig::default()
            },
        };
        let resolved = resolve_source_inner(
            Some("https://cli.example.com"),
            None,
            None,
            Some("https://env.example.com".to_string()),
            None,
            &config,
        )
        .expect("resolve");
        assert_eq!(resolved.url, "https://cli.example.com");
    }

    #[test]
    fn env_url_beats_file() {
        let config = UserConfig {
            source: SourceConfig {
                url: Some("https://file.example.com".to_string()),
                ..SourceConfig::default()
            },
        };
        let resolved = resolve_source_inner(
            None,
            None,
            None,
            Some("https://env.example.com".to_string()),
            None,
            &config,
        )
        .expect("resolve");
        assert_eq!(resolved.url, "https://env.example.com");
    }

    #[test]
    fn missing_url_everywhere_is_an_error() {
        let err = resolve_source_inner(None, None, None, None, None, &UserConfig::default())
            .expect_err("no url configured");
        assert!(err.to_string().contains("RAVES_API_URL"));
    }

    #[test]
    fn count_is_clamped_to_upstream_bounds() {
        let config = UserConfig {
            source: SourceConfig {
                url: Some("https://x.example.com".to_string()),
                ..SourceConfig::default()
            },
        };
        let resolved =
            resolve_source_inner(None, Some(9_999), None, None, None, &config).expect("resolve");
        assert_eq!(resolved.count, MAX_PAGE_COUNT);

        let resolved =
            resolve_source_inner(None, Some(0), None, None, None, &config).expect("resolve");
        assert_eq!(resolved.count, 1);
    }
}
