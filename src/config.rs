//! Dashboard Configuration
//! Optional `dashboard.json` in the working directory; every field has a default.

use crate::data::{Granularity, DEFAULT_PERIOD_COLUMN};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "dashboard.json";

const DEFAULT_DATA_PATH: &str =
    "data/한국가스공사_한국가스공사_월별 시도별 도시가스 판매현황_20221231.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Source CSV, relative to the working directory.
    pub data_path: PathBuf,
    pub period_column: String,
    pub cache_ttl_secs: u64,
    pub default_top_n: usize,
    pub default_granularity: Granularity,
    /// Extra font with Hangul glyphs; egui's bundled fonts have none.
    pub font_path: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            period_column: DEFAULT_PERIOD_COLUMN.to_string(),
            cache_ttl_secs: 3600,
            default_top_n: 10,
            default_granularity: Granularity::Yearly,
            font_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Read the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.period_column, "연월");
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{ "default_top_n": 5, "default_granularity": "monthly", "font_path": "fonts/NanumGothic.ttf" }"#,
        )
        .unwrap();

        let config = DashboardConfig::load(&path).unwrap();
        assert_eq!(config.default_top_n, 5);
        assert_eq!(config.default_granularity, Granularity::Monthly);
        assert_eq!(config.font_path, Some(PathBuf::from("fonts/NanumGothic.ttf")));
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(DashboardConfig::load(&path).is_err());
    }
}
