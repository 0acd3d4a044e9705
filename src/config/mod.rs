use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

use crate::models::EpgSource;
use crate::utils::normalize_url_scheme;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-source request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Maximum number of parallel downloads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Some EPG hosts reject non-browser agents
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("epg.xml")
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_concurrency() -> usize {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            fetch: FetchConfig::default(),
            sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    let stock = [
        // United States
        (
            "usa1",
            "https://epgshare01.online/epgshare01/epg_ripper_ALL_SOURCES1.xml",
        ),
        (
            "usa2",
            "https://github.com/matthuisman/i.mjh.nz/raw/master/SamsungTVPlus/us.xml",
        ),
        (
            "usa3",
            "https://github.com/matthuisman/i.mjh.nz/raw/master/PlutoTV/us.xml",
        ),
        (
            "usa4",
            "https://github.com/matthuisman/i.mjh.nz/raw/master/Plex/us.xml",
        ),
        // United Kingdom
        (
            "uk1",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Unitedkingdom/unitedkingdom1.xml",
        ),
        (
            "uk2",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Unitedkingdom/unitedkingdom2.xml",
        ),
        (
            "uk3",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Unitedkingdom/unitedkingdom3.xml",
        ),
        (
            "uk4",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Unitedkingdom/unitedkingdom4.xml",
        ),
        (
            "uk5",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Unitedkingdom/unitedkingdom5.xml",
        ),
        // Sports (International)
        (
            "sports1",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Sports/sports1.xml",
        ),
        (
            "sports2",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Sports/sports2.xml",
        ),
        (
            "sports3",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Sports/sports3.xml",
        ),
        // Canada
        (
            "canada1",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Canada/canada1.xml",
        ),
        (
            "canada2",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Canada/canada2.xml",
        ),
        // Ireland
        (
            "ireland1",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Ireland/ireland1.xml",
        ),
        // Australia
        (
            "australia1",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Australia/australia1.xml",
        ),
        (
            "australia2",
            "https://raw.githubusercontent.com/globetvapp/epg/main/Australia/australia2.xml",
        ),
    ];

    stock
        .iter()
        .map(|(name, url)| SourceConfig {
            name: name.to_string(),
            url: url.to_string(),
        })
        .collect()
}

impl Config {
    /// Load configuration from the given path, writing a default file with the
    /// stock source list when none exists yet.
    pub fn load<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        let config_file = config_file.as_ref();

        if config_file.exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            Ok(default_config)
        }
    }

    /// The usable source list in declared order.
    ///
    /// Entries with an empty or unparseable URL are dropped with a warning;
    /// the upstream source lists carry empty placeholder slots. Scheme-less
    /// URLs get an http:// prefix.
    pub fn active_sources(&self) -> Vec<EpgSource> {
        self.sources
            .iter()
            .filter_map(|source| {
                if source.url.trim().is_empty() {
                    warn!("Ignoring EPG source '{}': empty URL", source.name);
                    return None;
                }

                let url = normalize_url_scheme(source.url.trim());
                match Url::parse(&url) {
                    Ok(_) => Some(EpgSource::new(&source.name, url)),
                    Err(e) => {
                        warn!(
                            "Ignoring EPG source '{}': invalid URL '{}' ({})",
                            source.name, source.url, e
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_sources() {
        let config = Config::default();
        assert!(!config.sources.is_empty());
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.fetch.concurrency, 5);
        assert_eq!(config.output.path, PathBuf::from("epg.xml"));
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.sources.len(), config.sources.len());
        assert_eq!(reparsed.fetch.user_agent, config.fetch.user_agent);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [[sources]]
            name = "uk1"
            url = "https://example.com/uk1.xml"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.output.path, PathBuf::from("epg.xml"));
    }

    #[test]
    fn test_partial_fetch_section_fills_missing_fields() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            timeout_seconds = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.timeout_seconds, 10);
        assert_eq!(config.fetch.concurrency, 5);
        assert!(!config.fetch.user_agent.is_empty());
    }

    #[test]
    fn test_active_sources_drops_empty_and_invalid_urls() {
        let config: Config = toml::from_str(
            r#"
            [[sources]]
            name = "good"
            url = "https://example.com/epg.xml"

            [[sources]]
            name = "placeholder"
            url = ""

            [[sources]]
            name = "broken"
            url = "not a url"
            "#,
        )
        .unwrap();

        let sources = config.active_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "good");
    }

    #[test]
    fn test_active_sources_normalizes_scheme_less_urls() {
        let config: Config = toml::from_str(
            r#"
            [[sources]]
            name = "bare"
            url = "example.com/epg.xml"
            "#,
        )
        .unwrap();

        let sources = config.active_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "http://example.com/epg.xml");
    }

    #[test]
    fn test_active_sources_preserves_declared_order() {
        let config: Config = toml::from_str(
            r#"
            [[sources]]
            name = "b"
            url = "https://example.com/b.xml"

            [[sources]]
            name = "a"
            url = "https://example.com/a.xml"
            "#,
        )
        .unwrap();

        let names: Vec<_> = config
            .active_sources()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
