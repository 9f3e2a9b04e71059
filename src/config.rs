//! Configuration for rendering, the report server and the report client.
//!
//! Values are merged with figment, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. A TOML file (`medreport.toml` in the working directory, or an explicit path)
//! 3. Environment variables prefixed with `MEDREPORT_`; nested keys are
//!    separated by a double underscore, e.g. `MEDREPORT_SERVER__ADDR`.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::report::Locale;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "medreport.toml";

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "MEDREPORT_";

/// Widest page margin accepted, in points.
const MAX_MARGIN_PT: f64 = 144.0;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Report layout settings.
    pub report: ReportConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// HTTP client settings.
    pub client: ClientConfig,
}

/// Paper formats offered for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Paper {
    #[default]
    A4,
    Letter,
    Legal,
}

impl From<Paper> for genpdf::PaperSize {
    fn from(paper: Paper) -> Self {
        match paper {
            Paper::A4 => genpdf::PaperSize::A4,
            Paper::Letter => genpdf::PaperSize::Letter,
            Paper::Legal => genpdf::PaperSize::Legal,
        }
    }
}

/// Report layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Language of titles, labels and the suggested filename.
    pub locale: Locale,
    /// Directory holding a TrueType font family; searched before the defaults.
    pub fonts_dir: Option<PathBuf>,
    /// Paper format.
    pub paper: Paper,
    /// Page margin on every side, in points.
    pub margin_pt: f64,
    /// Print "Page N" at the bottom of every page.
    pub page_numbers: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub addr: String,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL of the submit endpoint.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            fonts_dir: None,
            paper: Paper::default(),
            margin_pt: 36.0,
            page_numbers: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/submit".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads configuration from `medreport.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, reading the TOML file at `path` when given.
    ///
    /// A missing file is not an error; the defaults and the environment still
    /// apply.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let margin = self.report.margin_pt;
        if !margin.is_finite() || !(0.0..=MAX_MARGIN_PT).contains(&margin) {
            return Err(ConfigError::Invalid {
                message: format!("report.margin_pt must be between 0 and {MAX_MARGIN_PT}, got {margin}"),
            });
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_bytes must be greater than 0".to_string(),
            });
        }

        if self.client.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "client.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.client.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "client.endpoint must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.report.locale, Locale::English);
        assert_eq!(config.report.paper, Paper::A4);
        assert_eq!(config.report.margin_pt, 36.0);
        assert_eq!(config.server.addr, "0.0.0.0:8000");
        assert_eq!(config.client.endpoint, "http://localhost:8000/submit");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_margin_is_rejected() {
        let mut config = Config::default();
        config.report.margin_pt = -1.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("margin_pt"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.client.timeout_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(Path::new("does-not-exist.toml")))
                .map_err(|err| err.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [report]
                locale = "pt"
                paper = "letter"
                page_numbers = true

                [server]
                addr = "127.0.0.1:9000"
                "#,
            )?;
            jail.set_env("MEDREPORT_SERVER__ADDR", "127.0.0.1:9100");

            let config = Config::load().map_err(|err| err.to_string())?;
            assert_eq!(config.report.locale, Locale::Portuguese);
            assert_eq!(config.report.paper, Paper::Letter);
            assert!(config.report.page_numbers);
            assert_eq!(config.server.addr, "127.0.0.1:9100");
            assert_eq!(config.client, ClientConfig::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[server]\nmax_body_bytes = 0\n")?;
            let err = Config::load_from(Some(Path::new("custom.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }));
            Ok(())
        });
    }
}
