use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Built-in defaults, the lowest configuration layer
const DEFAULT_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 8080

[catalog]
data_dir = "./data"  # Set via SKILLS_DATA_DIR env var
debounce_ms = 1000

[logging]
level = "info"  # trace, debug, info, warn, error
format = "pretty"  # pretty or json
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub data_dir: String,
    pub debounce_ms: u64,
}

impl CatalogConfig {
    /// Data directory with a leading `~` expanded to the home directory
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir.strip_prefix('~') {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
                None => PathBuf::from(&self.data_dir),
            },
            None => PathBuf::from(&self.data_dir),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.skillhub/skillhub.toml
    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".skillhub").join("skillhub.toml"))
    }

    fn defaults() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ))
    }

    /// Load configuration with layered approach:
    /// 1. Built-in defaults
    /// 2. Global config: ~/.skillhub/skillhub.toml (optional)
    /// 3. Local override: ./skillhub.toml (optional)
    /// 4. Environment variables with SKILLHUB__ prefix
    /// 5. PORT and SKILLS_DATA_DIR (highest priority)
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let mut config_builder = Self::defaults();

        if let Some(global_config_path) = Self::global_config_path() {
            config_builder =
                config_builder.add_source(config::File::from(global_config_path).required(false));
        }

        config_builder = config_builder
            .add_source(config::File::with_name("skillhub").required(false))
            .add_source(
                config::Environment::with_prefix("SKILLHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(port) = env::var("PORT") {
            config_builder = config_builder.set_override("server.port", port)?;
        }

        if let Ok(dir) = env::var("SKILLS_DATA_DIR") {
            config_builder = config_builder.set_override("catalog.data_dir", dir)?;
        }

        let config: Self = config_builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML document
    #[cfg(test)]
    pub fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let config = Self::defaults()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.debounce_ms, 1000);
        assert_eq!(config.catalog.data_dir(), PathBuf::from("./data"));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000

            [catalog]
            data_dir = "/srv/skills"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.data_dir(), PathBuf::from("/srv/skills"));
        assert_eq!(config.catalog.debounce_ms, 1000);
    }

    #[test]
    fn test_tilde_expansion() {
        let config = Config::from_toml("[catalog]\ndata_dir = \"~/skills\"").unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.catalog.data_dir(), home.join("skills"));
        }
    }
}
