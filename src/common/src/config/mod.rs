use std::path::Path;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use once_cell::sync::OnceCell;

pub static CONFIG: OnceCell<Configuration> = OnceCell::new();

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hls-janitor.toml";

/// Prefix for nested environment overrides, e.g. `HLS_JANITOR__STALENESS__MULTIPLE`.
pub const ENV_PREFIX: &str = "HLS_JANITOR__";

/// Environment variable read by earlier deployments of the checker.
pub const LEGACY_MULTIPLE_ENV: &str = "TARGET_DURATION_MULTIPLE";

/// Staleness policy.
///
/// A live playlist is stale once it has gone `multiple` target durations
/// without being rewritten.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StalenessConfig {
    /// Multiple of the playlist target duration after which it is stale.
    ///
    /// Default: 1.5 (a playlist with a 6s target duration is stale after 9s)
    ///
    /// Env: HLS_JANITOR__STALENESS__MULTIPLE or TARGET_DURATION_MULTIPLE
    #[serde(default = "default_multiple")]
    pub multiple: f64,

    /// Dry-run mode: log stale playlists without deleting them.
    ///
    /// Env: HLS_JANITOR__STALENESS__DRY_RUN
    #[serde(default)]
    pub dry_run: bool,
}

fn default_multiple() -> f64 {
    1.5
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            multiple: default_multiple(),
            dry_run: false,
        }
    }
}

impl StalenessConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.multiple.is_finite() || self.multiple <= 0.0 {
            anyhow::bail!(
                "staleness.multiple must be a positive number, got {}",
                self.multiple
            );
        }
        Ok(())
    }
}

/// Object storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage DSN.
    ///
    /// - `s3://` resolves buckets on AWS using the ambient AWS environment
    /// - `s3://host:port` targets an S3-compatible endpoint (MinIO, localstack)
    /// - `file:///path` maps each bucket to a subdirectory of `path`
    /// - `memory://` keeps one in-memory store per bucket
    ///
    /// Env: HLS_JANITOR__STORAGE__DSN
    pub dsn: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dsn: String::from("s3://"),
        }
    }
}

impl StorageConfig {
    /// In-memory storage, used by tests and local dry runs.
    pub fn in_memory() -> Self {
        Self {
            dsn: String::from("memory://"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Staleness policy
    #[serde(default)]
    pub staleness: StalenessConfig,
    /// Object storage the playlists live in
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Configuration {
    /// Load configuration from `hls-janitor.toml` and the environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(DEFAULT_CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from an explicit file path and the environment.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(path)).extract().map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&[LEGACY_MULTIPLE_ENV])
                    .map(|_| "staleness.multiple".into()),
            )
    }

    /// Validate all sections.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.staleness.validate()?;
        if self.storage.dsn.is_empty() {
            anyhow::bail!("Storage DSN cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.staleness.multiple, 1.5);
        assert!(!config.staleness.dry_run);
        assert_eq!(config.storage.dsn, "s3://");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| e.to_string())?;
            assert_eq!(config.staleness.multiple, 1.5);
            assert_eq!(config.storage.dsn, "s3://");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [staleness]
                multiple = 3.0
                dry_run = true

                [storage]
                dsn = "memory://"
                "#,
            )?;

            let config = Configuration::load().map_err(|e| e.to_string())?;
            assert_eq!(config.staleness.multiple, 3.0);
            assert!(config.staleness.dry_run);
            assert_eq!(config.storage.dsn, "memory://");
            Ok(())
        });
    }

    #[test]
    fn test_load_from_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[staleness]\nmultiple = 2.0\n")?;

            let config =
                Configuration::load_from_path(Path::new("custom.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.staleness.multiple, 2.0);
            assert!(!config.staleness.dry_run);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "[staleness]\nmultiple = 3.0\n")?;
            jail.set_env("HLS_JANITOR__STALENESS__MULTIPLE", "4.5");
            jail.set_env("HLS_JANITOR__STALENESS__DRY_RUN", "true");
            jail.set_env("HLS_JANITOR__STORAGE__DSN", "file:///tmp/playlists");

            let config = Configuration::load().map_err(|e| e.to_string())?;
            assert_eq!(config.staleness.multiple, 4.5);
            assert!(config.staleness.dry_run);
            assert_eq!(config.storage.dsn, "file:///tmp/playlists");
            Ok(())
        });
    }

    #[test]
    fn test_legacy_multiple_env_var() {
        Jail::expect_with(|jail| {
            jail.set_env(LEGACY_MULTIPLE_ENV, "2.5");

            let config = Configuration::load().map_err(|e| e.to_string())?;
            assert_eq!(config.staleness.multiple, 2.5);
            Ok(())
        });
    }

    #[test]
    fn test_non_positive_multiple_is_invalid() {
        for multiple in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = StalenessConfig {
                multiple,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{multiple} should be rejected");
        }
    }

    #[test]
    fn test_empty_storage_dsn_is_invalid() {
        let config = Configuration {
            storage: StorageConfig { dsn: String::new() },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
