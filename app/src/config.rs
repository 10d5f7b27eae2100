use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::Algorithm;
use log::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use infra::pool::PostgresConfig;

use crate::auth::{SigningKeys, TokenVerifier};

const ENV_PREFIX: &str = "COFFEESHOP_";

#[derive(Deserialize, Debug)]
pub struct Config {
    pub postgres: PostgresConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub reset_on_start: bool,
}

#[derive(Deserialize, Debug)]
pub struct AuthConfig {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub algorithms: Vec<Algorithm>,
    pub keys: KeySource,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    JwksUrl(Url),
    JwksPath(PathBuf),
    Hs256Secret(String),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeySource::JwksUrl(url) => fmt.debug_tuple("JwksUrl").field(&url.as_str()).finish(),
            KeySource::JwksPath(path) => fmt.debug_tuple("JwksPath").field(path).finish(),
            KeySource::Hs256Secret(_) => fmt.debug_tuple("Hs256Secret").field(&"<redacted>").finish(),
        }
    }
}

/// Settings that may be supplied through `COFFEESHOP_*` variables, so
/// deployments need not write credentials into the config file.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct EnvOverrides {
    pub postgres_url: Option<String>,
    pub listen_addr: Option<SocketAddr>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_env::<EnvOverrides>()
            .context("read environment overrides")?;
        debug!("Environment overrides: {:?}", overrides.redacted());
        Ok(overrides)
    }

    fn redacted(&self) -> (bool, Option<SocketAddr>) {
        (self.postgres_url.is_some(), self.listen_addr)
    }
}

impl Config {
    pub fn apply(&mut self, overrides: &EnvOverrides) {
        if let Some(url) = &overrides.postgres_url {
            info!("Using postgres url from ${}POSTGRES_URL", ENV_PREFIX);
            self.postgres.url = url.clone();
        }
    }
}

impl AuthConfig {
    pub fn keys(&self) -> Result<SigningKeys> {
        let jwks = match &self.keys {
            KeySource::Hs256Secret(secret) => {
                warn!("Verifying tokens with a shared secret");
                return Ok(SigningKeys::shared_secret(secret.as_bytes()));
            }
            KeySource::JwksPath(path) => {
                info!("Loading signing keys from {:?}", path);
                let buf = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
                serde_json::from_str::<JwkSet>(&buf).context("parse key set")?
            }
            KeySource::JwksUrl(url) => {
                return Err(anyhow::anyhow!(
                    "key set at {} must be fetched with `load_verifier`",
                    url
                ))
            }
        };
        Ok(SigningKeys::from_jwks(&jwks).context("decode key set")?)
    }

    /// Builds the verifier, fetching the published key set when configured
    /// with a url. Keys are not refreshed afterwards.
    pub async fn load_verifier(&self) -> Result<TokenVerifier> {
        let keys = match &self.keys {
            KeySource::JwksUrl(url) => {
                info!("Fetching signing keys from {}", url);
                let jwks = reqwest::get(url.clone())
                    .await
                    .with_context(|| format!("fetch {}", url))?
                    .error_for_status()
                    .with_context(|| format!("fetch {}", url))?
                    .json::<JwkSet>()
                    .await
                    .context("parse key set")?;
                SigningKeys::from_jwks(&jwks).context("decode key set")?
            }
            _ => self.keys()?,
        };
        Ok(self.verifier(keys))
    }

    pub fn verifier(&self, keys: SigningKeys) -> TokenVerifier {
        let mut verifier = TokenVerifier::new(keys).with_algorithms(self.algorithms.clone());
        if let Some(issuer) = &self.issuer {
            verifier = verifier.with_issuer(issuer.as_str());
        }
        if let Some(audience) = &self.audience {
            verifier = verifier.with_audience(audience.as_str());
        }
        verifier
    }
}

pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buf = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let config = toml::from_str(&buf).with_context(|| format!("parse {:?}", path))?;
    Ok(config)
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default)]
pub struct EnvLogger {
    #[serde(default)]
    level: Option<LogLevel>,
    #[serde(default)]
    modules: HashMap<String, LogLevel>,
    #[serde(default)]
    timestamp_nanos: bool,
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = r#"
        reset_on_start = true

        [postgres]
        url = "postgres://postgres@localhost/coffeeshop"
        pool_size = 4

        [auth]
        issuer = "https://coffee.eu.auth0.com/"
        audience = "drinks"
        algorithms = ["RS256"]
        keys = { jwks_url = "https://coffee.eu.auth0.com/.well-known/jwks.json" }
    "#;

    #[test]
    fn parses_sample_config() {
        let config: Config = toml::from_str(SAMPLE).expect("parse");

        assert!(config.reset_on_start);
        assert_eq!(config.postgres.pool_size, Some(4));
        assert_eq!(config.auth.audience.as_deref(), Some("drinks"));
        assert_eq!(config.auth.algorithms, vec![Algorithm::RS256]);
        assert!(matches!(config.auth.keys, KeySource::JwksUrl(_)));
    }

    #[test]
    fn reset_defaults_to_off() {
        let config: Config = toml::from_str(
            r#"
            [postgres]
            url = "postgres://localhost/coffeeshop"
            [auth]
            keys = { hs256_secret = "hunter2" }
            "#,
        )
        .expect("parse");

        assert!(!config.reset_on_start);
        assert!(config.auth.algorithms.is_empty());
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let keys = KeySource::Hs256Secret("hunter2".into());

        let shown = format!("{:?}", keys);

        assert!(!shown.contains("hunter2"), "{}", shown);
    }

    #[test]
    fn environment_overrides_replace_the_database_url() {
        let mut config: Config = toml::from_str(SAMPLE).expect("parse");
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, EnvOverrides>(vec![
                (
                    "COFFEESHOP_POSTGRES_URL".to_string(),
                    "postgres://prod/drinks".to_string(),
                ),
                (
                    "COFFEESHOP_LISTEN_ADDR".to_string(),
                    "0.0.0.0:8080".to_string(),
                ),
            ])
            .expect("overrides");

        config.apply(&overrides);

        assert_eq!(config.postgres.url, "postgres://prod/drinks");
        assert_eq!(
            overrides.listen_addr,
            Some("0.0.0.0:8080".parse().expect("addr"))
        );
    }

    #[test]
    fn shared_secret_builds_a_verifier_without_fetching() {
        let config: AuthConfig = toml::from_str(r#"keys = { hs256_secret = "hunter2" }"#)
            .expect("parse");

        assert!(matches!(config.keys(), Ok(SigningKeys::Shared(_))));
    }

    #[test]
    fn url_key_sets_need_fetching() {
        let config: Config = toml::from_str(SAMPLE).expect("parse");

        assert!(config.auth.keys().is_err());
    }

    #[test]
    fn env_logger_table_is_optional_field_by_field() {
        let logger: EnvLogger = toml::from_str(r#"level = "warn""#).expect("parse");

        assert!(matches!(logger.level, Some(LogLevel::Warn)));
        assert!(logger.modules.is_empty());
        assert!(!logger.timestamp_nanos);
    }
}
