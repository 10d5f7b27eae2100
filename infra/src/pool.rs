use std::time::Duration;

use err_derive::Error;
use log::*;
use postgres::error::SqlState;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use serde::{Deserialize, Serialize};

pub type PgManager = PostgresConnectionManager<NoTls>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error(display = "invalid postgres url")]
    Url(#[error(source, no_from)] postgres::Error),
    #[error(display = "build pool")]
    Build(#[error(source)] #[error(from)] r2d2::Error),
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default)]
    pub pool_size: Option<u32>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

// Hand-written so the password in `url` never reaches the logs.
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("PostgresConfig")
            .field("url", &"<redacted>")
            .field("pool_size", &self.pool_size)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl PostgresConfig {
    pub fn manager(&self) -> Result<PgManager, PoolError> {
        let config = self.url.parse::<postgres::Config>().map_err(PoolError::Url)?;
        Ok(PostgresConnectionManager::new(config, NoTls))
    }

    pub fn build(&self) -> Result<Pool<PgManager>, PoolError> {
        debug!("Build pool from {:?}", self);

        let manager = self.manager()?;

        let mut builder = r2d2::Pool::builder();
        if let Some(size) = self.pool_size {
            builder = builder.max_size(size);
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connection_timeout(Duration::from_secs(secs));
        }

        debug!("Pool builder: {:?}", builder);
        let pool = builder.build(manager)?;

        Ok(pool)
    }
}

pub fn is_unique_violation(err: &postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}
