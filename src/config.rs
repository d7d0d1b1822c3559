use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, io::BufReader, path::Path};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::{Error, InternalResult};

/// Settings of a host running compiled models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed of the random generator; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Time step handed to environment dynamics.
    #[serde(default = "default_dt")]
    pub dt: f64,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Cap on errors kept by one type-check pass.
    #[serde(default)]
    pub max_reported_errors: Option<usize>,

    /// Values replacing the defaults of declared parameters.
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            dt: default_dt(),
            log_filter: default_log_filter(),
            max_reported_errors: None,
            parameters: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Installs a global formatter subscriber filtered by `log_filter`.
    pub fn init_tracing(&self) -> InternalResult<()> {
        let filter = EnvFilter::try_new(&self.log_filter)
            .map_err(|e| Error::Config(format!("Invalid log filter {}: {}", self.log_filter, e)))?;
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| Error::Config(format!("Failed to set tracing subscriber: {}", e)))
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_dt() -> f64 {
    1.0
}

fn default_log_filter() -> String {
    "info".to_string()
}
