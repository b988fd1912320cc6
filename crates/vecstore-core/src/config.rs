//! Environment-driven configuration for the service's default index
//! parameters and storage mode. Collaborators (the HTTP surface, the
//! embedding provider's credentials) read their own `VECSTORE_*` variables;
//! this struct covers what the service itself needs to bootstrap.

use std::env;

use crate::error::{VectorStoreError, VsResult};
use crate::index::{HnswParams, LshParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Json,
    Binary,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hnsw: HnswParams,
    pub lsh: LshParams,
    pub seed: u64,
    pub storage_mode: StorageMode,
    pub snapshot_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hnsw: HnswParams::default(),
            lsh: LshParams::default(),
            seed: 42,
            storage_mode: StorageMode::Json,
            snapshot_path: "vecstore.snapshot".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> VsResult<T> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| VectorStoreError::InvalidParameter(format!("{key} is not valid: {value:?}"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(VectorStoreError::InvalidParameter(format!("{key} is not valid UTF-8")))
        }
    }
}

impl Config {
    /// Loads configuration from `VECSTORE_*` environment variables, falling
    /// back to documented defaults when a variable is absent. Returns
    /// `InvalidParameter` when a variable is present but unparsable.
    pub fn from_env() -> VsResult<Config> {
        let defaults = Config::default();
        let m = parse_env("VECSTORE_HNSW_M", defaults.hnsw.m)?;
        let ef_construction = parse_env("VECSTORE_HNSW_EF_CONSTRUCTION", defaults.hnsw.ef_construction)?;
        let ef_search = parse_env("VECSTORE_HNSW_EF_SEARCH", defaults.hnsw.ef_search)?;
        let lsh_tables = parse_env("VECSTORE_LSH_L", defaults.lsh.num_tables)?;
        let lsh_bits = parse_env("VECSTORE_LSH_K", defaults.lsh.num_bits)?;
        let multi_probe_radius = parse_env("VECSTORE_LSH_MULTI_PROBE_RADIUS", defaults.lsh.multi_probe_radius)?;
        let seed = parse_env("VECSTORE_SEED", defaults.seed)?;
        let storage_mode = match env::var("VECSTORE_STORAGE_MODE") {
            Ok(value) if value.eq_ignore_ascii_case("binary") => StorageMode::Binary,
            Ok(value) if value.eq_ignore_ascii_case("json") => StorageMode::Json,
            Ok(other) => {
                return Err(VectorStoreError::InvalidParameter(format!(
                    "VECSTORE_STORAGE_MODE must be 'json' or 'binary', got {other:?}"
                )))
            }
            Err(_) => defaults.storage_mode,
        };
        let snapshot_path = env::var("VECSTORE_SNAPSHOT_PATH").unwrap_or(defaults.snapshot_path);

        Ok(Config {
            hnsw: HnswParams {
                m,
                m_max0: 2 * m,
                ef_construction,
                ef_search,
            },
            lsh: LshParams {
                num_tables: lsh_tables,
                num_bits: lsh_bits,
                multi_probe_radius,
            },
            seed,
            storage_mode,
            snapshot_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_absent() {
        // Relies on no VECSTORE_* vars being set in the test process; safe
        // in CI but could collide with a developer's shell exports.
        env::remove_var("VECSTORE_HNSW_M");
        let config = Config::from_env().unwrap();
        assert_eq!(config.hnsw.m, Config::default().hnsw.m);
    }

    #[test]
    fn invalid_storage_mode_is_rejected() {
        env::set_var("VECSTORE_STORAGE_MODE", "xml");
        let result = Config::from_env();
        env::remove_var("VECSTORE_STORAGE_MODE");
        assert!(matches!(result, Err(VectorStoreError::InvalidParameter(_))));
    }
}
