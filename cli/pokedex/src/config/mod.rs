use std::collections::HashMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use log::debug;
use once_cell::sync::OnceCell;
use pokedex_sdk::models::aggregate::{DEFAULT_CATALOG_SIZE, LoadStrategy};
use pokedex_sdk::models::query::DEFAULT_SEARCH_DEBOUNCE;
use serde::{Deserialize, Serialize};
use xdg::BaseDirectories;

/// Name of pokedex managed directories (config, data, cache)
const POKEDEX_DIR_NAME: &str = "pokedex";
const POKEDEX_CONFIG_DIR_VAR: &str = "POKEDEX_CONFIG_DIR";
const POKEDEX_ENV_PREFIX: &str = "POKEDEX_";
pub const POKEDEX_CONFIG_FILE: &str = "pokedex.toml";

pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Clone, Debug, Deserialize, Default, Serialize)]
pub struct Config {
    /// pokedex configuration options
    #[serde(default, flatten)]
    pub pokedex: PokedexConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct PokedexConfig {
    /// Directory where pokedex should store ephemeral data (default:
    /// `$XDG_CACHE_HOME/pokedex`)
    pub cache_dir: PathBuf,
    /// Directory where pokedex should store persistent data (default:
    /// `$XDG_DATA_HOME/pokedex`)
    pub data_dir: PathBuf,
    /// Directory where pokedex should load its configuration file (default:
    /// `$XDG_CONFIG_HOME/pokedex`)
    pub config_dir: PathBuf,

    /// The URL of the catalog instance to use
    pub catalog_url: Option<String>,

    /// Items per page, for remote and local pages alike
    pub page_size: u64,

    /// Upper bound of ids loaded by `list --all`
    pub catalog_size: u64,

    /// Quiet period before a search query edit is applied
    pub search_debounce_ms: u64,

    /// How `list` loads items unless `--all` is given
    #[serde(default)]
    pub load_strategy: LoadStrategy,
}

impl PokedexConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Config {
    /// Creates a raw [Config] object and caches it for the lifetime of the program
    fn raw_config(mut reload: bool) -> Result<HierarchicalConfig> {
        static INSTANCE: OnceCell<Mutex<HierarchicalConfig>> = OnceCell::new();

        debug!(
            "reading raw config (initialized: {initialized}, reload: {reload})",
            initialized = INSTANCE.get().is_some()
        );

        fn read_raw_config() -> Result<HierarchicalConfig> {
            let pokedex_dirs = BaseDirectories::with_prefix(POKEDEX_DIR_NAME);

            let cache_dir = pokedex_dirs
                .get_cache_home()
                .context("Could not determine cache directory")?;
            let data_dir = pokedex_dirs
                .get_data_home()
                .context("Could not determine data directory")?;

            let config_dir = match env::var(POKEDEX_CONFIG_DIR_VAR) {
                Ok(v) => {
                    debug!("`${POKEDEX_CONFIG_DIR_VAR}` set: {v}");
                    PathBuf::from(v)
                },
                Err(_) => {
                    let config_dir = pokedex_dirs
                        .get_config_home()
                        .context("Could not determine config directory")?;
                    debug!("`${POKEDEX_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                    config_dir
                },
            };
            fs::create_dir_all(&config_dir)
                .context(format!("Could not create config directory: {config_dir:?}"))?;

            let mut builder = HierarchicalConfig::builder()
                .set_default("cache_dir", path_value(&cache_dir)?)?
                .set_default("data_dir", path_value(&data_dir)?)?
                .set_default("page_size", DEFAULT_PAGE_SIZE)?
                .set_default("catalog_size", DEFAULT_CATALOG_SIZE)?
                .set_default(
                    "search_debounce_ms",
                    DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
                )?
                .set_default("load_strategy", LoadStrategy::default().to_string())?
                // Config dir is added to the config for completeness;
                // the config file cannot change the config dir.
                .set_override("config_dir", path_value(&config_dir)?)?;

            // look for files in XDG_CONFIG_DIRS locations
            for file in pokedex_dirs.find_config_files(POKEDEX_CONFIG_FILE) {
                builder =
                    builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
            }

            // Add explicit POKEDEX_CONFIG_DIR file last
            builder = builder.add_source(
                config::File::from(config_dir.join(POKEDEX_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            );

            // override via env variables
            let pokedex_envs = env::vars()
                .filter_map(|(k, v)| {
                    k.strip_prefix(POKEDEX_ENV_PREFIX)
                        .map(|k| (k.to_lowercase(), v))
                })
                .collect::<HashMap<_, _>>();

            let builder = builder.add_source(
                Environment::default()
                    .source(Some(pokedex_envs))
                    .try_parsing(true),
            );

            let final_config = builder.build()?;
            Ok(final_config)
        }

        let instance = INSTANCE.get_or_try_init(|| {
            // If we are initializing the config for the first time,
            // we don't need to reload right after
            reload = false;
            let config = read_raw_config()?;

            Ok::<_, anyhow::Error>(Mutex::new(config))
        })?;

        let mut config_guard = instance.lock().expect("config mutex poisoned");
        if reload {
            *config_guard = read_raw_config()?;
        }

        Ok(config_guard.deref().clone())
    }

    /// Creates a [Config] from the environment and config file
    ///
    /// When running in tests, the config is reloaded on every call.
    pub fn parse() -> Result<Config> {
        #[cfg(test)]
        let reload = true;

        #[cfg(not(test))]
        let reload = false;

        let final_config = Self::raw_config(reload)?;
        let cli_config: Config = final_config
            .try_deserialize()
            .context("Could not parse config")?;
        Ok(cli_config)
    }
}

fn path_value(path: &std::path::Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .context(format!("Path is not valid UTF-8: {path:?}"))
}
