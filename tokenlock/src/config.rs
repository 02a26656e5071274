use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use log::warn;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::storage::StorageKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("at least one user must be configured")]
    NoUsers,
    #[error("user {0:?} has an empty credential")]
    EmptyCredential(char),
    #[error("user {0:?} must have at least one token")]
    NoTokens(char),
    #[error("at least one button symbol must be configured")]
    NoButtons,
    #[error("the usage registry and the diagnostic log can't both use null storage")]
    NoPersistentStorage,
}

/// A user as written in the config file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserConfig {
    /// A single character identifying the user in the usage registry.
    pub identifier: char,
    pub credential: String,
    /// Accesses allowed per month.
    pub tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub users: Vec<UserConfig>,
    /// How long after an access anyone known may come back without a token.
    pub activation_window_secs: u32,
    /// How long the lock stays open on a granted access.
    pub unlock_millis: u64,
    /// How long the lock stays open on each pulse while failing open.
    pub fault_pulse_millis: u64,
    /// Time between two pulses while failing open.
    pub fault_interval_millis: u64,
    pub registry_file: String,
    pub diagnostic_file: String,
    pub usage_storage: StorageKind,
    pub diagnostic_storage: StorageKind,
    /// The symbol typed by each button, in the order of `TOKENLOCK_BUTTON_PINS`.
    pub button_symbols: Vec<char>,
    /// Any clock reading before this year is considered invalid.
    pub min_clock_year: i32,
}

impl Config {
    pub fn path() -> PathBuf {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        PathBuf::from(config_str)
    }

    /// Loads the config from `path`, or returns `None` if there is no such file.
    pub fn try_load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Checks the invariants the rest of the app relies on.
    ///
    /// Duplicate credentials or identifiers are allowed but logged, since only the
    /// first user with a given credential can ever get in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }
        for (i, user) in self.users.iter().enumerate() {
            if user.credential.is_empty() {
                return Err(ConfigError::EmptyCredential(user.identifier));
            }
            if user.tokens == 0 {
                return Err(ConfigError::NoTokens(user.identifier));
            }
            for other in &self.users[..i] {
                if other.credential == user.credential {
                    warn!("Users {:?} and {:?} share a credential, {:?} can never get in.",
                        other.identifier, user.identifier, user.identifier);
                }
                if other.identifier == user.identifier {
                    warn!("Identifier {:?} is used by more than one user.", user.identifier);
                }
            }
        }
        if self.button_symbols.is_empty() {
            return Err(ConfigError::NoButtons);
        }
        if !self.usage_storage.is_persistent() && !self.diagnostic_storage.is_persistent() {
            return Err(ConfigError::NoPersistentStorage);
        }
        Ok(())
    }

    pub fn activation_window(&self) -> time::Duration {
        time::Duration::seconds(i64::from(self.activation_window_secs))
    }

    pub fn unlock_duration(&self) -> StdDuration {
        StdDuration::from_millis(self.unlock_millis)
    }

    pub fn fault_pulse(&self) -> StdDuration {
        StdDuration::from_millis(self.fault_pulse_millis)
    }

    pub fn fault_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.fault_interval_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("/var/lib/tokenlock");
        Config {
            users: vec![UserConfig {
                identifier: 'a',
                credential: "123123".to_string(),
                tokens: 2,
            }],
            activation_window_secs: 24 * 60 * 60,
            unlock_millis: 3000,
            fault_pulse_millis: 2000,
            fault_interval_millis: 30_000,
            registry_file: "registry.txt".to_string(),
            diagnostic_file: "log.txt".to_string(),
            usage_storage: StorageKind::Internal {
                path: data_dir.clone(),
                create_if_missing: true,
            },
            diagnostic_storage: StorageKind::Internal {
                path: data_dir,
                create_if_missing: true,
            },
            button_symbols: vec!['1', '2', '3'],
            min_clock_year: 2022,
        }
    }
}
