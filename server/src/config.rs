// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const DEFAULT_DATA_DIR: &str = "database";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

const CLIENTS_FILE_NAME: &str = "clients_data.json";
const APPOINTMENTS_FILE_NAME: &str = "appointments_data.json";
const SETTINGS_FILE_NAME: &str = "schedule_settings.json";
const DOCUMENTS_DIR_NAME: &str = "client_documents";

pub const DATA_DIR_ENV: &str = "SCHEDULER_DATA_DIR";
pub const LISTEN_ADDR_ENV: &str = "SCHEDULER_ADDR";

/// Where the store keeps its files and where the server listens.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Reads `SCHEDULER_DATA_DIR` and `SCHEDULER_ADDR`, falling back to
    /// `./database` and `0.0.0.0:3000`.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let raw_addr =
            std::env::var(LISTEN_ADDR_ENV).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = raw_addr
            .parse()
            .with_context(|| format!("Invalid {} value: {}", LISTEN_ADDR_ENV, raw_addr))?;

        Ok(Self {
            data_dir,
            listen_addr,
        })
    }

    /// A config rooted at `data_dir` with the default listen address.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }

    pub fn clients_path(&self) -> PathBuf {
        self.data_dir.join(CLIENTS_FILE_NAME)
    }

    pub fn appointments_path(&self) -> PathBuf {
        self.data_dir.join(APPOINTMENTS_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted_in_data_dir() {
        let config = Config::for_data_dir("/tmp/sched");
        assert_eq!(
            config.clients_path(),
            PathBuf::from("/tmp/sched/clients_data.json")
        );
        assert_eq!(
            config.appointments_path(),
            PathBuf::from("/tmp/sched/appointments_data.json")
        );
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/tmp/sched/schedule_settings.json")
        );
        assert_eq!(
            config.documents_dir(),
            PathBuf::from("/tmp/sched/client_documents")
        );
    }
}
