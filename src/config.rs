// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file
//!
//! ```toml
//! [modbus]
//! unit_id = 1
//! connect_timeout_ms = 3000
//! read_timeout_ms = 3000
//!
//! [serial]
//! ports = ["COM1", "COM2"]
//! baud_rates = [9600, 19200]
//!
//! [storage]
//! upload_dir = "uploads"
//! ```
//!
//! Every key is optional.

use std::{fs, io, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{dispatch::Timeouts, slave::Slave};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModbusConfig {
    /// Slave (unit) id of the addressed device
    pub unit_id: u8,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            unit_id: Slave::default().into(),
            connect_timeout_ms: 3000,
            read_timeout_ms: 3000,
        }
    }
}

impl ModbusConfig {
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

/// Choices offered for serial reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub ports: Vec<String>,
    pub baud_rates: Vec<u32>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            ports: (1..=20).map(|n| format!("COM{n}")).collect(),
            baud_rates: vec![1200, 2400, 4800, 9600, 19200, 38400, 57600, 115_200],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub modbus: ModbusConfig,
    pub serial: SerialConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&toml_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let slave = Slave(self.modbus.unit_id);
        if slave.is_broadcast() {
            return Err(ConfigError::Invalid(
                "unit_id 0 is the broadcast address and never answers reads".to_owned(),
            ));
        }
        if self.modbus.connect_timeout_ms == 0 || self.modbus.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must not be zero".to_owned()));
        }
        if !slave.is_single_device() {
            log::warn!("Unit id {slave} is outside of the single device range");
        }
        Ok(())
    }

    #[must_use]
    pub fn slave(&self) -> Slave {
        Slave(self.modbus.unit_id)
    }
}
