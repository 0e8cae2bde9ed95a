// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

#![allow(non_snake_case)]

use confique::{Config, FileFormat, Partial};
use log::LevelFilter;

/// the default configuration file
pub const SYSTEM_CONFIG: &str = "/etc/coreinit/system.conf";

#[derive(Config, Debug)]
pub struct ManagerConfig {
    #[config(env = "COREINIT_UNIT_DIR", default = "/etc/coreinit/units")]
    pub UnitDir: String,

    #[config(env = "COREINIT_LOG_LEVEL", default = "info")]
    pub LogLevel: String,
    #[config(env = "COREINIT_LOG_TARGET", default = "console")]
    pub LogTarget: String,

    #[config(default = 256)]
    pub MaxUnits: usize,
    #[config(default = 64)]
    pub MaxServices: usize,
    #[config(default = 4096)]
    pub ListenBacklog: usize,
}

impl ManagerConfig {
    /// Load the configuration: environment first, then the file, then the defaults.
    /// A missing or broken file is skipped.
    pub fn new(file: Option<&str>) -> ManagerConfig {
        type ConfigPartial = <ManagerConfig as Config>::Partial;
        let mut partial: ConfigPartial = match Partial::from_env() {
            Err(_) => return ManagerConfig::default(),
            Ok(v) => v,
        };
        let path = file.unwrap_or(SYSTEM_CONFIG);
        partial = match confique::File::with_format(path, FileFormat::Toml).load() {
            Err(e) => {
                eprintln!("Failed to load {}, using defaults: {}", path, e);
                partial
            }
            Ok(v) => partial.with_fallback(v),
        };
        partial = partial.with_fallback(ConfigPartial::default_values());
        match ManagerConfig::from_partial(partial) {
            Ok(v) => v,
            Err(_) => ManagerConfig::default(),
        }
    }

    /// the LogLevel as a filter, unknown levels turn logging off
    pub fn log_level(&self) -> LevelFilter {
        match self.LogLevel.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => {
                println!("unsupported log level, set log level to off");
                LevelFilter::Off
            }
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            UnitDir: "/etc/coreinit/units".to_string(),
            LogLevel: "info".to_string(),
            LogTarget: "console".to_string(),
            MaxUnits: 256,
            MaxServices: 64,
            ListenBacklog: 4096,
        }
    }
}

#[cfg(test)]
mod test {
    use libtests::get_project_root;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn load() {
        let mut file: PathBuf = get_project_root().unwrap();
        file.push("core/coreinitd/config/system.conf");
        let config = ManagerConfig::new(file.to_str());
        assert_eq!(config.UnitDir, "/etc/coreinit/units");
        assert_eq!(config.LogTarget, "console-syslog");
        assert_eq!(config.MaxServices, 64);
    }

    #[test]
    fn load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("system.conf");
        std::fs::write(&file, "MaxServices = 8\nLogLevel = \"debug\"\n").unwrap();

        let config = ManagerConfig::new(file.to_str());
        assert_eq!(config.MaxServices, 8);
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert_eq!(config.MaxUnits, 256);
        assert_eq!(config.ListenBacklog, 4096);
    }

    #[test]
    fn load_missing_file() {
        let config = ManagerConfig::new(Some("/nonexistent/coreinit/system.conf"));
        assert_eq!(config.MaxUnits, 256);
        assert_eq!(config.UnitDir, "/etc/coreinit/units");
    }

    #[test]
    fn log_level() {
        let mut config = ManagerConfig::default();
        assert_eq!(config.log_level(), LevelFilter::Info);
        config.LogLevel = "WARN".to_string();
        assert_eq!(config.log_level(), LevelFilter::Warn);
        config.LogLevel = "verbose".to_string();
        assert_eq!(config.log_level(), LevelFilter::Off);
    }
}
