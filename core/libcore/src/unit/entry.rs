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

//! The unit record and the line oriented parser of unit files
use super::base::{unit_name_to_type, UnitType};
use crate::error::*;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One unit definition. Immutable after load and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    unit_type: UnitType,
    name: String,
    description: Option<String>,

    // [Service]
    exec_start: String,
    notify_access: String,
    socket: Option<String>,
    sandbox: bool,

    // [Socket]
    listen_stream: String,
    accept: bool,

    // [Timer]
    on_boot_sec: String,
    on_active_sec: String,
    timer_unit: Option<String>,
}

/// Load the unit file at path. The unit is named after the file name.
pub fn load(path: &Path) -> Result<Unit> {
    let mut file = File::open(path).context(NotFoundSnafu { path })?;
    let mut content = Vec::new();
    file.read_to_end(&mut content).context(ReadSnafu { path })?;

    let name = match path.file_name() {
        Some(n) => n.to_string_lossy().to_string(),
        None => path.to_string_lossy().to_string(),
    };

    log::debug!("Loading unit {} from {:?}", name, path);
    Ok(Unit::parse(&name, &String::from_utf8_lossy(&content)))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "yes" | "true" | "on"
    )
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl Unit {
    /// Create a unit with no directives set.
    pub fn new(name: &str) -> Unit {
        Unit {
            unit_type: unit_name_to_type(name),
            name: name.to_string(),
            description: None,
            exec_start: String::new(),
            notify_access: String::new(),
            socket: None,
            sandbox: false,
            listen_stream: String::new(),
            accept: false,
            on_boot_sec: String::new(),
            on_active_sec: String::new(),
            timer_unit: None,
        }
    }

    /// Parse the content of a unit file.
    ///
    /// Section headers, lines without '=' and unknown keys are skipped.
    pub fn parse(name: &str, content: &str) -> Unit {
        let (unit, warnings) = Unit::parse_with_warnings(name, content);
        for w in warnings {
            log::debug!("{}: {}", name, w);
        }
        unit
    }

    /// Parse the content of a unit file, also returning the directives that were skipped.
    pub fn parse_with_warnings(name: &str, content: &str) -> (Unit, Vec<ParseWarning>) {
        let mut unit = Unit::new(name);
        let mut warnings = Vec::new();

        for line in content.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim_start().starts_with('[') {
                continue;
            }

            let (key, value) = match line.split_once('=') {
                None => continue,
                Some(kv) => kv,
            };
            if let Err(w) = unit.set_directive(key.trim(), value.trim_start()) {
                warnings.push(w);
            }
        }

        (unit, warnings)
    }

    fn set_directive(&mut self, key: &str, value: &str) -> Result<(), ParseWarning> {
        match key.to_lowercase().as_str() {
            "description" => self.description = non_empty(value),
            "execstart" => self.exec_start = value.to_string(),
            "notifyaccess" => self.notify_access = value.to_string(),
            "socket" => self.socket = non_empty(value),
            "sandbox" => self.sandbox = value.trim().eq_ignore_ascii_case("true"),
            "listenstream" => self.listen_stream = value.to_string(),
            "accept" => self.accept = parse_bool(value),
            "onbootsec" => self.on_boot_sec = value.to_string(),
            "onunitactivesec" => self.on_active_sec = value.to_string(),
            "unit" => self.timer_unit = non_empty(value),
            _ => {
                return Err(ParseWarning::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// the unit type
    pub fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// the unit name, which is the name of its file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// the name without the type suffix
    pub fn base_name(&self) -> &str {
        self.name
            .strip_suffix(self.unit_type.suffix())
            .unwrap_or(&self.name)
    }

    ///
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// the shell command line of a service
    pub fn exec_start(&self) -> &str {
        &self.exec_start
    }

    /// the readiness notification policy, opaque to the supervisor
    pub fn notify_access(&self) -> &str {
        &self.notify_access
    }

    /// the socket unit a service is bound to
    pub fn socket(&self) -> Option<&str> {
        self.socket.as_deref()
    }

    /// whether the service asks for process isolation
    pub fn sandbox(&self) -> bool {
        self.sandbox
    }

    /// the raw ListenStream endpoint of a socket
    pub fn listen_stream(&self) -> &str {
        &self.listen_stream
    }

    ///
    pub fn accept(&self) -> bool {
        self.accept
    }

    /// the raw OnBootSec value of a timer
    pub fn on_boot_sec(&self) -> &str {
        &self.on_boot_sec
    }

    /// the raw OnUnitActiveSec value of a timer
    pub fn on_active_sec(&self) -> &str {
        &self.on_active_sec
    }

    /// the service named by Unit= of a timer
    pub fn timer_unit(&self) -> Option<&str> {
        self.timer_unit.as_deref()
    }
}

/// Render the recognised directives back into unit file syntax.
impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(description) = &self.description {
            writeln!(f, "[Unit]")?;
            writeln!(f, "Description={}", description)?;
        }

        let mut service: Vec<(&str, &str)> = Vec::new();
        if !self.exec_start.is_empty() {
            service.push(("ExecStart", self.exec_start.as_str()));
        }
        if !self.notify_access.is_empty() {
            service.push(("NotifyAccess", self.notify_access.as_str()));
        }
        if let Some(socket) = &self.socket {
            service.push(("Socket", socket.as_str()));
        }
        if self.sandbox {
            service.push(("Sandbox", "true"));
        }

        let mut socket: Vec<(&str, &str)> = Vec::new();
        if !self.listen_stream.is_empty() {
            socket.push(("ListenStream", self.listen_stream.as_str()));
        }
        if self.accept {
            socket.push(("Accept", "yes"));
        }

        let mut timer: Vec<(&str, &str)> = Vec::new();
        if !self.on_boot_sec.is_empty() {
            timer.push(("OnBootSec", self.on_boot_sec.as_str()));
        }
        if !self.on_active_sec.is_empty() {
            timer.push(("OnUnitActiveSec", self.on_active_sec.as_str()));
        }
        if let Some(unit) = &self.timer_unit {
            timer.push(("Unit", unit.as_str()));
        }

        for (section, directives) in [("Service", service), ("Socket", socket), ("Timer", timer)] {
            if directives.is_empty() {
                continue;
            }
            writeln!(f, "[{}]", section)?;
            for (key, value) in directives {
                writeln!(f, "{}={}", key, value)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libtests::get_test_units_dir;

    #[test]
    fn test_parse_service() {
        let unit = Unit::parse(
            "echo.service",
            "[Unit]\nDescription=Echo server\n\n[Service]\nExecStart=/bin/echo hello world\nNotifyAccess=main\nSocket=echo.socket\nSandbox=true\n",
        );
        assert_eq!(unit.unit_type(), UnitType::Service);
        assert_eq!(unit.name(), "echo.service");
        assert_eq!(unit.base_name(), "echo");
        assert_eq!(unit.description(), Some("Echo server"));
        assert_eq!(unit.exec_start(), "/bin/echo hello world");
        assert_eq!(unit.notify_access(), "main");
        assert_eq!(unit.socket(), Some("echo.socket"));
        assert!(unit.sandbox());
    }

    #[test]
    fn test_parse_keys_and_values() {
        let unit = Unit::parse(
            "t.timer",
            "  onbootsec=   2\r\nONUNITACTIVESEC=5 \nUnit=tick.service\nUnknownKey=1\nno equal sign\n[Timer\nOnBootSec",
        );
        assert_eq!(unit.on_boot_sec(), "2");
        /* trailing spaces are part of the value */
        assert_eq!(unit.on_active_sec(), "5 ");
        assert_eq!(unit.timer_unit(), Some("tick.service"));
    }

    #[test]
    fn test_parse_unknown_keys_are_reported() {
        let (unit, warnings) = Unit::parse_with_warnings(
            "w.service",
            "[Service]\nExecStart=/bin/true\nRestart=always\n  User = nobody\n",
        );
        assert_eq!(unit.exec_start(), "/bin/true");
        assert_eq!(
            warnings,
            vec![
                ParseWarning::UnknownKey {
                    key: "Restart".to_string()
                },
                ParseWarning::UnknownKey {
                    key: "User".to_string()
                },
            ]
        );
        assert_eq!(Unit::parse("w.service", "Restart=always\n"), Unit::new("w.service"));
    }

    #[test]
    fn test_parse_values_with_equal_sign() {
        let unit = Unit::parse("env.service", "ExecStart=/usr/bin/env A=1 B=2");
        assert_eq!(unit.exec_start(), "/usr/bin/env A=1 B=2");
    }

    #[test]
    fn test_parse_long_values_are_kept() {
        let long = "x".repeat(4096);
        let unit = Unit::parse("long.service", &format!("ExecStart={}\n", long));
        assert_eq!(unit.exec_start().len(), 4096);
    }

    #[test]
    fn test_parse_booleans() {
        let unit = Unit::parse("s.service", "Sandbox=yes\n");
        assert!(!unit.sandbox());
        let unit = Unit::parse("s.service", "Sandbox=True\n");
        assert!(unit.sandbox());
        let unit = Unit::parse("s.service", "Sandbox= TRUE \n");
        assert!(unit.sandbox());

        let unit = Unit::parse("s.socket", "ListenStream=/run/s.sock\nAccept=yes\n");
        assert!(unit.accept());
        let unit = Unit::parse("s.socket", "Accept=no\n");
        assert!(!unit.accept());
    }

    #[test]
    fn test_parse_unknown_type() {
        let unit = Unit::parse("notes.txt", "Description=still parsed\n");
        assert_eq!(unit.unit_type(), UnitType::Unknown);
        assert_eq!(unit.description(), Some("still parsed"));
        assert_eq!(unit.base_name(), "notes.txt");
    }

    #[test]
    fn test_serialize_round_trip() {
        let text = "[Unit]\nDescription=tick every five seconds\n[Timer]\nOnBootSec=2\nOnUnitActiveSec=5\nUnit=tick.service\n";
        let unit = Unit::parse("tick.timer", text);
        assert_eq!(unit.to_string(), text);
        assert_eq!(Unit::parse("tick.timer", &unit.to_string()), unit);

        let unit = Unit::parse(
            "echo.service",
            "[Service]\nexecstart=  /bin/cat\nSandbox=true\nNotifyAccess=all\n",
        );
        assert_eq!(Unit::parse("echo.service", &unit.to_string()), unit);
    }

    #[test]
    fn test_load() {
        let dir = get_test_units_dir().unwrap();
        let unit = load(&dir.join("echo.socket")).unwrap();
        assert_eq!(unit.name(), "echo.socket");
        assert_eq!(unit.unit_type(), UnitType::Socket);
        assert!(!unit.listen_stream().is_empty());
    }

    #[test]
    fn test_load_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last.service");
        std::fs::write(&path, b"\n\n[Service]\n\nExecStart=/bin/true").unwrap();
        let unit = load(&path).unwrap();
        assert_eq!(unit.exec_start(), "/bin/true");
    }

    #[test]
    fn test_load_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.service");
        std::fs::write(&path, b"Description=\xff\xfe\nExecStart=/bin/true\n").unwrap();
        let unit = load(&path).unwrap();
        assert_eq!(unit.exec_start(), "/bin/true");
    }

    #[test]
    fn test_load_not_found() {
        let err = load(Path::new("/nonexistent/missing.service")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
