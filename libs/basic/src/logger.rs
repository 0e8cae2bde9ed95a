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

//! The console and syslog backends of the log facade
use log::{LevelFilter, Log};
use std::{io::Write, os::unix::net::UnixDatagram, sync::Mutex};

fn write_msg_common(writer: &mut impl Write, module: &str, msg: String) {
    let time: libc::time_t = unsafe { libc::time(std::ptr::null_mut()) };
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    unsafe { libc::localtime_r(&time, &mut tm) };
    let now_str = format!(
        "{:0>4}-{:0>2}-{:0>2} {:0>2}:{:0>2}:{:0>2} ",
        tm.tm_year + 1900, /* tm_year is years since 1900 */
        tm.tm_mon + 1,     /* tm_mon is months since Jan: [0, 11] */
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec
    );

    /* 1. Write time */
    if let Err(e) = writer.write(now_str.as_bytes()) {
        println!("Failed to log time message: {}", e);
        return;
    }

    /* 2. Write module */
    if let Err(e) = writer.write((module.to_string() + " ").as_bytes()) {
        println!("Failed to log module message: {}", e);
        return;
    }

    /* 3. Write message */
    if let Err(e) = writer.write((msg + "\n").as_bytes()) {
        println!("Failed to log message: {}", e);
    }
}

struct SysLogger {
    dgram: Mutex<UnixDatagram>,
}

impl SysLogger {
    fn connect() -> Result<Self, std::io::Error> {
        let sock = UnixDatagram::unbound()?;
        sock.connect("/dev/log")?;
        Ok(Self {
            dgram: Mutex::new(sock),
        })
    }
}

/* This is an extremely simple implementation, and only
 * supports the very basic log function. */
impl Log for SysLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut msg = String::new();
        msg += record.module_path().unwrap_or("unknown");
        msg += " ";
        msg += &record.args().to_string();

        match self.dgram.lock() {
            Ok(dgr) => {
                if let Err(e) = dgr.send(msg.as_bytes()) {
                    eprintln!("Failed to send message to syslogger: {}", e);
                }
            }
            Err(e) => eprintln!("Failed to lock syslogger: {}", e),
        }
    }

    fn flush(&self) {}
}

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut stdout = std::io::stdout();
        let module_path = record.module_path().unwrap_or("unknown");
        write_msg_common(&mut stdout, module_path, record.args().to_string());
    }

    fn flush(&self) {}
}

/// Collect different kinds of loggers together.
///
/// Include: SysLogger, ConsoleLogger
struct CombinedLogger {
    loggers: Vec<Box<dyn Log>>,
}

impl Log for CombinedLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        for logger in &self.loggers {
            logger.log(record);
        }
    }

    fn flush(&self) {}
}

/// Split a target description such as "console-syslog" into the single targets.
pub fn parse_targets(target: &str) -> Vec<&str> {
    let mut targets: Vec<&str> = target
        .split(|c| c == '-' || c == ',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    targets.dedup();
    targets
}

/// Initialize the global static logger instance.
/// Available log `targets` include `syslog`, `console`.
///
/// # Arguments
///
/// * `name` - The application name that initializes the logger. Just used for debugging.
/// * `level` - Log message level.
/// * `targets` - A set of log targets.
pub fn init_log(name: &str, level: LevelFilter, targets: Vec<&str>) {
    let mut loggers: Vec<Box<dyn Log>> = Vec::new();

    for target in targets {
        let logger = match target {
            "console" => Box::new(ConsoleLogger) as Box<dyn Log>,
            "syslog" => match SysLogger::connect() {
                Ok(logger) => Box::new(logger) as Box<dyn Log>,
                Err(e) => {
                    eprintln!("{} failed to create syslogger: {:?}", name, e);
                    continue;
                }
            },
            _ => {
                eprintln!("{}: log target '{}' is strange, ignoring.", name, target);
                continue;
            }
        };
        loggers.push(logger);
    }

    if loggers.is_empty() {
        eprintln!("{}: no available log targets, using console.", name);
        loggers.push(Box::new(ConsoleLogger));
    }

    if let Err(e) = log::set_boxed_logger(Box::new(CombinedLogger { loggers })) {
        eprintln!("{}: failed to set global logger: {:?}", name, e);
        return;
    }
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        assert_eq!(parse_targets("console"), vec!["console"]);
        assert_eq!(parse_targets("console-syslog"), vec!["console", "syslog"]);
        assert_eq!(parse_targets(" syslog , console "), vec!["syslog", "console"]);
        assert!(parse_targets("").is_empty());
    }

    #[test]
    fn test_write_msg_common() {
        let mut buf: Vec<u8> = Vec::new();
        write_msg_common(&mut buf, "coreinit::test", "hello".to_string());
        let line = String::from_utf8(buf).unwrap();
        assert!(line.ends_with(" coreinit::test hello\n"));
        /* "YYYY-MM-DD hh:mm:ss " */
        assert_eq!(line.as_bytes()[4], b'-');
        assert_eq!(line.as_bytes()[10], b' ');
        assert_eq!(line.as_bytes()[13], b':');
    }

    #[test]
    fn test_init_log_console() {
        init_log("test", LevelFilter::Debug, parse_targets("console"));
        log::info!("console logger is ready");
        /* a second initialization is reported and ignored */
        init_log("test", LevelFilter::Info, vec!["bogus"]);
    }
}
