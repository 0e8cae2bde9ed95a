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

//! Runs the coreinitd binary against a unit directory and stops it with SIGTERM.
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

fn lines_of(path: &Path) -> usize {
    fs::read_to_string(path).map_or(0, |s| s.lines().count())
}

fn wait_for<F: FnMut() -> bool>(timeout: Duration, mut cond: F) -> bool {
    let begin = Instant::now();
    while begin.elapsed() < timeout {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(100));
    }
    cond()
}

#[test]
fn test_coreinitd_activation() {
    let dir = tempfile::tempdir().unwrap();
    let runs = dir.path().join("runs");
    let beats = dir.path().join("beats");
    let sock = dir.path().join("marker.sock");

    libtests::write_unit(
        dir.path(),
        "marker.service",
        &format!("[Service]\nExecStart=echo run >> {}\n", runs.display()),
    )
    .unwrap();
    libtests::write_unit(
        dir.path(),
        "marker.socket",
        &format!("[Socket]\nListenStream={}\n", sock.display()),
    )
    .unwrap();
    libtests::write_unit(
        dir.path(),
        "beat.service",
        &format!("[Service]\nExecStart=echo beat >> {}\n", beats.display()),
    )
    .unwrap();
    libtests::write_unit(dir.path(), "beat.timer", "[Timer]\nOnBootSec=1\n").unwrap();

    let child = Command::new(env!("CARGO_BIN_EXE_coreinitd"))
        .arg("--config")
        .arg(dir.path().join("absent.conf"))
        .arg("--unit-dir")
        .arg(dir.path())
        .arg("--status-on-exit")
        .env("COREINIT_LOG_TARGET", "console")
        .env("COREINIT_LOG_LEVEL", "info")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let pid = Pid::from_raw(child.id() as i32);

    assert!(wait_for(Duration::from_secs(5), || sock.exists()));
    assert!(wait_for(Duration::from_secs(5), || lines_of(&runs) >= 1));

    // connections are ignored while the previous launch is still running
    let activated = wait_for(Duration::from_secs(10), || {
        if let Ok(stream) = UnixStream::connect(&sock) {
            drop(stream);
        }
        sleep(Duration::from_millis(200));
        lines_of(&runs) >= 2
    });
    assert!(activated);

    // one eager start and at least one timer activation
    assert!(wait_for(Duration::from_secs(5), || lines_of(&beats) >= 2));

    kill(pid, Signal::SIGTERM).unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("marker.service pid="));
    assert!(stdout.contains("beat.service pid="));
    assert!(!sock.exists());
}
