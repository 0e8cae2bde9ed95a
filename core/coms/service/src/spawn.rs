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

//! Launches the command line of a service through the shell
use libcore::unit::Unit;
use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow};
use nix::unistd::Pid;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::sync::Arc;

const SHELL: &str = "/bin/sh";

/// The process isolation collaborator of services requesting Sandbox=true.
///
/// `isolate` runs in the forked child right before exec, an error aborts the
/// launch and is reported as a spawn failure.
pub trait Isolation: Send + Sync {
    /// isolate the calling process, which is about to exec the unit
    fn isolate(&self, unit: &str) -> io::Result<()>;
}

pub(super) struct ServiceSpawn {
    isolation: Option<Arc<dyn Isolation>>,
}

impl ServiceSpawn {
    pub(super) fn new() -> ServiceSpawn {
        ServiceSpawn { isolation: None }
    }

    pub(super) fn set_isolation(&mut self, isolation: Arc<dyn Isolation>) {
        self.isolation = Some(isolation);
    }

    pub(super) fn start_service(&self, unit: &Unit) -> io::Result<Pid> {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c").arg(unit.exec_start()).stdin(Stdio::null());

        let isolation = match (unit.sandbox(), &self.isolation) {
            (false, _) => None,
            (true, Some(isolation)) => Some(isolation.clone()),
            (true, None) => {
                log::warn!(
                    "{} requests a sandbox, but no isolation is available, starting it unisolated",
                    unit.name()
                );
                None
            }
        };

        let name = unit.name().to_string();
        unsafe {
            cmd.pre_exec(move || {
                /* the reactor blocks the signals it watches, children start with an empty mask */
                let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);
                match &isolation {
                    Some(isolation) => isolation.isolate(&name),
                    None => Ok(()),
                }
            });
        }

        let child = cmd.spawn()?;
        let pid = Pid::from_raw(child.id() as libc::pid_t);
        log::debug!("child pid is :{}", pid);
        Ok(pid)
    }
}
