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

//! The supervisor keeps one entry per launch of a service unit.
//! An entry is reused by the next launch of the same unit once it has been reaped.
use super::error::*;
use super::rentry::{ServiceEntry, ServiceState, ServiceStatus};
use super::spawn::{Isolation, ServiceSpawn};
use libcore::unit::{Unit, UnitType};
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use snafu::ResultExt;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// The service supervisor
pub struct Supervisor {
    capacity: usize,
    entries: RefCell<Vec<ServiceEntry>>,
    spawn: RefCell<ServiceSpawn>,
}

impl Supervisor {
    /// create a supervisor tracking at most capacity entries
    pub fn new(capacity: usize) -> Supervisor {
        Supervisor {
            capacity,
            entries: RefCell::new(Vec::new()),
            spawn: RefCell::new(ServiceSpawn::new()),
        }
    }

    /// install the collaborator isolating Sandbox=true services
    pub fn set_isolation(&self, isolation: Arc<dyn Isolation>) {
        self.spawn.borrow_mut().set_isolation(isolation);
    }

    /// Launch the service and track it as Starting.
    ///
    /// Starting a unit whose previous launch is still alive adds a second entry.
    pub fn start(&self, unit: &Rc<Unit>) -> Result<Pid> {
        if unit.unit_type() != UnitType::Service || unit.exec_start().is_empty() {
            return Err(StartError::NotAService {
                name: unit.name().to_string(),
            });
        }

        let mut entries = self.entries.borrow_mut();
        let reuse = entries
            .iter()
            .position(|e| e.unit.name() == unit.name() && !e.is_live());
        if reuse.is_none() && entries.len() >= self.capacity {
            return Err(StartError::TableFull {
                capacity: self.capacity,
            });
        }

        let pid = self
            .spawn
            .borrow()
            .start_service(unit)
            .context(SpawnFailedSnafu { name: unit.name() })?;

        let entry = ServiceEntry::new(unit.clone(), pid);
        match reuse {
            Some(i) => entries[i] = entry,
            None => entries.push(entry),
        }

        log::info!("Started {} with pid {}", unit.name(), pid);
        Ok(pid)
    }

    /// Start the service on behalf of an activation source.
    ///
    /// Nothing is started while a launch of the service is still alive. Failures are logged.
    pub fn trigger(&self, unit: &Rc<Unit>, source: &str) -> Option<Pid> {
        if self.is_running(unit.name()) {
            log::debug!(
                "{} is already running, {} does not start it again",
                unit.name(),
                source
            );
            return None;
        }

        log::debug!("{} activates {}", source, unit.name());
        match self.start(unit) {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::error!("{} failed to activate {}: {}", source, unit.name(), e);
                None
            }
        }
    }

    /// Record the exit of a child. Unknown pids and non-terminal statuses are ignored.
    pub fn reap(&self, status: WaitStatus) {
        let (pid, state) = match status {
            WaitStatus::Exited(pid, 0) => (pid, ServiceState::Active),
            WaitStatus::Exited(pid, code) => {
                log::debug!("Child {} exited with code {}", pid, code);
                (pid, ServiceState::Failed)
            }
            WaitStatus::Signaled(pid, signal, _) => {
                log::debug!("Child {} was killed by {}", pid, signal);
                (pid, ServiceState::Failed)
            }
            _ => return,
        };

        let mut entries = self.entries.borrow_mut();
        let entry = match entries.iter_mut().find(|e| e.pid == pid && e.is_live()) {
            None => {
                log::debug!("Reaped child {} is not a service, ignoring", pid);
                return;
            }
            Some(e) => e,
        };

        entry.state = state;
        match state {
            ServiceState::Failed => log::warn!("{} (pid {}) failed", entry.unit.name(), pid),
            _ => log::info!("{} (pid {}) finished", entry.unit.name(), pid),
        }
    }

    /// a snapshot of all entries in launch order
    pub fn status(&self) -> Vec<ServiceStatus> {
        self.entries
            .borrow()
            .iter()
            .map(|e| ServiceStatus {
                name: e.unit.name().to_string(),
                pid: e.pid,
                state: e.state,
            })
            .collect()
    }

    /// whether a launch of the named service has not been reaped yet
    pub fn is_running(&self, name: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|e| e.unit.name() == name && e.is_live())
    }
}
