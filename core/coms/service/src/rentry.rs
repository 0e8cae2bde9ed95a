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

//!
use libcore::unit::Unit;
use nix::unistd::Pid;
use std::fmt;
use std::rc::Rc;

/// The lifecycle state of a launched service
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ServiceState {
    /// not launched
    Inactive,
    /// the process is alive, or at least not reaped yet
    Starting,
    /// the process has been reaped after a clean exit
    Active,
    /// the process exited with a non-zero code or died from a signal
    Failed,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::Inactive
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Inactive => "inactive",
            ServiceState::Starting => "starting",
            ServiceState::Active => "active",
            ServiceState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// one launch of a service unit
#[derive(Debug)]
pub(super) struct ServiceEntry {
    pub(super) unit: Rc<Unit>,
    pub(super) pid: Pid,
    pub(super) state: ServiceState,
}

impl ServiceEntry {
    pub(super) fn new(unit: Rc<Unit>, pid: Pid) -> ServiceEntry {
        ServiceEntry {
            unit,
            pid,
            state: ServiceState::Starting,
        }
    }

    /// not reaped yet
    pub(super) fn is_live(&self) -> bool {
        self.state == ServiceState::Starting
    }
}

/// A read-only snapshot of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// the unit name
    pub name: String,
    /// the pid of the most recent launch
    pub pid: Pid,
    ///
    pub state: ServiceState,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pid={} state={}", self.name, self.pid, self.state)
    }
}
