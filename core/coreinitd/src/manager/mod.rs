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

//! The manager wires the unit loader, the supervisor and the activation components onto the reactor.
pub mod config;
mod reactor;
mod signals;

pub use reactor::{Reactor, ReactorState};

use crate::error::*;
use config::ManagerConfig;
use event::Events;
use libcore::unit::{load_all, UnitSet, UnitType};
use service::{Isolation, ServiceStatus, Supervisor};
use socket::SocketActivation;
use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use timer::TimerActivation;

/// Owns every long lived component of the process
pub struct Manager {
    config: ManagerConfig,
    supervisor: Rc<Supervisor>,
    reactor: Reactor,
    units: RefCell<UnitSet>,
    sockets: RefCell<Option<SocketActivation>>,
    timers: RefCell<Option<TimerActivation>>,
}

impl Manager {
    ///
    pub fn new(config: ManagerConfig) -> Manager {
        let supervisor = Rc::new(Supervisor::new(config.MaxServices));
        let reactor = Reactor::new(&supervisor);
        Manager {
            config,
            supervisor,
            reactor,
            units: RefCell::new(UnitSet::default()),
            sockets: RefCell::new(None),
            timers: RefCell::new(None),
        }
    }

    /// install the hook run in sandboxed children before exec
    pub fn set_isolation(&self, isolation: Arc<dyn Isolation>) {
        self.supervisor.set_isolation(isolation);
    }

    /// Bring the system up: reactor, units, services, then the socket and timer activations.
    ///
    /// Only a reactor failure is fatal, unit and activation failures are logged and skipped.
    pub fn startup(&self) -> Result<()> {
        let events = self.reactor.init()?;

        let units = self.load_units();
        log::info!("Loaded {} units from {}", units.len(), self.config.UnitDir);

        self.start_services(&units);

        let sockets = SocketActivation::new(&events, &self.supervisor, self.config.ListenBacklog);
        let failed = sockets.activate(&units);
        if !failed.is_empty() {
            log::warn!("{} socket units could not be activated", failed.len());
        }

        let timers = TimerActivation::new(&events, &self.supervisor);
        let failed = timers.activate(&units);
        if !failed.is_empty() {
            log::warn!("{} timer units could not be scheduled", failed.len());
        }

        *self.sockets.borrow_mut() = Some(sockets);
        *self.timers.borrow_mut() = Some(timers);
        *self.units.borrow_mut() = units;
        Ok(())
    }

    fn load_units(&self) -> UnitSet {
        match load_all(Path::new(&self.config.UnitDir), self.config.MaxUnits) {
            Ok(batch) => {
                if !batch.errors.is_empty() {
                    log::warn!("{} unit files were skipped", batch.errors.len());
                }
                batch.units
            }
            Err(e) => {
                log::error!("Failed to load units: {}, running without units", e);
                UnitSet::default()
            }
        }
    }

    fn start_services(&self, units: &UnitSet) {
        for unit in units.of_type(UnitType::Service) {
            match self.supervisor.start(unit) {
                Ok(pid) => log::info!("Started {} as {}", unit.name(), pid),
                Err(e) => log::error!("Failed to start {}: {}", unit.name(), e),
            }
        }
    }

    /// Run the reactor until SIGTERM/SIGINT or a stop request.
    pub fn main_loop(&self) -> Result<()> {
        self.reactor.run()
    }

    /// ask the main loop to return
    pub fn stop(&self) {
        self.reactor.stop();
    }

    /// Close the listening sockets, cancel the timers and release the reactor.
    pub fn shutdown(&self) {
        if let Some(sockets) = self.sockets.borrow_mut().take() {
            sockets.deactivate();
        }
        if let Some(timers) = self.timers.borrow_mut().take() {
            timers.deactivate();
        }
        self.reactor.shutdown();
    }

    /// snapshot of the supervised services
    pub fn status(&self) -> Vec<ServiceStatus> {
        self.supervisor.status()
    }

    /// the units of the last startup
    pub fn units(&self) -> Ref<UnitSet> {
        self.units.borrow()
    }

    /// names of the socket units currently listening
    pub fn listening(&self) -> Vec<String> {
        self.sockets
            .borrow()
            .as_ref()
            .map_or_else(Vec::new, |s| s.listening())
    }

    /// the next monotonic deadline of every scheduled timer unit
    pub fn scheduled(&self) -> Vec<(String, Option<u64>)> {
        self.timers
            .borrow()
            .as_ref()
            .map_or_else(Vec::new, |t| t.scheduled())
    }

    ///
    pub fn events(&self) -> Option<Rc<Events>> {
        self.reactor.events()
    }

    ///
    pub fn state(&self) -> ReactorState {
        self.reactor.state()
    }

    ///
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
