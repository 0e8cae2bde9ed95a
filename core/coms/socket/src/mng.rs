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

//! The socket activation subsystem owns one binding per listening socket unit.
use crate::error::*;
use crate::port::{ListenEndpoint, SocketPort};
use basic::fd_util;
use event::{EventState, EventType, Events, Source};
use libcore::unit::{Unit, UnitSet, UnitType};
use service::Supervisor;
use std::cell::RefCell;
use std::os::unix::prelude::RawFd;
use std::rc::Rc;

/// Binds the socket units and starts their services on incoming connections
pub struct SocketActivation {
    events: Rc<Events>,
    supervisor: Rc<Supervisor>,
    backlog: usize,
    bindings: RefCell<Vec<Rc<SocketBinding>>>,
}

impl SocketActivation {
    ///
    pub fn new(events: &Rc<Events>, supervisor: &Rc<Supervisor>, backlog: usize) -> Self {
        SocketActivation {
            events: Rc::clone(events),
            supervisor: Rc::clone(supervisor),
            backlog,
            bindings: RefCell::new(Vec::new()),
        }
    }

    /// Bind every socket unit with an endpoint and watch it for connections.
    ///
    /// A unit that fails is logged, skipped and reported in the returned list.
    pub fn activate(&self, units: &UnitSet) -> Vec<BindError> {
        let mut errors = Vec::new();

        for unit in units.of_type(UnitType::Socket) {
            if unit.listen_stream().is_empty() {
                log::debug!("{} has no ListenStream, skipping", unit.name());
                continue;
            }

            match self.bind(unit, units.target_of(unit.name())) {
                Ok(binding) => {
                    log::info!("{} is listening on {}", unit.name(), binding.port.endpoint());
                    self.bindings.borrow_mut().push(binding);
                }
                Err(e) => {
                    log::error!("Failed to activate {}: {}", unit.name(), e);
                    errors.push(e);
                }
            }
        }

        errors
    }

    fn bind(&self, unit: &Rc<Unit>, target: Option<Rc<Unit>>) -> Result<Rc<SocketBinding>> {
        let endpoint = ListenEndpoint::parse(unit.listen_stream())?;
        if unit.accept() {
            log::warn!(
                "{}: Accept=yes is not supported, connections activate one shared service",
                unit.name()
            );
        }

        let port = SocketPort::new(endpoint);
        port.open(self.backlog)?;

        let binding = Rc::new(SocketBinding {
            unit: Rc::clone(unit),
            target,
            port,
            supervisor: Rc::clone(&self.supervisor),
        });

        let source: Rc<dyn Source> = binding.clone();
        let registered = self
            .events
            .add_source(source.clone())
            .and_then(|_| self.events.set_enabled(source.clone(), EventState::On));
        if let Err(e) = registered {
            let _ = self.events.del_source(source);
            binding.port.close();
            return Err(BindError::Register {
                listen: unit.listen_stream().to_string(),
                source: e,
            });
        }

        Ok(binding)
    }

    /// Drop every watch and close every listening socket.
    pub fn deactivate(&self) {
        for binding in self.bindings.borrow_mut().drain(..) {
            let source: Rc<dyn Source> = binding.clone();
            if let Err(e) = self.events.del_source(source) {
                log::warn!("Failed to unwatch {}: {}", binding.unit.name(), e);
            }
            binding.port.close();
        }
    }

    /// the socket units currently listening
    pub fn listening(&self) -> Vec<String> {
        self.bindings
            .borrow()
            .iter()
            .map(|b| b.unit.name().to_string())
            .collect()
    }

    /// the listening socket of the unit
    pub fn port_of(&self, name: &str) -> Option<RawFd> {
        self.bindings
            .borrow()
            .iter()
            .find(|b| b.unit.name() == name)
            .map(|b| b.port.fd())
    }
}

struct SocketBinding {
    unit: Rc<Unit>,
    target: Option<Rc<Unit>>,
    port: SocketPort,
    supervisor: Rc<Supervisor>,
}

impl SocketBinding {
    fn dispatch_io(&self) {
        match &self.target {
            Some(service) => {
                self.supervisor.trigger(service, self.unit.name());
            }
            None => log::warn!("{}: no service to activate", self.unit.name()),
        }

        match self.port.accept() {
            Ok(Some(fd)) => {
                log::debug!("{}: closing accepted connection {}", self.unit.name(), fd);
                fd_util::close(fd);
            }
            Ok(None) => log::debug!("{}: no pending connection", self.unit.name()),
            Err(e) => log::warn!("{}: accept failed: {}", self.unit.name(), e),
        }
    }
}

impl Source for SocketBinding {
    fn fd(&self) -> RawFd {
        self.port.fd()
    }

    fn event_type(&self) -> EventType {
        EventType::Io
    }

    fn epoll_event(&self) -> u32 {
        (libc::EPOLLIN) as u32
    }

    fn priority(&self) -> i8 {
        0i8
    }

    fn dispatch(&self, _: &Events) -> i32 {
        self.dispatch_io();
        0
    }

    fn token(&self) -> u64 {
        self as *const Self as u64
    }

    fn description(&self) -> String {
        self.unit.name().to_string()
    }
}
