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

//! The event reactor: one epoll context per process, driven by a single thread.
//!
//! The reactor owns the SIGCHLD/SIGTERM/SIGINT/SIGUSR1 watch. Children are reaped in a
//! drain loop and handed to the supervisor, termination signals end the loop.
use super::signals::{SignalDispatcher, Signals};
use crate::error::*;
use event::{EventState, Events, Source};
use nix::errno::Errno;
use nix::sys::signalfd::siginfo;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use service::Supervisor;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Uninitialized -> Initialized -> Running -> Stopped, a stopped reactor is not reusable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    /// constructed, no context yet
    Uninitialized,
    /// the context exists and watches the signals
    Initialized,
    /// inside run()
    Running,
    /// run() returned or shutdown() was called
    Stopped,
}

impl fmt::Display for ReactorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReactorState::Uninitialized => "uninitialized",
            ReactorState::Initialized => "initialized",
            ReactorState::Running => "running",
            ReactorState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

struct ChildReaper {
    supervisor: Rc<Supervisor>,
}

impl ChildReaper {
    fn new(supervisor: &Rc<Supervisor>) -> Self {
        ChildReaper {
            supervisor: Rc::clone(supervisor),
        }
    }

    /// reap every exited child, signals of several exits are coalesced
    fn reap_children(&self) -> Result<i32> {
        let mut reaped = 0;
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    log::debug!("Reaped child: {:?}", status);
                    self.supervisor.reap(status);
                    reaped += 1;
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    log::warn!("Failed to wait for children: {}", e);
                    break;
                }
            }
        }
        Ok(reaped)
    }

    fn log_status(&self) -> Result<i32> {
        let status = self.supervisor.status();
        log::info!("{} services tracked", status.len());
        for s in status.iter() {
            log::info!("  {}", s);
        }
        Ok(0)
    }
}

impl SignalDispatcher for ChildReaper {
    fn dispatch_signal(&self, e: &Events, signal: &siginfo) -> Result<i32> {
        /* Received signal should be in the set defined in EVENT_SIGNALS */
        match signal.ssi_signo as libc::c_int {
            libc::SIGCHLD => self.reap_children(),
            libc::SIGTERM | libc::SIGINT => {
                log::info!("Received signal {}, leaving the loop", signal.ssi_signo);
                e.set_exit();
                Ok(0)
            }
            libc::SIGUSR1 => self.log_status(),
            _ => Ok(0),
        }
    }
}

/// The single event multiplexing context of the process
pub struct Reactor {
    supervisor: Rc<Supervisor>,
    state: Cell<ReactorState>,
    events: RefCell<Option<Rc<Events>>>,
    signals: RefCell<Option<Rc<dyn Source>>>,
}

impl Reactor {
    ///
    pub fn new(supervisor: &Rc<Supervisor>) -> Reactor {
        Reactor {
            supervisor: Rc::clone(supervisor),
            state: Cell::new(ReactorState::Uninitialized),
            events: RefCell::new(None),
            signals: RefCell::new(None),
        }
    }

    ///
    pub fn state(&self) -> ReactorState {
        self.state.get()
    }

    /// the context, None before init and after shutdown
    pub fn events(&self) -> Option<Rc<Events>> {
        self.events.borrow().clone()
    }

    /// Create the context and watch the process signals.
    pub fn init(&self) -> Result<Rc<Events>> {
        if self.state() != ReactorState::Uninitialized {
            return Err(Error::State {
                state: self.state().to_string(),
                op: "init",
            });
        }

        let events = Rc::new(Events::new().context(EventSnafu)?);
        let signals: Rc<dyn Source> = Rc::new(Signals::new(ChildReaper::new(&self.supervisor)));
        events.add_source(signals.clone()).context(EventSnafu)?;
        events
            .set_enabled(signals.clone(), EventState::On)
            .context(EventSnafu)?;

        *self.signals.borrow_mut() = Some(signals);
        *self.events.borrow_mut() = Some(events.clone());
        self.state.set(ReactorState::Initialized);
        log::debug!("Reactor initialized");
        Ok(events)
    }

    /// Dispatch events until a stop is requested or the multiplexing fails.
    pub fn run(&self) -> Result<()> {
        let events = match (self.state(), self.events()) {
            (ReactorState::Initialized, Some(events)) => events,
            _ => {
                return Err(Error::State {
                    state: self.state().to_string(),
                    op: "run",
                })
            }
        };

        self.state.set(ReactorState::Running);
        let ret = events.rloop();
        self.state.set(ReactorState::Stopped);

        match ret {
            Ok(_) => {
                log::info!("Reactor loop finished");
                Ok(())
            }
            Err(e) => {
                log::error!("Reactor loop failed: {}", e);
                Err(Error::Event { source: e })
            }
        }
    }

    /// ask the loop to return after the current dispatch
    pub fn stop(&self) {
        if let Some(events) = self.events() {
            events.set_exit();
        }
    }

    /// Release the context and everything registered on it. Safe to call in any state.
    pub fn shutdown(&self) {
        let signals = self.signals.borrow_mut().take();
        if let Some(events) = self.events.borrow_mut().take() {
            if let Some(signals) = signals {
                if let Err(e) = events.del_source(signals) {
                    log::warn!("Failed to unwatch signals: {}", e);
                }
            }
            events.clear();
            log::debug!("Reactor shut down");
        }
        self.state.set(ReactorState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ReactorState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ReactorState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_shutdown_without_init() {
        let supervisor = Rc::new(Supervisor::new(1));
        let reactor = Reactor::new(&supervisor);
        assert_eq!(reactor.state(), ReactorState::Uninitialized);
        reactor.shutdown();
        reactor.shutdown();
        assert_eq!(reactor.state(), ReactorState::Stopped);
        assert!(reactor.events().is_none());
        assert!(reactor.init().is_err());
        assert!(reactor.run().is_err());
    }

    #[test]
    fn test_run_before_init() {
        let supervisor = Rc::new(Supervisor::new(1));
        let reactor = Reactor::new(&supervisor);
        assert!(matches!(reactor.run(), Err(Error::State { op: "run", .. })));
        assert_eq!(reactor.state(), ReactorState::Uninitialized);
    }

    #[test]
    fn test_stop_before_run() {
        let supervisor = Rc::new(Supervisor::new(1));
        let reactor = Reactor::new(&supervisor);
        reactor.init().unwrap();
        assert!(reactor.init().is_err());

        reactor.stop();
        reactor.run().unwrap();
        assert_eq!(reactor.state(), ReactorState::Stopped);
        assert!(reactor.run().is_err());

        reactor.shutdown();
        assert!(reactor.events().is_none());
    }
}
