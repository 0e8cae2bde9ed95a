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

//! The timer activation subsystem owns one binding per scheduled timer unit.
use crate::config::TimerSpec;
use crate::error::*;
use event::{EventState, EventType, Events, Source};
use libcore::unit::{Unit, UnitSet, UnitType};
use service::Supervisor;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Schedules the timer units and starts their services on expiry
pub struct TimerActivation {
    events: Rc<Events>,
    supervisor: Rc<Supervisor>,
    bindings: RefCell<Vec<Rc<TimerBinding>>>,
}

impl TimerActivation {
    ///
    pub fn new(events: &Rc<Events>, supervisor: &Rc<Supervisor>) -> Self {
        TimerActivation {
            events: Rc::clone(events),
            supervisor: Rc::clone(supervisor),
            bindings: RefCell::new(Vec::new()),
        }
    }

    /// Schedule every timer unit relative to the current monotonic time.
    ///
    /// A unit that can never fire or fails to register is logged, skipped and
    /// reported in the returned list.
    pub fn activate(&self, units: &UnitSet) -> Vec<ScheduleError> {
        let now = self.events.now();
        let mut errors = Vec::new();

        for unit in units.of_type(UnitType::Timer) {
            match self.schedule(unit, units.target_of(unit.name()), now) {
                Ok(binding) => {
                    log::info!(
                        "{} scheduled, first expiry in {}us",
                        unit.name(),
                        binding.next_deadline.get().saturating_sub(now)
                    );
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

    fn schedule(
        &self,
        unit: &Rc<Unit>,
        target: Option<Rc<Unit>>,
        now: u64,
    ) -> Result<Rc<TimerBinding>> {
        let spec = TimerSpec::from_unit(unit);
        let deadline = match spec.first_deadline(now) {
            None => {
                return Err(ScheduleError::NeverFires {
                    name: unit.name().to_string(),
                })
            }
            Some(v) => v,
        };

        let binding = Rc::new_cyclic(|me| TimerBinding {
            me: me.clone(),
            unit: Rc::clone(unit),
            target,
            spec,
            next_deadline: Cell::new(deadline),
            armed: Cell::new(true),
            supervisor: Rc::clone(&self.supervisor),
        });

        let source: Rc<dyn Source> = binding.clone();
        let registered = self
            .events
            .add_source(source.clone())
            .and_then(|_| self.events.set_enabled(source.clone(), EventState::OneShot));
        if let Err(e) = registered {
            let _ = self.events.del_source(source);
            return Err(ScheduleError::Register {
                name: unit.name().to_string(),
                source: e,
            });
        }

        Ok(binding)
    }

    /// Drop every timer watch.
    pub fn deactivate(&self) {
        for binding in self.bindings.borrow_mut().drain(..) {
            let source: Rc<dyn Source> = binding.clone();
            if let Err(e) = self.events.del_source(source) {
                log::warn!("Failed to unwatch {}: {}", binding.unit.name(), e);
            }
        }
    }

    /// the next deadline of every scheduled timer unit, None once it stopped firing
    pub fn scheduled(&self) -> Vec<(String, Option<u64>)> {
        self.bindings
            .borrow()
            .iter()
            .map(|b| {
                let deadline = if b.armed.get() {
                    Some(b.next_deadline.get())
                } else {
                    None
                };
                (b.unit.name().to_string(), deadline)
            })
            .collect()
    }
}

struct TimerBinding {
    me: Weak<TimerBinding>,
    unit: Rc<Unit>,
    target: Option<Rc<Unit>>,
    spec: TimerSpec,
    next_deadline: Cell<u64>,
    armed: Cell<bool>,
    supervisor: Rc<Supervisor>,
}

impl TimerBinding {
    fn do_dispatch(&self, e: &Events) {
        self.armed.set(false);
        match &self.target {
            Some(service) => {
                self.supervisor.trigger(service, self.unit.name());
            }
            None => log::warn!("{}: no match, nothing to start", self.unit.name()),
        }

        let fired_at = e.now();
        let deadline = match self.spec.next_deadline(fired_at) {
            None => {
                log::debug!("{} will not fire again", self.unit.name());
                return;
            }
            Some(v) => v,
        };

        let me = match self.me.upgrade() {
            None => return,
            Some(v) => v,
        };
        let me: Rc<dyn Source> = me;
        self.next_deadline.set(deadline);
        match e.set_enabled(me, EventState::OneShot) {
            Ok(_) => self.armed.set(true),
            Err(err) => log::error!("Failed to re-arm {}: {}", self.unit.name(), err),
        }
    }
}

impl Source for TimerBinding {
    fn token(&self) -> u64 {
        self as *const Self as u64
    }

    fn priority(&self) -> i8 {
        0i8
    }

    fn event_type(&self) -> EventType {
        EventType::TimerMonotonic
    }

    fn time(&self) -> u64 {
        self.next_deadline.get()
    }

    fn dispatch(&self, event: &Events) -> i32 {
        self.do_dispatch(event);
        0
    }

    fn description(&self) -> String {
        self.unit.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basic::time_util::USEC_PER_SEC;
    use libtests::write_unit;
    use nix::sys::wait::waitpid;
    use service::ServiceState;

    fn unit_set(dir: &std::path::Path, units: &[(&str, &str)]) -> UnitSet {
        for (name, body) in units {
            write_unit(dir, name, body).unwrap();
        }
        libcore::unit::load_all(dir, 16).unwrap().units
    }

    fn reap_all(supervisor: &Supervisor) {
        for status in supervisor.status() {
            if status.state == ServiceState::Starting {
                supervisor.reap(waitpid(status.pid, None).unwrap());
            }
        }
    }

    #[test]
    fn test_never_fires() {
        let dir = tempfile::tempdir().unwrap();
        let units = unit_set(
            dir.path(),
            &[
                ("zero.timer", "OnBootSec=0\n"),
                ("words.timer", "OnBootSec=soon\n"),
                ("huge.timer", "OnUnitActiveSec=999999\n"),
            ],
        );

        let events = Rc::new(Events::new().unwrap());
        let supervisor = Rc::new(Supervisor::new(8));
        let activation = TimerActivation::new(&events, &supervisor);
        let errors = activation.activate(&units);
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ScheduleError::NeverFires { .. })));
        assert!(activation.scheduled().is_empty());
    }

    #[test]
    fn test_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let units = unit_set(
            dir.path(),
            &[
                ("once.service", "ExecStart=/bin/true\n"),
                ("once.timer", "OnBootSec=1\n"),
            ],
        );

        let events = Rc::new(Events::new().unwrap());
        let supervisor = Rc::new(Supervisor::new(8));
        let activation = TimerActivation::new(&events, &supervisor);
        let start = events.now();
        assert!(activation.activate(&units).is_empty());

        let scheduled = activation.scheduled();
        let deadline = scheduled[0].1.unwrap();
        assert!(deadline >= start + USEC_PER_SEC);

        events.run(3000).unwrap();
        assert!(events.now() >= deadline);
        assert_eq!(supervisor.status().len(), 1);
        assert_eq!(supervisor.status()[0].name, "once.service");
        assert_eq!(activation.scheduled()[0].1, None);
        reap_all(&supervisor);

        activation.deactivate();
        assert!(activation.scheduled().is_empty());
    }

    #[test]
    fn test_recurring() {
        let dir = tempfile::tempdir().unwrap();
        let units = unit_set(
            dir.path(),
            &[
                ("tick.service", "ExecStart=/bin/true\n"),
                ("tick.timer", "OnBootSec=1\nOnUnitActiveSec=1\n"),
            ],
        );

        let events = Rc::new(Events::new().unwrap());
        let supervisor = Rc::new(Supervisor::new(8));
        let activation = TimerActivation::new(&events, &supervisor);
        assert!(activation.activate(&units).is_empty());

        events.run(3000).unwrap();
        let first_pid = supervisor.status()[0].pid;
        let rearmed = activation.scheduled()[0].1.unwrap();
        assert!(rearmed >= events.now());
        reap_all(&supervisor);

        events.run(3000).unwrap();
        let status = supervisor.status();
        assert_eq!(status.len(), 1);
        assert_ne!(status[0].pid, first_pid);
        assert_eq!(status[0].state, ServiceState::Starting);
        reap_all(&supervisor);

        activation.deactivate();
    }

    #[test]
    fn test_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let units = unit_set(dir.path(), &[("orphan.timer", "OnBootSec=1\n")]);

        let events = Rc::new(Events::new().unwrap());
        let supervisor = Rc::new(Supervisor::new(8));
        let activation = TimerActivation::new(&events, &supervisor);
        assert!(activation.activate(&units).is_empty());

        events.run(3000).unwrap();
        assert!(supervisor.status().is_empty());
        assert_eq!(activation.scheduled()[0].1, None);
        activation.deactivate();
    }
}
