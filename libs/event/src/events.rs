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

//! An event scheduling framework based on epoll
use crate::error::*;
use crate::timer::{self, Timer};
use crate::{syscall, EventState, EventType, Poll, Source};
use nix::errno::Errno;
use nix::sys::signalfd::{siginfo, SfdFlags, SigSet, SignalFd};
use nix::unistd;
use snafu::ResultExt;
use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap};
use std::os::unix::prelude::{AsRawFd, RawFd};
use std::ptr;
use std::rc::Rc;

/// An event scheduling framework based on epoll
#[derive(Debug)]
pub struct Events {
    data: RefCell<EventsData>,
}

impl Drop for Events {
    fn drop(&mut self) {
        // repeating protection
        self.clear();
    }
}

impl Events {
    /// create event
    pub fn new() -> Result<Events> {
        Ok(Events {
            data: RefCell::new(EventsData::new()?),
        })
    }

    /// for all: add source which implement Source trait
    pub fn add_source(&self, source: Rc<dyn Source>) -> Result<i32> {
        self.data.borrow_mut().add_source(source)
    }

    /// for all: check if the source exists
    pub fn has_source(&self, source: Rc<dyn Source>) -> bool {
        self.data.borrow().has_source(source)
    }

    /// for all: delete source
    pub fn del_source(&self, source: Rc<dyn Source>) -> Result<i32> {
        self.data.borrow_mut().del_source(source)
    }

    /// for all: set the source enabled state
    pub fn set_enabled(&self, source: Rc<dyn Source>, state: EventState) -> Result<i32> {
        self.data.borrow_mut().set_enabled(source, state)
    }

    /// for all: exit event loop
    pub fn set_exit(&self) {
        self.data.borrow_mut().set_exit()
    }

    /// for all: whether an exit has been requested
    pub fn is_exit(&self) -> bool {
        self.data.borrow().exit()
    }

    /// for timer: the monotonic clock in useconds, the clock of Source::time()
    pub fn now(&self) -> u64 {
        timer::now()
    }

    /// for all: Scheduling once, processing an event
    pub fn run(&self, timeout: i32) -> Result<i32> {
        if self.data.borrow().exit() {
            return Ok(0);
        }

        let ready = self.data.borrow_mut().prepare()?;
        if !ready {
            self.data.borrow_mut().wait(timeout)?;
        }

        self.dispatch()?;
        Ok(0)
    }

    /// for all: Process the event in a loop until exiting actively
    pub fn rloop(&self) -> Result<i32> {
        loop {
            if self.data.borrow().exit() {
                return Ok(0);
            }
            self.run(-1i32)?;
        }
    }

    /// private: Fetch the highest priority event processing on the pending queue
    fn dispatch(&self) -> Result<i32> {
        if self.data.borrow().exit() {
            return Ok(0);
        }

        let top = match self.data.borrow_mut().pending_pop() {
            None => return Ok(0),
            Some(v) => v,
        };

        let state = match self.data.borrow().source_state(top.token()) {
            None => return Ok(0),
            Some(v) => v.state,
        };

        match state {
            EventState::Off => {}
            EventState::On => {
                top.dispatch(self);
            }
            EventState::OneShot => {
                self.data
                    .borrow_mut()
                    .set_enabled(top.clone(), EventState::Off)?;

                top.dispatch(self);
            }
        }
        Ok(0)
    }

    /// for signal: read the signal content when signal source emit
    pub fn read_signals(&self) -> Option<siginfo> {
        self.data.borrow_mut().read_signals()
    }

    /// The "events" represents the "event_event" returned by epoll_wait.
    pub fn epoll_event(&self, token: u64) -> u32 {
        self.data.borrow().epoll_event(token)
    }

    /// clear all events to release resource
    /// repeating protection
    pub fn clear(&self) {
        self.data.borrow_mut().clear();
    }
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    state: EventState,
    epoll_event: u32,
    in_pending: bool,
}

impl Default for State {
    fn default() -> State {
        State {
            state: EventState::Off,
            epoll_event: 0,
            in_pending: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventsData {
    poller: Poll,
    exit: bool,
    sources: HashMap<u64, Rc<dyn Source>>,
    pending: BinaryHeap<Rc<dyn Source>>,
    state: HashMap<u64, State>,
    timerfd: Option<RawFd>,
    signalfd: SignalFd,
    timer: Timer,
}

// the declaration "pub(self)" is for identification only.
impl EventsData {
    pub(self) fn new() -> Result<EventsData> {
        Ok(Self {
            poller: Poll::new()?,
            exit: false,
            sources: HashMap::new(),
            pending: BinaryHeap::new(),
            state: HashMap::new(),
            timerfd: None,
            signalfd: SignalFd::with_flags(
                &SigSet::empty(),
                SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC,
            )
            .context(NixSnafu)?,
            timer: Timer::new(),
        })
    }

    pub(self) fn add_source(&mut self, source: Rc<dyn Source>) -> Result<i32> {
        let token = source.token();

        match source.event_type() {
            EventType::Io | EventType::Signal => {
                self.sources.insert(token, source);
            }
            // timer sources live in the timer heap while enabled
            EventType::TimerMonotonic => (),
        }

        // default state
        self.state.insert(token, State::default());

        Ok(0)
    }

    pub(self) fn has_source(&self, source: Rc<dyn Source>) -> bool {
        self.state.contains_key(&source.token())
    }

    pub(self) fn del_source(&mut self, source: Rc<dyn Source>) -> Result<i32> {
        self.source_offline(&source)?;

        let et = source.event_type();
        let token = source.token();
        match et {
            EventType::Io | EventType::Signal => {
                self.sources.remove(&token);
            }
            EventType::TimerMonotonic => {
                if self.timer.is_empty() {
                    if let Some(fd) = self.timerfd.take() {
                        self.poller.unregister(fd)?;
                        let _ = unistd::close(fd);
                    }
                }
            }
        }

        // remove state
        self.state.remove(&token);
        self.pending.retain(|s| s.token() != token);

        Ok(0)
    }

    pub(self) fn set_enabled(&mut self, source: Rc<dyn Source>, state: EventState) -> Result<i32> {
        let token = source.token();
        match self.state.get(&token) {
            None => {
                return Err(Error::Other {
                    word: "source not added",
                })
            }
            Some(current) if current.state == state => return Ok(0),
            Some(_) => {}
        }

        match state {
            EventState::On | EventState::OneShot => {
                self.source_online(&source)?;
            }
            EventState::Off => {
                self.source_offline(&source)?;
            }
        }

        if let Some(current) = self.state.get_mut(&token) {
            current.state = state;
        }

        Ok(0)
    }

    /// when set to on, register events to the listening queue
    pub(self) fn source_online(&mut self, source: &Rc<dyn Source>) -> Result<i32> {
        // already registered when switching between On and OneShot
        if let Some(current) = self.state.get(&source.token()) {
            if current.state != EventState::Off {
                return Ok(0);
            }
        }

        let et = source.event_type();
        let mut event = libc::epoll_event {
            events: source.epoll_event(),
            u64: source.token(),
        };

        match et {
            EventType::Io => {
                self.poller.register(source.fd(), &mut event)?;
            }
            EventType::Signal => {
                let mut mask = SigSet::empty();
                for sig in source.signals() {
                    mask.add(sig);
                }
                mask.thread_block().context(NixSnafu)?;
                self.signalfd.set_mask(&mask).context(NixSnafu)?;
                self.poller
                    .register(self.signalfd.as_raw_fd(), &mut event)?;
            }
            EventType::TimerMonotonic => {
                if self.timerfd.is_none() {
                    let fd = syscall!(timerfd_create(
                        libc::CLOCK_MONOTONIC,
                        libc::TFD_NONBLOCK | libc::TFD_CLOEXEC
                    ))?;
                    // level triggered, the fd is flushed on every wakeup
                    let mut tevent = libc::epoll_event {
                        events: libc::EPOLLIN as u32,
                        u64: source.token(),
                    };
                    if let Err(e) = self.poller.register(fd, &mut tevent) {
                        let _ = unistd::close(fd);
                        return Err(e);
                    }
                    self.timerfd = Some(fd);
                }
                self.timer.push(source.clone());
            }
        }

        Ok(0)
    }

    /// move the event out of the listening queue
    pub(self) fn source_offline(&mut self, source: &Rc<dyn Source>) -> Result<i32> {
        // unneed unregister when source is already Offline
        match self.state.get(&source.token()) {
            Some(current) if current.state != EventState::Off => {}
            _ => return Ok(0),
        }

        let et = source.event_type();
        match et {
            EventType::Io => {
                self.poller.unregister(source.fd())?;
            }
            EventType::Signal => {
                self.poller.unregister(self.signalfd.as_raw_fd())?;
            }
            EventType::TimerMonotonic => {
                self.timer.remove(source);
            }
        }

        Ok(0)
    }

    /// read the signal content when signal source emit
    pub(self) fn read_signals(&mut self) -> Option<siginfo> {
        self.signalfd.read_signal().unwrap_or(None)
    }

    pub(crate) fn epoll_event(&self, token: u64) -> u32 {
        match self.state.get(&token) {
            Some(t) => t.epoll_event,
            None => 0u32,
        }
    }

    /// Wait for the event event through poller
    /// And add the corresponding events to the pending queue
    pub(self) fn wait(&mut self, timeout: i32) -> Result<bool> {
        let events = match self.poller.poll(timeout) {
            Ok(events) => events,
            Err(e) if e.is_interrupted() => return Ok(false),
            Err(e) => return Err(e),
        };

        for event in events.iter() {
            let token = event.u64;
            let revents = event.events;
            if let Some(source) = self.sources.get(&token).cloned() {
                self.pending_push(source, revents);
            }
        }

        self.flush_timer()?;
        self.pop_due_timers();

        Ok(!self.pending_is_empty() || !events.is_empty())
    }

    pub(self) fn prepare(&mut self) -> Result<bool> {
        let ret = self.pop_due_timers();

        if let (Some(next), Some(fd)) = (self.timer.next(), self.timerfd) {
            let new_value = timer::itimerspec_at(next);
            syscall!(timerfd_settime(
                fd,
                libc::TFD_TIMER_ABSTIME,
                &new_value,
                ptr::null_mut()
            ))?;
        }

        if !self.pending_is_empty() {
            return self.wait(0);
        }

        Ok(ret)
    }

    pub(self) fn pending_pop(&mut self) -> Option<Rc<dyn Source>> {
        let top = self.pending.pop()?;
        if let Some(state) = self.state.get_mut(&top.token()) {
            state.in_pending = false;
        }
        Some(top)
    }

    pub(self) fn pending_push(&mut self, source: Rc<dyn Source>, event: u32) {
        if let Some(current) = self.state.get_mut(&source.token()) {
            if current.in_pending {
                current.epoll_event |= event;
            } else {
                current.epoll_event = event;
                self.pending.push(source);
                current.in_pending = true;
            }
        }
    }

    pub(self) fn source_state(&self, token: u64) -> Option<State> {
        self.state.get(&token).cloned()
    }

    pub(self) fn set_exit(&mut self) {
        self.exit = true;
    }

    pub(self) fn exit(&self) -> bool {
        self.exit
    }

    pub(self) fn pending_is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// move every expired timer source to the pending queue
    fn pop_due_timers(&mut self) -> bool {
        let now = timer::now();
        let mut popped = false;
        while let Some(source) = self.timer.pop(now) {
            self.pending_push(source, 0);
            popped = true;
        }
        popped
    }

    fn flush_timer(&self) -> Result<()> {
        let timer_fd = match self.timerfd {
            None => return Ok(()),
            Some(fd) => fd,
        };
        match unistd::read(timer_fd, &mut [0u8; 8]) {
            Ok(_) | Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(()),
            Err(e) => Err(Error::Nix { source: e }),
        }
    }

    fn clear(&mut self) {
        self.sources.clear();
        self.pending.clear();
        self.state.clear();
        self.timer = Timer::new();
        if let Some(fd) = self.timerfd.take() {
            let _ = unistd::close(fd);
        }
    }
}
