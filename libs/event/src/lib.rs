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

//! Single threaded event loop over epoll.
//!
//! A [`Source`] is one thing the loop waits for: a readable descriptor, a set of signals
//! (delivered through a signalfd), or a deadline on the monotonic clock (one shared
//! timerfd). Ready sources are dispatched one at a time in priority order, a
//! dispatch always runs to completion before the next source is looked at.
//!
//! ```rust
//! # use std::rc::Rc;
//! use event::{EventState, EventType, Events, Source};
//!
//! /// stops the loop once the monotonic clock passes the deadline
//! struct Deadline(u64);
//!
//! impl Source for Deadline {
//!     fn event_type(&self) -> EventType {
//!         EventType::TimerMonotonic
//!     }
//!
//!     fn time(&self) -> u64 {
//!         self.0
//!     }
//!
//!     fn priority(&self) -> i8 {
//!         0
//!     }
//!
//!     fn dispatch(&self, e: &Events) -> i32 {
//!         e.set_exit();
//!         0
//!     }
//!
//!     fn token(&self) -> u64 {
//!         self as *const Self as u64
//!     }
//! }
//!
//! let e = Events::new().unwrap();
//! let s: Rc<dyn Source> = Rc::new(Deadline(e.now() + 10_000));
//! e.add_source(s.clone()).unwrap();
//! e.set_enabled(s.clone(), EventState::OneShot).unwrap();
//! e.rloop().unwrap();
//! e.del_source(s).unwrap();
//! ```
pub mod error;
pub mod events;
pub mod poll;
pub mod source;
mod timer;

pub use crate::events::Events;
pub(crate) use crate::poll::Poll;
pub use crate::source::Source;
pub use error::*;

/// What a source waits for
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub enum EventType {
    /// readiness of Source::fd
    Io,
    /// deadline on CLOCK_MONOTONIC
    TimerMonotonic,
    /// delivery of one of Source::signals
    Signal,
}

/// Whether a registered source is dispatched
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub enum EventState {
    /// every time it is ready
    On,
    /// never, the source stays registered
    Off,
    /// once, then it turns Off
    OneShot,
}
