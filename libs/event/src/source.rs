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

//! The [`Source`] trait, implemented by everything the loop can wait for.
use crate::EventType;
use crate::Events;
use nix::sys::signal::Signal;
use std::fmt::Debug;
use std::os::unix::io::RawFd;

/// One registration on [`Events`]. Only the methods matching event_type() are consulted.
pub trait Source {
    /// Io: the descriptor to watch
    fn fd(&self) -> RawFd {
        basic::fd_util::INVALID_FD
    }

    /// Signal: the signals routed to this source
    fn signals(&self) -> Vec<Signal> {
        vec![]
    }

    /// Timer: absolute deadline in usec of the monotonic clock, read when the source is enabled
    fn time(&self) -> u64 {
        u64::MAX
    }

    ///
    fn event_type(&self) -> EventType {
        EventType::Io
    }

    /// Io: the epoll event mask
    fn epoll_event(&self) -> u32 {
        libc::EPOLLIN as u32
    }

    /// Identity of the source while registered, usually its address:
    /// `self as *const Self as u64`
    fn token(&self) -> u64;

    /// Among ready sources the smallest value is dispatched first
    fn priority(&self) -> i8;

    /// Handle readiness. Runs on the loop thread and must not block.
    fn dispatch(&self, event: &Events) -> i32;

    /// used in logs
    fn description(&self) -> String {
        format!("{:?} source", self.event_type())
    }
}

impl std::hash::Hash for dyn Source {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        self.token().hash(state);
    }
}

impl PartialEq for dyn Source {
    fn eq(&self, other: &dyn Source) -> bool {
        self.token() == other.token()
    }
}

impl Eq for dyn Source {}

// pending sources pop from a max heap
impl Ord for dyn Source {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority().cmp(&other.priority()).reverse()
    }
}

impl PartialOrd for dyn Source {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for dyn Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("token", &self.token())
            .field("priority", &self.priority())
            .field("description", &self.description())
            .finish()
    }
}
