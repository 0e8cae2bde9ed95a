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

use crate::error::*;
use event::{EventType, Events, Source};
use nix::sys::signal::Signal;
use nix::sys::signalfd::siginfo;

pub(crate) const EVENT_SIGNALS: [Signal; 4] = [
    Signal::SIGCHLD,
    Signal::SIGTERM,
    Signal::SIGINT,
    Signal::SIGUSR1,
];

pub(super) struct Signals<T> {
    signal_handler: T,
}

pub(super) trait SignalDispatcher {
    fn dispatch_signal(&self, e: &Events, signal: &siginfo) -> Result<i32>;
}

impl<T> Signals<T> {
    pub(super) fn new(data_handler: T) -> Self {
        Signals {
            signal_handler: data_handler,
        }
    }
}

impl<T: SignalDispatcher> Source for Signals<T> {
    fn event_type(&self) -> EventType {
        EventType::Signal
    }

    fn signals(&self) -> Vec<Signal> {
        Vec::from(EVENT_SIGNALS)
    }

    fn epoll_event(&self) -> u32 {
        (libc::EPOLLIN) as u32
    }

    fn dispatch(&self, e: &Events) -> i32 {
        log::debug!("Dispatching signals!");

        if let Some(info) = e.read_signals() {
            log::debug!("read signal from event: {}", info.ssi_signo);
            if let Err(err) = self.signal_handler.dispatch_signal(e, &info) {
                log::error!("dispatch signal failed : {}", err);
            }
        }

        0
    }

    fn token(&self) -> u64 {
        self as *const Self as u64
    }

    fn priority(&self) -> i8 {
        -6i8
    }
}
