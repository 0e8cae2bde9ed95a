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

//! Deadlines of the timer sources on CLOCK_MONOTONIC, earliest first.
use crate::Source;
use basic::time_util::{NSEC_PER_USEC, USEC_INFINITY, USEC_PER_SEC};
use std::collections::BinaryHeap;
use std::mem;
use std::rc::Rc;

/// the monotonic clock in usec
pub(crate) fn now() -> u64 {
    let mut tp = mem::MaybeUninit::<libc::timespec>::zeroed();
    // CLOCK_MONOTONIC always exists, clock_gettime cannot fail on it
    let tp = unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, tp.as_mut_ptr());
        tp.assume_init()
    };
    timespec_to_usec(&tp)
}

fn timespec_to_usec(ts: &libc::timespec) -> u64 {
    if ts.tv_sec < 0 || ts.tv_nsec < 0 {
        return USEC_INFINITY;
    }

    let sec = ts.tv_sec as u64;
    let usec = ts.tv_nsec as u64 / NSEC_PER_USEC;
    if sec > (USEC_INFINITY - usec) / USEC_PER_SEC {
        return USEC_INFINITY;
    }
    sec * USEC_PER_SEC + usec
}

/// the absolute itimerspec arming a timerfd at deadline
pub(crate) fn itimerspec_at(deadline: u64) -> libc::itimerspec {
    libc::itimerspec {
        it_interval: libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        },
        it_value: libc::timespec {
            tv_sec: (deadline / USEC_PER_SEC) as libc::time_t,
            tv_nsec: ((deadline % USEC_PER_SEC) * NSEC_PER_USEC) as libc::c_long,
        },
    }
}

#[derive(Debug, Default)]
pub(crate) struct Timer {
    data: BinaryHeap<Deadline>,
}

impl Timer {
    pub fn new() -> Timer {
        Self::default()
    }

    /// the earliest deadline
    pub fn next(&self) -> Option<u64> {
        self.data.peek().map(|d| d.at)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// queue the source at Source::time()
    pub fn push(&mut self, source: Rc<dyn Source>) {
        let at = source.time();
        self.data.push(Deadline { source, at });
    }

    /// pop one source whose deadline is not after now
    pub fn pop(&mut self, now: u64) -> Option<Rc<dyn Source>> {
        match self.data.peek() {
            Some(d) if d.at <= now => self.data.pop().map(|d| d.source),
            _ => None,
        }
    }

    pub fn remove(&mut self, source: &Rc<dyn Source>) {
        let token = source.token();
        self.data.retain(|d| d.source.token() != token);
    }
}

#[derive(Debug)]
struct Deadline {
    source: Rc<dyn Source>,
    at: u64,
}

// BinaryHeap is a max heap, the earliest deadline must compare greatest
impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).reverse()
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for Deadline {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{EventType, Events};

    struct At(u64);

    impl Source for At {
        fn event_type(&self) -> EventType {
            EventType::TimerMonotonic
        }

        fn time(&self) -> u64 {
            self.0
        }

        fn token(&self) -> u64 {
            self as *const Self as u64
        }

        fn priority(&self) -> i8 {
            0
        }

        fn dispatch(&self, _: &Events) -> i32 {
            0
        }
    }

    #[test]
    fn test_now_is_monotonic() {
        let first = now();
        let second = now();
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn test_timespec_to_usec() {
        let ts = libc::timespec {
            tv_sec: 2,
            tv_nsec: 5_000,
        };
        assert_eq!(timespec_to_usec(&ts), 2 * USEC_PER_SEC + 5);
        let negative = libc::timespec {
            tv_sec: -1,
            tv_nsec: 0,
        };
        assert_eq!(timespec_to_usec(&negative), USEC_INFINITY);

        let spec = itimerspec_at(3 * USEC_PER_SEC + 7);
        assert_eq!(spec.it_value.tv_sec, 3);
        assert_eq!(spec.it_value.tv_nsec, 7_000);
    }

    #[test]
    fn test_pops_in_deadline_order() {
        let mut timer = Timer::new();
        let now = now();

        let late: Rc<dyn Source> = Rc::new(At(now + 20 * USEC_PER_SEC));
        let early: Rc<dyn Source> = Rc::new(At(now - 1));
        timer.push(late.clone());
        timer.push(early.clone());

        assert_eq!(timer.next(), Some(now - 1));
        let popped = timer.pop(now).unwrap();
        assert_eq!(popped.token(), early.token());
        // the late one is not due yet
        assert!(timer.pop(now).is_none());

        timer.remove(&late);
        assert!(timer.is_empty());
    }
}
