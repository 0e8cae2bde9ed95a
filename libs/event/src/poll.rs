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

//! The epoll instance behind [`crate::Events`].
use crate::Result;
use libc::{epoll_event, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL};
use std::os::unix::io::{AsRawFd, RawFd};

/// Call a libc function, turning a negative return into [`crate::Error::Syscall`] with errno.
#[macro_export]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let ret = unsafe { libc::$fn($($arg, )*) };
        if ret < 0 {
            $crate::Result::Err($crate::Error::Syscall {
                syscall: stringify!($fn),
                ret,
                errno: std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
            })
        } else {
            $crate::Result::Ok(ret)
        }
    }};
}

/// One epoll descriptor and the number of descriptors registered on it
#[derive(Debug)]
pub struct Poll {
    epfd: RawFd,
    registered: usize,
}

impl Poll {
    ///
    pub fn new() -> Result<Poll> {
        let epfd = syscall!(epoll_create1(EPOLL_CLOEXEC))?;
        Ok(Poll {
            epfd,
            registered: 0,
        })
    }

    /// Wait up to timeout milliseconds, -1 blocks. Returns the ready events.
    pub fn poll(&self, timeout: i32) -> Result<Vec<epoll_event>> {
        let mut ready = Vec::<epoll_event>::with_capacity(self.registered.max(1));
        let n = syscall!(epoll_wait(
            self.epfd,
            ready.as_mut_ptr(),
            ready.capacity() as i32,
            timeout,
        ))?;
        // the first n entries were written by the kernel
        unsafe { ready.set_len(n as usize) };
        Ok(ready)
    }

    /// watch fd, event.u64 comes back with every readiness report
    pub fn register(&mut self, fd: RawFd, event: &mut epoll_event) -> Result<()> {
        syscall!(epoll_ctl(self.epfd, EPOLL_CTL_ADD, fd, event))?;
        self.registered += 1;
        Ok(())
    }

    ///
    pub fn unregister(&mut self, fd: RawFd) -> Result<()> {
        syscall!(epoll_ctl(
            self.epfd,
            EPOLL_CTL_DEL,
            fd,
            std::ptr::null_mut()
        ))?;
        self.registered = self.registered.saturating_sub(1);
        Ok(())
    }
}

impl AsRawFd for Poll {
    fn as_raw_fd(&self) -> RawFd {
        self.epfd
    }
}

impl Drop for Poll {
    fn drop(&mut self) {
        basic::fd_util::close(self.epfd);
    }
}

#[cfg(test)]
mod tests {
    use super::Poll;
    use crate::Error;
    use std::io::Write;
    use std::os::unix::{io::AsRawFd, net::UnixStream};

    #[test]
    fn test_register_and_poll() {
        let mut poll = Poll::new().unwrap();
        assert!(poll.as_raw_fd() >= 0);

        let (mut tx, rx) = UnixStream::pair().unwrap();
        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: 7,
        };
        poll.register(rx.as_raw_fd(), &mut event).unwrap();
        assert!(poll.poll(0).unwrap().is_empty());

        tx.write_all(b"x").unwrap();
        let ready = poll.poll(100).unwrap();
        assert_eq!(ready.len(), 1);
        let token = ready[0].u64;
        assert_eq!(token, 7);

        poll.unregister(rx.as_raw_fd()).unwrap();
        assert!(poll.poll(0).unwrap().is_empty());
    }

    #[test]
    fn test_unregister_unknown_fd() {
        let mut poll = Poll::new().unwrap();
        let (_tx, rx) = UnixStream::pair().unwrap();
        match poll.unregister(rx.as_raw_fd()) {
            Err(Error::Syscall { syscall, errno, .. }) => {
                assert_eq!(syscall, "epoll_ctl");
                assert_eq!(errno, libc::ENOENT);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
