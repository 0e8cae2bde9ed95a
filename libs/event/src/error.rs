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

//! Failures of the event loop itself, a failing source never ends up here
use snafu::prelude::*;

/// Event loop error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Error {
    #[snafu(display("EventError: io: {}", source))]
    Io { source: std::io::Error },
    #[snafu(display("EventError: {}", source))]
    Nix { source: nix::Error },
    #[snafu(display("EventError: {}", word))]
    Other { word: &'static str },
    #[snafu(display("EventError: {} returned {}, errno {}", syscall, ret, errno))]
    Syscall {
        syscall: &'static str,
        ret: i32,
        errno: i32,
    },
}

impl Error {
    /// interrupted system calls are retried by the caller, never fatal
    pub fn is_interrupted(&self) -> bool {
        match self {
            Error::Syscall { errno, .. } => *errno == libc::EINTR,
            Error::Nix { source } => *source == nix::errno::Errno::EINTR,
            Error::Io { source } => source.kind() == std::io::ErrorKind::Interrupted,
            Error::Other { .. } => false,
        }
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;
