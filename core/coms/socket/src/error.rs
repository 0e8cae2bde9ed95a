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

//! Error define of socket activation
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;

/// The socket unit stays inactive for the lifetime of the process.
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum BindError {
    #[snafu(display("InvalidEndpoint(socket): '{}'.", listen))]
    InvalidEndpoint { listen: String },

    #[snafu(display("SocketError(socket): '{}': {}", listen, source))]
    Socket { listen: String, source: nix::Error },

    #[snafu(display("BindError(socket): '{}': {}", listen, source))]
    Bind { listen: String, source: nix::Error },

    #[snafu(display("ListenError(socket): '{}': {}", listen, source))]
    Listen { listen: String, source: nix::Error },

    #[snafu(display("RegisterError(socket): '{}': {}", listen, source))]
    Register {
        listen: String,
        source: event::Error,
    },
}

/// new Result
pub type Result<T, E = BindError> = std::result::Result<T, E>;
