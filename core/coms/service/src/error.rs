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

//! Error define of the supervisor
use snafu::prelude::*;

/// A start attempt is abandoned on any of these, there is no retry.
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum StartError {
    #[snafu(display("NotAService(service): '{}' has no command to run.", name))]
    NotAService { name: String },

    #[snafu(display("TableFull(service): {} services are already tracked.", capacity))]
    TableFull { capacity: usize },

    #[snafu(display("SpawnFailed(service): '{}': {}", name, source))]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },
}

/// new Result
pub type Result<T, E = StartError> = std::result::Result<T, E>;
