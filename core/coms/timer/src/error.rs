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

//! Error define of timer activation
use snafu::prelude::*;

/// The timer unit never fires.
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum ScheduleError {
    #[snafu(display("NeverFires(timer): '{}' has no positive OnBootSec or OnUnitActiveSec.", name))]
    NeverFires { name: String },

    #[snafu(display("RegisterError(timer): '{}': {}", name, source))]
    Register { name: String, source: event::Error },
}

/// new Result
pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;
