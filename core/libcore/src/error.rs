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

//! Error define, There is no globally defined error library, and each crate defines its own error.rs.
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;
use std::path::PathBuf;

/// Errors raised while loading unit files. A failing file is skipped, the batch goes on.
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum LoadError {
    #[snafu(display("NotFound(libcore): '{}': {}", path.display(), source))]
    NotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("ReadError(libcore): '{}': {}", path.display(), source))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("ReadDirError(libcore): '{}': {}", path.display(), source))]
    ReadDir {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("Capacity(libcore): unit limit {} reached, '{}' and later units are not loaded", max, path.display()))]
    Capacity { max: usize, path: PathBuf },
}

/// Recoverable problems found in a directive; the directive is ignored or treated as unset.
#[allow(missing_docs)]
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum ParseWarning {
    #[snafu(display("invalid number '{}' for {}", value, key))]
    InvalidNumber { key: String, value: String },

    #[snafu(display("{}={} is out of range, the limit is {}", key, value, max))]
    OutOfRange { key: String, value: u64, max: u64 },

    #[snafu(display("unknown directive '{}', ignoring", key))]
    UnknownKey { key: String },
}

/// new Result
pub type Result<T, E = LoadError> = std::result::Result<T, E>;
