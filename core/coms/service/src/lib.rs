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

//! # The service supervisor
//!
//! Starts service units as shell command lines, tracks one entry per launch and
//! updates it when the reactor reports the child as reaped.
//!
//! The supervisor never waits for its children itself, the owner of the SIGCHLD
//! watch drains them and hands every wait status to [`Supervisor::reap`].
pub mod error;
mod mng;
mod rentry;
mod spawn;

pub use error::*;
pub use mng::Supervisor;
pub use rentry::{ServiceState, ServiceStatus};
pub use spawn::Isolation;
