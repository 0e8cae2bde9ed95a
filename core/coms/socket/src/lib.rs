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

//! # Socket activation
//!
//! Every socket unit with a ListenStream endpoint gets a listening socket watched by the
//! reactor. A readable socket starts the service linked to the unit and the pending
//! connection is accepted and closed.
pub mod error;
mod mng;
mod port;

pub use error::*;
pub use mng::SocketActivation;
pub use port::{ListenEndpoint, SocketPort};
