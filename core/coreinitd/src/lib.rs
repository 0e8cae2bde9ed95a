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

//! coreinit: a minimal service supervisor with socket and timer activation.
//!
//! [`Manager`] loads the unit directory, starts every service, listens on the socket units and
//! schedules the timer units, then runs one single threaded event loop until SIGTERM or SIGINT.
//!
//! ```no_run
//! use coreinit::manager::{config::ManagerConfig, Manager};
//!
//! let manager = Manager::new(ManagerConfig::new(None));
//! manager.startup().unwrap();
//! manager.main_loop().unwrap();
//! manager.shutdown();
//! ```
pub mod error;
pub mod manager;

pub use manager::{Manager, ReactorState};
