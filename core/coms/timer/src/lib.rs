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

//! # Timer activation
//!
//! Timer units start their linked service OnBootSec seconds after activation and,
//! when OnUnitActiveSec is set, again every OnUnitActiveSec seconds counted from
//! the previous expiry.
pub mod config;
pub mod error;
mod mng;

pub use config::TimerSpec;
pub use error::*;
pub use mng::TimerActivation;
