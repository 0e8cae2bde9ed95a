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

//!
/// an infinite timeout
pub const USEC_INFINITY: u64 = u64::MAX;

/// usec per sec
pub const USEC_PER_SEC: u64 = 1000000;
/// usec per millisecond
pub const USEC_PER_MSEC: u64 = 1000;
/// nsec per sec
pub const NSEC_PER_SEC: u64 = 1000000000;
/// nsec per usec
pub const NSEC_PER_USEC: u64 = 1000;

/// convert whole seconds to usec, saturating instead of overflowing
pub fn sec_to_usec(sec: u64) -> u64 {
    sec.saturating_mul(USEC_PER_SEC)
}
