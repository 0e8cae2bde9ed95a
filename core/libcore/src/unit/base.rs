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
use std::fmt;
use std::str::FromStr;

/// the kind of a unit, inferred from the suffix of its file name
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum UnitType {
    /// a supervised process
    Service,
    /// a listening socket activating a service
    Socket,
    /// a deadline activating a service
    Timer,
    /// parsed, but not managed by anyone
    Unknown,
}

impl UnitType {
    ///
    pub fn iterator() -> impl Iterator<Item = UnitType> {
        [UnitType::Service, UnitType::Socket, UnitType::Timer]
            .iter()
            .copied()
    }

    /// the file name suffix of the type, including the dot
    pub fn suffix(&self) -> &'static str {
        match self {
            UnitType::Service => ".service",
            UnitType::Socket => ".socket",
            UnitType::Timer => ".timer",
            UnitType::Unknown => "",
        }
    }

    /// the section header owning the type specific directives
    pub fn section(&self) -> &'static str {
        match self {
            UnitType::Service => "Service",
            UnitType::Socket => "Socket",
            UnitType::Timer => "Timer",
            UnitType::Unknown => "Unit",
        }
    }
}

impl FromStr for UnitType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ret = match s.to_lowercase().as_str() {
            "service" => UnitType::Service,
            "socket" => UnitType::Socket,
            "timer" => UnitType::Timer,
            _ => UnitType::Unknown,
        };
        Ok(ret)
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitType::Service => "service",
            UnitType::Socket => "socket",
            UnitType::Timer => "timer",
            UnitType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// infer the unit type from the suffix of the unit name
pub fn unit_name_to_type(unit_name: &str) -> UnitType {
    UnitType::iterator()
        .find(|t| {
            let suffix = t.suffix();
            unit_name.len() > suffix.len() && unit_name.ends_with(suffix)
        })
        .unwrap_or(UnitType::Unknown)
}
