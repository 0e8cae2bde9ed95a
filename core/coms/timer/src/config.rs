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

//! Parsing of the timer directives and the deadline arithmetic
use basic::time_util::sec_to_usec;
use libcore::error::ParseWarning;
use libcore::unit::Unit;

/// the largest accepted value of OnBootSec and OnUnitActiveSec, one day
pub const MAX_SEC: u64 = 24 * 60 * 60;

/// Parse a number of seconds. An empty value is unset.
pub fn parse_sec(key: &str, value: &str) -> Result<Option<u64>, ParseWarning> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let sec = value
        .parse::<u64>()
        .map_err(|_| ParseWarning::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })?;
    if sec > MAX_SEC {
        return Err(ParseWarning::OutOfRange {
            key: key.to_string(),
            value: sec,
            max: MAX_SEC,
        });
    }

    Ok(Some(sec))
}

/// The schedule of a timer unit, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerSpec {
    /// delay of the first expiry
    pub on_boot: Option<u64>,
    /// interval of the following expiries
    pub on_active: Option<u64>,
}

impl TimerSpec {
    /// Read the schedule of the unit, invalid values are logged and treated as unset.
    pub fn from_unit(unit: &Unit) -> TimerSpec {
        let parse = |key: &str, value: &str| match parse_sec(key, value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("{}: {}, ignoring", unit.name(), e);
                None
            }
        };

        TimerSpec {
            on_boot: parse("OnBootSec", unit.on_boot_sec()),
            on_active: parse("OnUnitActiveSec", unit.on_active_sec()),
        }
    }

    /// whether the timer can ever fire
    pub fn fires(&self) -> bool {
        self.on_boot.unwrap_or(0) > 0 || self.on_active.unwrap_or(0) > 0
    }

    /// the recurring interval, zero for a single expiry
    pub fn interval(&self) -> u64 {
        self.on_active.unwrap_or(0)
    }

    /// The first deadline: OnBootSec after now if positive, else OnUnitActiveSec after now.
    pub fn first_deadline(&self, now: u64) -> Option<u64> {
        if !self.fires() {
            return None;
        }

        let delay = self
            .on_boot
            .filter(|s| *s > 0)
            .or(self.on_active)
            .unwrap_or(0);
        Some(now.saturating_add(sec_to_usec(delay)))
    }

    /// The deadline following an expiry handled at fired_at, if the timer recurs.
    pub fn next_deadline(&self, fired_at: u64) -> Option<u64> {
        match self.interval() {
            0 => None,
            interval => Some(fired_at.saturating_add(sec_to_usec(interval))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basic::time_util::USEC_PER_SEC;

    #[test]
    fn test_parse_sec() {
        assert_eq!(parse_sec("OnBootSec", "").unwrap(), None);
        assert_eq!(parse_sec("OnBootSec", " 2 ").unwrap(), Some(2));
        assert_eq!(parse_sec("OnBootSec", "0").unwrap(), Some(0));
        assert_eq!(parse_sec("OnBootSec", "86400").unwrap(), Some(86400));
        assert_eq!(
            parse_sec("OnBootSec", "86401").unwrap_err(),
            ParseWarning::OutOfRange {
                key: "OnBootSec".to_string(),
                value: 86401,
                max: MAX_SEC
            }
        );
        assert!(matches!(
            parse_sec("OnUnitActiveSec", "5min"),
            Err(ParseWarning::InvalidNumber { .. })
        ));
        assert!(parse_sec("OnUnitActiveSec", "-1").is_err());
    }

    #[test]
    fn test_from_unit() {
        let unit = Unit::parse("t.timer", "OnBootSec=abc\nOnUnitActiveSec=5\n");
        let spec = TimerSpec::from_unit(&unit);
        assert_eq!(spec.on_boot, None);
        assert_eq!(spec.on_active, Some(5));
        assert!(spec.fires());

        let unit = Unit::parse("t.timer", "OnBootSec=0\nOnUnitActiveSec=100000\n");
        assert!(!TimerSpec::from_unit(&unit).fires());
    }

    #[test]
    fn test_recurring_deadlines() {
        let spec = TimerSpec {
            on_boot: Some(2),
            on_active: Some(5),
        };

        let first = spec.first_deadline(0).unwrap();
        assert_eq!(first, 2 * USEC_PER_SEC);

        /* the interval is counted from the expiry, latency accumulates */
        let fired = first + 300;
        let second = spec.next_deadline(fired).unwrap();
        assert_eq!(second, 7 * USEC_PER_SEC + 300);
        let third = spec.next_deadline(second).unwrap();
        assert_eq!(third, 12 * USEC_PER_SEC + 300);
    }

    #[test]
    fn test_single_deadlines() {
        let once = TimerSpec {
            on_boot: Some(3),
            on_active: None,
        };
        assert_eq!(once.first_deadline(10), Some(10 + 3 * USEC_PER_SEC));
        assert_eq!(once.next_deadline(10), None);

        let active_only = TimerSpec {
            on_boot: None,
            on_active: Some(4),
        };
        assert_eq!(active_only.first_deadline(0), Some(4 * USEC_PER_SEC));

        let zero_boot = TimerSpec {
            on_boot: Some(0),
            on_active: Some(4),
        };
        assert_eq!(zero_boot.first_deadline(7), Some(7 + 4 * USEC_PER_SEC));

        assert_eq!(TimerSpec::default().first_deadline(0), None);
    }

    #[test]
    fn test_zero_boot_delay_waits_for_interval() {
        let unit = Unit::parse("t.timer", "OnBootSec=0\nOnUnitActiveSec=5\n");
        let spec = TimerSpec::from_unit(&unit);
        assert_eq!(spec.on_boot, Some(0));
        assert!(spec.fires());
        assert_eq!(spec.first_deadline(1000).unwrap() - 1000, 5 * USEC_PER_SEC);

        let unit = Unit::parse("t.timer", "OnBootSec=0\n");
        assert_eq!(TimerSpec::from_unit(&unit).first_deadline(1000), None);
    }
}
