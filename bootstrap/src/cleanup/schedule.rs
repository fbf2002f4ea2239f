// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation of cron expressions into systemd calendar events.

use std::fmt;

/// When a cleanup timer fires.
///
/// Only two shapes of cron expression are understood: "every hour at minute
/// M" and "every day at H:M". Anything else becomes [Self::Fallback], which
/// fires hourly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerSchedule {
    HourlyAt { minute: u8 },
    DailyAt { hour: u8, minute: u8 },
    Fallback,
}

impl TimerSchedule {
    pub fn from_cron(expr: &str) -> Self {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields[..]
        else {
            return Self::Fallback;
        };
        let Some(minute) = parse_field(minute, 59) else {
            return Self::Fallback;
        };
        if hour == "*" {
            return Self::HourlyAt { minute };
        }
        if [day_of_month, month, day_of_week].iter().all(|f| *f == "*") {
            if let Some(hour) = parse_field(hour, 23) {
                return Self::DailyAt { hour, minute };
            }
        }
        Self::Fallback
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    /// The value for a timer unit's `OnCalendar=` setting.
    pub fn on_calendar(&self) -> String {
        match self {
            Self::HourlyAt { minute } => format!("*-*-* *:{minute:02}:00"),
            Self::DailyAt { hour, minute } => {
                format!("*-*-* {hour:02}:{minute:02}:00")
            }
            Self::Fallback => "hourly".to_string(),
        }
    }
}

impl fmt::Display for TimerSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.on_calendar())
    }
}

// A plain decimal number no greater than `max`.
fn parse_field(field: &str, max: u8) -> Option<u8> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<u8>().ok().filter(|v| *v <= max)
}
