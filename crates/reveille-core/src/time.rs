//! The shared alarm time value.
//!
//! A [`SimpleTime`] is an hour:minute pair in the reference zone (UTC),
//! independent of any device's wall clock. It is what the group document
//! stores on the wire (`"HH:MM"`), and every device converts it to its own
//! local trigger instant when arming.
//!
//! Malformed wire input never errors: it decodes to the documented default
//! of `00:00`, so a damaged document degrades to a midnight alarm instead
//! of wedging the reconciliation loop.

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::clock::Clock;

/// An hour:minute wall-clock value in the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimpleTime {
    hour: u8,
    minute: u8,
}

impl SimpleTime {
    /// The documented fallback value: midnight reference time.
    pub const DEFAULT: SimpleTime = SimpleTime { hour: 0, minute: 0 };

    /// Build a time value, rejecting out-of-range fields.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour <= 23 && minute <= 59 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Parse the wire form `"HH:MM"`. Anything malformed yields
    /// [`SimpleTime::DEFAULT`], never an error.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.splitn(2, ':');
        let hour = parts.next().and_then(|p| p.trim().parse::<u8>().ok());
        let minute = parts.next().and_then(|p| p.trim().parse::<u8>().ok());
        match (hour, minute) {
            (Some(h), Some(m)) => Self::new(h, m).unwrap_or(Self::DEFAULT),
            _ => Self::DEFAULT,
        }
    }

    /// Convert a local wall-clock reading back into the reference zone.
    pub fn from_local(hour: u8, minute: u8, clock: &dyn Clock) -> Self {
        let total = i32::from(hour) * 60 + i32::from(minute) - clock.offset_minutes();
        let total = total.rem_euclid(24 * 60);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    // ── Scheduling ───────────────────────────────────────────────────

    /// The instant of the *next* occurrence of this reference time, as
    /// seen from the device's clock.
    ///
    /// The reference time is laid onto the device's current calendar
    /// date, then clamped into the window `(now, now + 24h]`: an
    /// occurrence already in the past rolls forward a day, one more than
    /// a day out rolls back. The armed trigger is therefore never today's
    /// already-passed occurrence and never more than a day away.
    pub fn next_local_occurrence(&self, clock: &dyn Clock) -> DateTime<Utc> {
        let now = clock.now();
        let offset = Duration::minutes(i64::from(clock.offset_minutes()));
        let local_today = (now + offset).date_naive();
        let at = NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN);
        let mut instant = local_today.and_time(at).and_utc();
        if instant <= now {
            instant += Duration::hours(24);
        } else if instant > now + Duration::hours(24) {
            instant -= Duration::hours(24);
        }
        instant
    }

    // ── Display helpers ──────────────────────────────────────────────

    pub fn ampm_suffix(&self) -> &'static str {
        if self.hour < 12 {
            "AM"
        } else {
            "PM"
        }
    }

    /// Reference time in 12-hour form, without the AM/PM suffix.
    pub fn hour12(&self) -> String {
        format!("{:02}:{:02}", self.hour % 12, self.minute)
    }

    /// This time as the device's wall clock will show it, split into
    /// `("hh:mm", "AM"|"PM")`. Midnight renders as `12:xx AM`.
    pub fn local_parts(&self, clock: &dyn Clock) -> (String, String) {
        let total = i32::from(self.hour) * 60 + i32::from(self.minute) + clock.offset_minutes();
        let total = total.rem_euclid(24 * 60);
        let (hour, minute) = (total / 60, total % 60);
        let suffix = if hour < 12 { "AM" } else { "PM" };
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        (format!("{hour12:02}:{minute:02}"), suffix.to_string())
    }

    /// The device's zone offset rendered as `"+05:30"` / `"-08:00"`.
    pub fn local_offset_text(clock: &dyn Clock) -> String {
        let offset = clock.offset_minutes();
        let sign = if offset >= 0 { "+" } else { "-" };
        let abs = offset.abs();
        format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
    }

    /// Human countdown to the next occurrence: `"7 hrs & 5 mins"`,
    /// `"1 min"`, or `"less than a minute"`.
    pub fn countdown_text(&self, clock: &dyn Clock) -> String {
        let diff = self.next_local_occurrence(clock) - clock.now();
        let total_minutes = diff.num_minutes().max(0);
        let hours = total_minutes / 60;
        let minutes = total_minutes - hours * 60;

        let mut out = String::new();
        if hours > 0 {
            out.push_str(&format!("{hours} hrs"));
        }
        if minutes > 0 {
            if hours > 0 {
                out.push_str(" & ");
            }
            out.push_str(&format!("{minutes} min"));
            if minutes > 1 {
                out.push('s');
            }
        }
        if out.is_empty() {
            out.push_str("less than a minute");
        }
        out
    }
}

impl Default for SimpleTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SimpleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// Wire form is the `"HH:MM"` string, matching the document schema.

impl Serialize for SimpleTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SimpleTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Tolerate a missing or non-string field upstream via
        // `#[serde(default)]`; a present-but-bad string defaults here.
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.as_deref().map(SimpleTime::parse).unwrap_or_default())
    }
}
