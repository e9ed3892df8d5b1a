//! Activation window - the `[start, end]` interval the relay may be active in
//!
//! Both bounds are inclusive. An unset end is represented by the maximal
//! representable instant and treated as "never".

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ContractError;

/// Inclusive `[start, end]` activation interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ActivationWindow {
    /// Sentinel for an unbounded end
    pub const INFINITE_END: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

    /// Create a window, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ContractError> {
        if start > end {
            return Err(ContractError::config_validation(
                "start / end",
                format!("start time {start} is after end time {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Build from optional RFC 3339 bounds
    ///
    /// Missing or empty `start` means `now`; missing or empty `end` means never.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, ContractError> {
        let start = match non_empty(start) {
            Some(s) => parse_rfc3339("start", s)?,
            None => now,
        };
        let end = match non_empty(end) {
            Some(s) => parse_rfc3339("end", s)?,
            None => Self::INFINITE_END,
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True when no end was configured
    pub fn is_unbounded(&self) -> bool {
        self.end == Self::INFINITE_END
    }

    /// True when `t` lies inside the window
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Time left before the window opens, None if already open
    pub fn until_start(&self, now: DateTime<Utc>) -> Option<Duration> {
        if now < self.start {
            (self.start - now).to_std().ok()
        } else {
            None
        }
    }

    /// Time left before the deadline, None if unbounded
    ///
    /// A deadline already in the past yields `Duration::ZERO`.
    pub fn until_end(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_unbounded() {
            return None;
        }
        Some((self.end - now).to_std().unwrap_or(Duration::ZERO))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, ContractError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ContractError::config_validation(field, format!("failed to get {field} time `{value}`: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let now = at(12, 0);
        let window = ActivationWindow::parse(None, None, now).unwrap();
        assert_eq!(window.start(), now);
        assert!(window.is_unbounded());
        assert_eq!(window.until_start(now), None);
        assert_eq!(window.until_end(now), None);
    }

    #[test]
    fn test_empty_strings_are_defaults() {
        let now = at(12, 0);
        let window = ActivationWindow::parse(Some(""), Some("  "), now).unwrap();
        assert_eq!(window.start(), now);
        assert!(window.is_unbounded());
    }

    #[test]
    fn test_parse_bounds() {
        let window = ActivationWindow::parse(
            Some("2026-01-01T13:00:00Z"),
            Some("2026-01-01T23:00:00+09:00"),
            at(12, 0),
        )
        .unwrap();
        assert_eq!(window.start(), at(13, 0));
        assert_eq!(window.end(), at(14, 0));
        assert_eq!(window.until_start(at(12, 0)), Some(Duration::from_secs(3600)));
        assert_eq!(window.until_end(at(13, 30)), Some(Duration::from_secs(1800)));
        assert_eq!(window.until_end(at(15, 0)), Some(Duration::ZERO));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result = ActivationWindow::parse(
            Some("2026-01-01T14:00:00Z"),
            Some("2026-01-01T13:00:00Z"),
            at(12, 0),
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("after end time"), "got: {err}");
    }

    #[test]
    fn test_bounds_inclusive() {
        let window = ActivationWindow::new(at(13, 0), at(13, 0)).unwrap();
        assert!(window.contains(at(13, 0)));
        assert!(!window.contains(at(13, 1)));
    }

    #[test]
    fn test_invalid_timestamp() {
        let result = ActivationWindow::parse(Some("yesterday"), None, at(12, 0));
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { ref field, .. }) if field == "start"
        ));
    }
}
