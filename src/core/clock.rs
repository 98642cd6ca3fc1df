//! Time source used for the `last_updated` stamp and log lines

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock localized to a fixed time zone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Tz>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_uses_zone() {
        let clock = SystemClock::new(chrono_tz::Asia::Karachi);
        assert_eq!(clock.now().timezone(), chrono_tz::Asia::Karachi);
    }

    #[test]
    fn test_fixed_clock() {
        let instant = chrono_tz::Asia::Karachi
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now().to_rfc3339(), "2024-03-01T09:30:00+05:00");
    }
}
