//! Wall-clock source for slot matching.

use std::sync::Mutex;

use {
    chrono::{Local, NaiveDateTime, TimeDelta, Utc},
    chrono_tz::Tz,
};

use crate::error::{Error, Result};

/// Supplies the current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Real time, in the system zone or a configured IANA zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<&str>) -> Result<Self> {
        let timezone = timezone
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| Error::unknown_timezone(name))
            })
            .transpose()?;
        Ok(Self { timezone })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveDate};

    #[test]
    fn rejects_unknown_zone() {
        assert!(SystemClock::new(Some("America/Sao_Paulo")).is_ok());
        assert!(matches!(
            SystemClock::new(Some("Mars/Olympus")),
            Err(Error::UnknownTimezone { .. })
        ));
    }

    #[test]
    fn fixed_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(23, 59, 30)
            .unwrap();
        let clock = FixedClock::new(start);
        clock.advance(TimeDelta::seconds(45));
        assert_eq!(clock.now().date(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }
}
