use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Server-side source of "now". Check-ins are always stamped with
/// this clock, never with a time supplied by the scanner.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(at))
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap() = at;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Decides which local calendar day an instant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    /// Time zone of the host, including its daylight saving rules.
    System,
    Fixed(FixedOffset),
}

impl Timezone {
    #[must_use]
    pub fn date_of(self, at: DateTime<Utc>) -> NaiveDate {
        self.local(at).date()
    }

    #[must_use]
    pub fn time_of(self, at: DateTime<Utc>) -> NaiveTime {
        self.local(at).time()
    }

    /// Returns the half-open `[start, end)` instants covering the
    /// whole local calendar day of `date`.
    #[must_use]
    pub fn day_bounds(self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
        (self.start_of(date), self.start_of(next))
    }

    fn local(self, at: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::System => at.with_timezone(&Local).naive_local(),
            Self::Fixed(offset) => at.with_timezone(&offset).naive_local(),
        }
    }

    fn start_of(self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self {
            Self::Fixed(offset) => {
                let utc = midnight - chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
                Utc.from_utc_datetime(&utc)
            }
            // midnight may not exist on days where DST starts at 00:00
            Self::System => Local
                .from_local_datetime(&midnight)
                .earliest()
                .or_else(|| {
                    Local
                        .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                        .earliest()
                })
                .map_or_else(
                    || Utc.from_utc_datetime(&midnight),
                    |start| start.with_timezone(&Utc),
                ),
        }
    }
}
