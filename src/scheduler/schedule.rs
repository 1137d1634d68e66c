//! Daily run times

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};

use super::error::{SchedulerError, SchedulerResult};

/// Days searched for the next resolvable run time
const SEARCH_DAYS: i64 = 3;

/// Set of local wall-clock times at which the job runs every day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    times: Vec<NaiveTime>,
}

impl DailySchedule {
    /// Create a schedule; times are sorted and de-duplicated
    pub fn new(mut times: Vec<NaiveTime>) -> SchedulerResult<Self> {
        if times.is_empty() {
            return Err(SchedulerError::EmptySchedule);
        }
        times.sort();
        times.dedup();
        Ok(Self { times })
    }

    /// Parse `HH:MM` strings
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> SchedulerResult<Self> {
        let times = raw
            .iter()
            .map(|s| {
                let s = s.as_ref().trim();
                NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| SchedulerError::invalid_time(s))
            })
            .collect::<SchedulerResult<Vec<_>>>()?;
        Self::new(times)
    }

    /// Run times in ascending order
    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// First naive run time strictly after `now`
    pub fn next_naive_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        self.times
            .iter()
            .map(|t| today.and_time(*t))
            .find(|candidate| *candidate > now)
            .unwrap_or_else(|| (today + Duration::days(1)).and_time(self.times[0]))
    }

    /// Next run strictly after `now` in the given time zone
    ///
    /// Local times skipped by a DST transition are passed over.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> SchedulerResult<DateTime<Tz>> {
        let tz = now.timezone();
        let mut cursor = now.naive_local();
        let limit = cursor + Duration::days(SEARCH_DAYS);

        while cursor < limit {
            let candidate = self.next_naive_after(cursor);
            if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
                if resolved > *now {
                    return Ok(resolved);
                }
            }
            cursor = candidate;
        }

        Err(SchedulerError::NoUpcomingRun {
            after: now.naive_local().to_string(),
        })
    }

    /// Time to wait from now until the next local run
    pub fn duration_until_next(&self) -> SchedulerResult<(DateTime<Local>, std::time::Duration)> {
        let now = Local::now();
        let next = self.next_run_after(&now)?;
        let wait = next
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        Ok((next, wait))
    }
}
