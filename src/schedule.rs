use chrono::{DateTime, Datelike, Days, NaiveDateTime, NaiveTime, TimeZone, Weekday};

/// Next `weekday` at `time_of_day`, evaluated in the time zone of `now`.
///
/// The result is always strictly after `now`. When `now` already falls on
/// `weekday` the same day is skipped and next week's occurrence is returned,
/// even if `time_of_day` is still ahead.
pub fn next_occurrence<Tz: TimeZone>(
    now: &DateTime<Tz>,
    weekday: Weekday,
    time_of_day: NaiveTime,
) -> Result<DateTime<Tz>, ScheduleError> {
    let local = now.naive_local();

    let offset = (7 + weekday.num_days_from_sunday() - local.weekday().num_days_from_sunday()) % 7;
    let mut candidate = add_days(local, offset)?;
    if candidate <= local {
        candidate = add_days(candidate, 7)?;
    }

    let target = candidate.date().and_time(time_of_day);

    now.timezone()
        .from_local_datetime(&target)
        .earliest()
        .ok_or(ScheduleError::NonexistentLocalTime(target))
}

fn add_days(datetime: NaiveDateTime, days: u32) -> Result<NaiveDateTime, ScheduleError> {
    datetime
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or(ScheduleError::OutOfRange)
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Local time {0} does not exist in this time zone")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("Target date is out of range")]
    OutOfRange,
}
