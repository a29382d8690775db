use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use worldsmith::error::Result;
use worldsmith::schedule::{ScheduleSpec, seconds_until};

const DAY: i64 = 86_400;

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

#[test]
fn test_parse_schedule() -> Result<()> {
    let spec = ScheduleSpec::parse("MWF 0300")?;
    assert!(spec.fires_on(1)); // Monday
    assert!(spec.fires_on(3)); // Wednesday
    assert!(spec.fires_on(5)); // Friday
    assert!(!spec.fires_on(0));
    assert!(!spec.fires_on(6));
    assert_eq!(spec.hour(), 3);
    assert_eq!(spec.minute(), 0);

    let daily = ScheduleSpec::parse("SMTWRFD 1430")?;
    for day in 0..7 {
        assert!(daily.fires_on(day));
    }
    assert_eq!(daily.hour(), 14);
    assert_eq!(daily.minute(), 30);

    Ok(())
}

#[test]
fn test_parse_rejects_malformed_schedules() {
    assert!(ScheduleSpec::parse("").is_err());
    assert!(ScheduleSpec::parse("MWF").is_err());
    assert!(ScheduleSpec::parse("MWF 0300 extra").is_err());
    assert!(ScheduleSpec::parse("X 0300").is_err());
    assert!(ScheduleSpec::parse("M 300").is_err());
    assert!(ScheduleSpec::parse("M 2500").is_err());
    assert!(ScheduleSpec::parse("M 0960").is_err());
    assert!(ScheduleSpec::parse("M 03a0").is_err());
}

#[test]
fn test_seconds_until_same_day_before_time() -> Result<()> {
    let spec = ScheduleSpec::parse("MWF 0300")?;
    // 2024-01-01 is a Monday.
    let now = at(2024, 1, 1, 1, 0, 0);
    assert_eq!(seconds_until(&spec, now), 2 * 3600);

    // Seconds are accounted for.
    let now = at(2024, 1, 1, 2, 59, 30);
    assert_eq!(seconds_until(&spec, now), 30);
    Ok(())
}

#[test]
fn test_seconds_until_skips_to_next_masked_day() -> Result<()> {
    let spec = ScheduleSpec::parse("MWF 0300")?;
    // Monday 04:00, past today's trigger: next is Wednesday 03:00.
    let now = at(2024, 1, 1, 4, 0, 0);
    assert_eq!(seconds_until(&spec, now), 2 * DAY - 3600);

    // Saturday 12:00: next is Monday 03:00.
    let now = at(2024, 1, 6, 12, 0, 0);
    assert_eq!(seconds_until(&spec, now), DAY + 15 * 3600);
    Ok(())
}

#[test]
fn test_seconds_until_wraps_full_week_when_today_already_passed() -> Result<()> {
    // Single-day mask with today's time already past must wrap to the
    // same weekday next week, not fire immediately.
    let spec = ScheduleSpec::parse("M 0300")?;
    let now = at(2024, 1, 1, 3, 0, 1);
    assert_eq!(seconds_until(&spec, now), 7 * DAY - 1);
    Ok(())
}

#[test]
fn test_seconds_until_rolls_forward_at_exact_occurrence() -> Result<()> {
    // A just-arrived occurrence yields the next one, never zero.
    let spec = ScheduleSpec::parse("M 0300")?;
    let now = at(2024, 1, 1, 3, 0, 0);
    assert_eq!(seconds_until(&spec, now), 7 * DAY);
    Ok(())
}

#[test]
fn test_seconds_until_applied_twice_reaches_the_following_occurrence() -> Result<()> {
    let spec = ScheduleSpec::parse("TR 0615")?;
    let now = at(2024, 1, 1, 12, 0, 0);

    let first = seconds_until(&spec, now);
    let target = now + chrono::Duration::seconds(first);
    let second = seconds_until(&spec, target);

    assert!(second > 0, "offset at an occurrence must roll forward");
    let next = target + chrono::Duration::seconds(second);
    assert_ne!(target, next);
    assert_eq!(next.hour(), 6);
    assert_eq!(next.minute(), 15);
    Ok(())
}

#[test]
fn test_seconds_until_target_always_matches_spec() -> Result<()> {
    let specs = [
        ScheduleSpec::parse("M 0300")?,
        ScheduleSpec::parse("MWF 0300")?,
        ScheduleSpec::parse("SMTWRFD 2359")?,
        ScheduleSpec::parse("D 0000")?,
        ScheduleSpec::parse("TR 1845")?,
    ];
    // A spread of current times across weekdays, hours, and seconds.
    let mut now = at(2024, 3, 1, 0, 0, 0);
    for _ in 0..200 {
        now += chrono::Duration::seconds(5 * 3600 + 1234);
        for spec in &specs {
            let offset = seconds_until(spec, now);
            assert!(offset > 0, "offset must be strictly positive");
            assert!(offset <= 7 * DAY, "offset must be at most a week out");

            let target = now + chrono::Duration::seconds(offset);
            let weekday = target.weekday().num_days_from_sunday() as usize;
            assert!(spec.fires_on(weekday), "target weekday must be in the mask");
            assert_eq!(target.hour(), spec.hour());
            assert_eq!(target.minute(), spec.minute());
            assert_eq!(target.second(), 0);
        }
    }
    Ok(())
}
