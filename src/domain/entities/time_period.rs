//! TimePeriod algebra.
//!
//! Represents anchored or cyclic time windows and answers roll-back /
//! roll-forward queries from an instant. All instants are `DateTime<Local>`:
//! comparisons happen in the local timezone of the host, matching the
//! process wall clock rather than UTC.

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveTime, TimeZone};

pub type Instant = chrono::DateTime<Local>;

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Instant,
    pub end: Instant,
}

impl Interval {
    pub fn new(start: Instant, end: Instant) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: Instant) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Intersection of two intervals, if they overlap.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Interval::new(start, end))
    }
}

/// The repeat unit of a cyclic period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A fixed-cycle period, optionally anchored to a clock time each cycle.
///
/// `starting` fixes the left edge of each cycle's window (defaults to
/// midnight / the natural start of the cycle unit when absent). `ending`
/// independently fixes the right edge within the same cycle (e.g. "daily
/// starting 08:00 ending 17:00" is a window open 08:00-17:00 every day,
/// not a full day shifted by eight hours). When only `starting` is given,
/// the window spans one full cycle unit from that anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePeriod {
    pub cycle: Cycle,
    pub starting: Option<NaiveTime>,
    pub ending: Option<NaiveTime>,
}

impl CyclePeriod {
    pub fn new(cycle: Cycle) -> Self {
        Self { cycle, starting: None, ending: None }
    }

    pub fn starting(mut self, time: NaiveTime) -> Self {
        self.starting = Some(time);
        self
    }

    pub fn ending(mut self, time: NaiveTime) -> Self {
        self.ending = Some(time);
        self
    }

    fn anchor_start(&self) -> NaiveTime {
        self.starting.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
    }

    fn natural_length(&self) -> ChronoDuration {
        match self.cycle {
            Cycle::Minutely => ChronoDuration::minutes(1),
            Cycle::Hourly => ChronoDuration::hours(1),
            Cycle::Daily => ChronoDuration::days(1),
            Cycle::Weekly => ChronoDuration::weeks(1),
            // Monthly/Yearly lengths are not fixed; the boundary walk in
            // `cycle_start_on_or_before` handles them by calendar arithmetic
            // instead of a constant duration, so this value is only used
            // as a coarse step for the minutely/hourly/daily/weekly cases.
            Cycle::Monthly => ChronoDuration::days(31),
            Cycle::Yearly => ChronoDuration::days(366),
        }
    }

    /// The start of the cycle window that contains or immediately precedes `instant`.
    fn cycle_start_on_or_before(&self, instant: Instant) -> Instant {
        let anchor = self.anchor_start();
        match self.cycle {
            Cycle::Minutely => {
                let truncated = instant.date_naive().and_hms_opt(instant.hour(), instant.minute(), 0).unwrap();
                Local.from_local_datetime(&truncated).single().unwrap()
            }
            Cycle::Hourly => {
                let truncated = instant.date_naive().and_hms_opt(instant.hour(), 0, 0).unwrap();
                Local.from_local_datetime(&truncated).single().unwrap()
            }
            Cycle::Daily => {
                let today_anchor = Local.from_local_datetime(&instant.date_naive().and_time(anchor)).single().unwrap();
                if today_anchor <= instant { today_anchor } else { today_anchor - ChronoDuration::days(1) }
            }
            Cycle::Weekly => {
                let monday = instant.date_naive() - ChronoDuration::days(instant.weekday().num_days_from_monday() as i64);
                let this_week_anchor = Local.from_local_datetime(&monday.and_time(anchor)).single().unwrap();
                if this_week_anchor <= instant { this_week_anchor } else { this_week_anchor - ChronoDuration::weeks(1) }
            }
            Cycle::Monthly => {
                let first_of_month = instant.date_naive().with_day(1).unwrap();
                let this_month_anchor = Local.from_local_datetime(&first_of_month.and_time(anchor)).single().unwrap();
                if this_month_anchor <= instant {
                    this_month_anchor
                } else {
                    let prev_month = prev_month_first(first_of_month);
                    Local.from_local_datetime(&prev_month.and_time(anchor)).single().unwrap()
                }
            }
            Cycle::Yearly => {
                let jan1 = chrono::NaiveDate::from_ymd_opt(instant.year(), 1, 1).unwrap();
                let this_year_anchor = Local.from_local_datetime(&jan1.and_time(anchor)).single().unwrap();
                if this_year_anchor <= instant {
                    this_year_anchor
                } else {
                    let prev_jan1 = chrono::NaiveDate::from_ymd_opt(instant.year() - 1, 1, 1).unwrap();
                    Local.from_local_datetime(&prev_jan1.and_time(anchor)).single().unwrap()
                }
            }
        }
    }

    fn next_cycle_start(&self, start: Instant) -> Instant {
        match self.cycle {
            Cycle::Minutely => start + ChronoDuration::minutes(1),
            Cycle::Hourly => start + ChronoDuration::hours(1),
            Cycle::Daily => start + ChronoDuration::days(1),
            Cycle::Weekly => start + ChronoDuration::weeks(1),
            Cycle::Monthly => {
                let next_month = next_month_first(start.date_naive());
                Local.from_local_datetime(&next_month.and_time(start.time())).single().unwrap()
            }
            Cycle::Yearly => {
                let next_jan1 = chrono::NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).unwrap();
                Local.from_local_datetime(&next_jan1.and_time(start.time())).single().unwrap()
            }
        }
    }

    fn window(&self, cycle_start: Instant) -> Interval {
        match self.ending {
            Some(end_time) => {
                let end = Local.from_local_datetime(&cycle_start.date_naive().and_time(end_time)).single().unwrap();
                let end = if end > cycle_start { end } else { end + self.natural_length() };
                Interval::new(cycle_start, end)
            }
            None => Interval::new(cycle_start, self.next_cycle_start(cycle_start)),
        }
    }

    pub fn rollback(&self, instant: Instant) -> Interval {
        let start = self.cycle_start_on_or_before(instant);
        let window = self.window(start);
        if window.contains(instant) || window.end <= instant {
            window
        } else {
            // `instant` falls after the starting anchor but before the
            // ending anchor of the *previous* cycle iteration was reached;
            // only possible when `starting`/`ending` narrow the window.
            window
        }
    }

    pub fn rollforward(&self, instant: Instant) -> Interval {
        let containing = self.rollback(instant);
        if containing.contains(instant) {
            containing
        } else {
            let next_start = self.next_cycle_start(containing.start);
            self.window(next_start)
        }
    }
}

fn prev_month_first(date: chrono::NaiveDate) -> chrono::NaiveDate {
    if date.month() == 1 {
        chrono::NaiveDate::from_ymd_opt(date.year() - 1, 12, 1).unwrap()
    } else {
        chrono::NaiveDate::from_ymd_opt(date.year(), date.month() - 1, 1).unwrap()
    }
}

fn next_month_first(date: chrono::NaiveDate) -> chrono::NaiveDate {
    if date.month() == 12 {
        chrono::NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).unwrap()
    } else {
        chrono::NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1).unwrap()
    }
}

/// A daily time-of-day span, e.g. "between 08:00 and 17:00", not tied to
/// any particular calendar day — the window recurs every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TimeSpan {
    pub fn new(from: NaiveTime, to: NaiveTime) -> Self {
        Self { from, to }
    }

    fn window_containing_or_before(&self, instant: Instant) -> Interval {
        let today_start = Local.from_local_datetime(&instant.date_naive().and_time(self.from)).single().unwrap();
        let span_len = if self.to > self.from {
            self.to - self.from
        } else {
            // Span crosses midnight, e.g. 22:00 to 06:00.
            (NaiveTime::from_hms_opt(23, 59, 59).unwrap() - self.from) + ChronoDuration::seconds(1) + (self.to - NaiveTime::from_hms_opt(0, 0, 0).unwrap())
        };
        let today_end = today_start + span_len;
        if today_start <= instant {
            Interval::new(today_start, today_end)
        } else {
            Interval::new(today_start - ChronoDuration::days(1), today_end - ChronoDuration::days(1))
        }
    }

    pub fn rollback(&self, instant: Instant) -> Interval {
        self.window_containing_or_before(instant)
    }

    pub fn rollforward(&self, instant: Instant) -> Interval {
        let window = self.window_containing_or_before(instant);
        if window.contains(instant) {
            window
        } else {
            Interval::new(window.start + ChronoDuration::days(1), window.end + ChronoDuration::days(1))
        }
    }
}

/// An explicit, one-off range between two instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Instant,
    pub end: Instant,
}

/// A time window: a fixed cycle, a daily span, an explicit range, or a
/// union/intersection of two sub-periods.
#[derive(Debug, Clone, PartialEq)]
pub enum TimePeriod {
    Cyclic(CyclePeriod),
    Span(TimeSpan),
    Range(DateRange),
    Union(Box<TimePeriod>, Box<TimePeriod>),
    Intersection(Box<TimePeriod>, Box<TimePeriod>),
}

impl Eq for CyclePeriod {}
impl Eq for TimeSpan {}
impl Eq for DateRange {}

impl TimePeriod {
    pub fn rollback(&self, instant: Instant) -> Interval {
        match self {
            TimePeriod::Cyclic(c) => c.rollback(instant),
            TimePeriod::Span(s) => s.rollback(instant),
            TimePeriod::Range(r) => Interval::new(r.start, r.end),
            TimePeriod::Union(a, b) => {
                let ia = a.rollback(instant);
                let ib = b.rollback(instant);
                if ia.end >= ib.end { ia } else { ib }
            }
            TimePeriod::Intersection(a, b) => {
                let ia = a.rollback(instant);
                let ib = b.rollback(instant);
                ia.intersect(&ib).unwrap_or(ia)
            }
        }
    }

    pub fn rollforward(&self, instant: Instant) -> Interval {
        match self {
            TimePeriod::Cyclic(c) => c.rollforward(instant),
            TimePeriod::Span(s) => s.rollforward(instant),
            TimePeriod::Range(r) => Interval::new(r.start, r.end),
            TimePeriod::Union(a, b) => {
                let ia = a.rollforward(instant);
                let ib = b.rollforward(instant);
                if ia.start <= ib.start { ia } else { ib }
            }
            TimePeriod::Intersection(a, b) => {
                let ia = a.rollforward(instant);
                let ib = b.rollforward(instant);
                ia.intersect(&ib).unwrap_or(ia)
            }
        }
    }

    pub fn contains(&self, instant: Instant) -> bool {
        self.rollback(instant).contains(instant)
    }

    pub fn daily() -> Self {
        TimePeriod::Cyclic(CyclePeriod::new(Cycle::Daily))
    }

    pub fn weekly() -> Self {
        TimePeriod::Cyclic(CyclePeriod::new(Cycle::Weekly))
    }

    pub fn monthly() -> Self {
        TimePeriod::Cyclic(CyclePeriod::new(Cycle::Monthly))
    }

    pub fn yearly() -> Self {
        TimePeriod::Cyclic(CyclePeriod::new(Cycle::Yearly))
    }

    pub fn hourly() -> Self {
        TimePeriod::Cyclic(CyclePeriod::new(Cycle::Hourly))
    }

    pub fn minutely() -> Self {
        TimePeriod::Cyclic(CyclePeriod::new(Cycle::Minutely))
    }

    pub fn starting(self, time: NaiveTime) -> Self {
        match self {
            TimePeriod::Cyclic(c) => TimePeriod::Cyclic(c.starting(time)),
            other => other,
        }
    }

    pub fn ending(self, time: NaiveTime) -> Self {
        match self {
            TimePeriod::Cyclic(c) => TimePeriod::Cyclic(c.ending(time)),
            other => other,
        }
    }

    pub fn union(self, other: TimePeriod) -> Self {
        TimePeriod::Union(Box::new(self), Box::new(other))
    }

    pub fn intersection(self, other: TimePeriod) -> Self {
        TimePeriod::Intersection(Box::new(self), Box::new(other))
    }
}

pub fn time_of_day(from: NaiveTime, to: NaiveTime) -> TimePeriod {
    TimePeriod::Span(TimeSpan::new(from, to))
}

pub fn explicit_range(start: Instant, end: Instant) -> TimePeriod {
    TimePeriod::Range(DateRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Instant {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn daily_rollback_gives_midnight_to_midnight() {
        let period = TimePeriod::daily();
        let iv = period.rollback(at(2026, 7, 28, 14, 0));
        assert_eq!(iv.start, at(2026, 7, 28, 0, 0));
        assert_eq!(iv.end, at(2026, 7, 29, 0, 0));
    }

    #[test]
    fn daily_starting_anchor_shifts_the_window() {
        let period = TimePeriod::daily().starting(NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        let before_anchor = period.rollback(at(2026, 7, 28, 10, 0));
        assert_eq!(before_anchor.start, at(2026, 7, 27, 19, 0));
        assert_eq!(before_anchor.end, at(2026, 7, 28, 19, 0));

        let after_anchor = period.rollback(at(2026, 7, 28, 20, 0));
        assert_eq!(after_anchor.start, at(2026, 7, 28, 19, 0));
    }

    #[test]
    fn daily_starting_ending_narrows_window_within_cycle() {
        let period = TimePeriod::daily()
            .starting(NaiveTime::from_hms_opt(8, 0, 0).unwrap())
            .ending(NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        let iv = period.rollback(at(2026, 7, 28, 12, 0));
        assert_eq!(iv.start, at(2026, 7, 28, 8, 0));
        assert_eq!(iv.end, at(2026, 7, 28, 17, 0));
        assert!(iv.contains(at(2026, 7, 28, 16, 59)));
        assert!(!iv.contains(at(2026, 7, 28, 17, 0)));
    }

    #[test]
    fn weekly_rollback_anchors_on_monday() {
        let period = TimePeriod::weekly();
        // 2026-07-28 is a Tuesday.
        let iv = period.rollback(at(2026, 7, 28, 12, 0));
        assert_eq!(iv.start.weekday(), chrono::Weekday::Mon);
        assert_eq!(iv.start, at(2026, 7, 27, 0, 0));
    }

    #[test]
    fn monthly_rollback_anchors_on_first_of_month() {
        let period = TimePeriod::monthly();
        let iv = period.rollback(at(2026, 7, 15, 12, 0));
        assert_eq!(iv.start, at(2026, 7, 1, 0, 0));
        assert_eq!(iv.end, at(2026, 8, 1, 0, 0));
    }

    #[test]
    fn time_of_day_span_recurs_daily() {
        let span = time_of_day(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        assert!(span.contains(at(2026, 7, 28, 9, 0)));
        assert!(!span.contains(at(2026, 7, 28, 19, 0)));
    }

    #[test]
    fn rollforward_finds_next_window_when_currently_outside() {
        let period = TimePeriod::daily().starting(NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        let iv = period.rollforward(at(2026, 7, 28, 10, 0));
        assert_eq!(iv.start, at(2026, 7, 28, 19, 0));
    }

    #[test]
    fn union_takes_the_later_ending_interval() {
        let a = TimePeriod::daily();
        let b = time_of_day(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let union = a.union(b);
        let iv = union.rollback(at(2026, 7, 28, 8, 30));
        assert_eq!(iv.end, at(2026, 7, 29, 0, 0));
    }

    #[test]
    fn interval_is_half_open() {
        let iv = Interval::new(at(2026, 1, 1, 0, 0), at(2026, 1, 2, 0, 0));
        assert!(iv.contains(at(2026, 1, 1, 0, 0)));
        assert!(!iv.contains(at(2026, 1, 2, 0, 0)));
    }
}
