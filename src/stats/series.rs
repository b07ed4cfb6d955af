//! Daily distance buckets for the profile chart.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Days, Duration, Locale, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Ride;

/// Trailing chart window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "7D")]
    Week,
    #[serde(rename = "1M")]
    Month,
    #[serde(rename = "3M")]
    Quarter,
    #[serde(rename = "6M")]
    HalfYear,
    #[serde(rename = "1Y")]
    Year,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Week,
        Period::Month,
        Period::Quarter,
        Period::HalfYear,
        Period::Year,
    ];

    pub fn days(self) -> u32 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::HalfYear => 180,
            Period::Year => 365,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Period::Week => "7D",
            Period::Month => "1M",
            Period::Quarter => "3M",
            Period::HalfYear => "6M",
            Period::Year => "1Y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|period| period.code().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown period '{value}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub bucket_index: usize,
    /// Kilometres ridden that day.
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub period: Period,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Whether any day in the window has distance on it.
    pub fn has_data(&self) -> bool {
        self.points.iter().any(|point| point.value > 0.0)
    }

    pub fn total_km(&self) -> f64 {
        self.points.iter().map(|point| point.value).sum()
    }
}

const GAP_SEARCH_STEP_MINUTES: i64 = 15;

/// Start of `day` in `tz`, as a UTC instant. When a DST jump skips local
/// midnight the day starts at the first wall time that exists, searched in
/// 15 minute steps; a day with no valid wall time at all reads midnight as
/// UTC.
fn day_start<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    let steps = 24 * 60 / GAP_SEARCH_STEP_MINUTES;
    (0..steps)
        .map(|step| midnight + Duration::minutes(step * GAP_SEARCH_STEP_MINUTES))
        .take_while(|wall| wall.date() == day)
        .find_map(|wall| tz.from_local_datetime(&wall).earliest())
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

fn bucket_label(day: NaiveDate, period: Period, locale: Locale) -> String {
    match period {
        Period::Week => day.format_localized("%a", locale).to_string(),
        _ => format!("{}/{}", day.day(), day.month()),
    }
}

/// Builds `period.days()` daily buckets ending at `reference_day`, oldest
/// first. Each bucket runs from the day's local start to the next day's, so
/// 23 and 25 hour DST days neither overlap nor leave gaps, and sums the
/// distance of every ride dated inside it.
pub fn compute_series<Tz: TimeZone>(
    rides: &[Ride],
    period: Period,
    reference_day: NaiveDate,
    tz: &Tz,
    locale: Locale,
) -> ChartSeries {
    let days = u64::from(period.days());

    let points = (0..days)
        .rev()
        .map(|offset| reference_day - Days::new(offset))
        .enumerate()
        .map(|(bucket_index, day)| {
            let start = day_start(day, tz);
            let end = day_start(day + Days::new(1), tz);

            let value = rides
                .iter()
                .filter(|ride| ride.date >= start && ride.date < end)
                .fold(0.0, |sum, ride| sum + ride.distance_km);

            ChartPoint {
                bucket_index,
                value,
                label: bucket_label(day, period, locale),
            }
        })
        .collect();

    ChartSeries { period, points }
}

/// Today's calendar date in `tz`.
pub fn today_in<Tz: TimeZone>(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewRide;
    use chrono::{FixedOffset, MappedLocalTime, NaiveDateTime};

    /// UTC in winter, UTC+1 from 2025-03-30T00:00Z. Local 00:00..01:00 on
    /// the 30th never happens.
    #[derive(Debug, Clone, Copy)]
    struct MidnightSpringForward;

    impl MidnightSpringForward {
        fn switch() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 3, 30)
                .unwrap()
                .and_time(NaiveTime::MIN)
        }

        fn winter() -> FixedOffset {
            FixedOffset::east_opt(0).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }
    }

    impl TimeZone for MidnightSpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightSpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> MappedLocalTime<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(
            &self,
            local: &NaiveDateTime,
        ) -> MappedLocalTime<FixedOffset> {
            let switch = Self::switch();
            if *local < switch {
                MappedLocalTime::Single(Self::winter())
            } else if *local < switch + Duration::hours(1) {
                MappedLocalTime::None
            } else {
                MappedLocalTime::Single(Self::summer())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    fn ride_on(date: DateTime<Utc>, distance_km: f64) -> Ride {
        NewRide::new(date, 600, distance_km).with_id(date.to_rfc3339())
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn period_lengths_and_codes() {
        let days: Vec<_> = Period::ALL.iter().map(|p| p.days()).collect();
        assert_eq!(days, [7, 30, 90, 180, 365]);
        for period in Period::ALL {
            assert_eq!(period.code().parse::<Period>().unwrap(), period);
        }
        assert_eq!(" 1m ".parse::<Period>().unwrap(), Period::Month);
        assert!("2W".parse::<Period>().is_err());
    }

    #[test]
    fn week_has_seven_oldest_first_buckets() {
        // 2025-06-15 is a Sunday.
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let series = compute_series(&[], Period::Week, today, &Utc, Locale::en_US);

        assert_eq!(series.points.len(), 7);
        let labels: Vec<_> = series.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        let indices: Vec<_> = series.points.iter().map(|p| p.bucket_index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4, 5, 6]);
        assert!(!series.has_data());
    }

    #[test]
    fn longer_periods_use_day_month_labels() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let series = compute_series(&[], Period::Month, today, &Utc, Locale::en_US);

        assert_eq!(series.points.len(), 30);
        assert_eq!(series.points[29].label, "2/3");
        assert_eq!(series.points[28].label, "1/3");
        assert_eq!(series.points[27].label, "28/2");
    }

    #[test]
    fn distances_summed_per_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let rides = [
            ride_on(utc(2025, 6, 15, 7, 0), 5.0),
            ride_on(utc(2025, 6, 15, 18, 30), 2.5),
            ride_on(utc(2025, 6, 13, 12, 0), 10.0),
            // Outside the window.
            ride_on(utc(2025, 6, 8, 12, 0), 99.0),
            ride_on(utc(2025, 6, 16, 0, 0), 99.0),
        ];

        let series = compute_series(&rides, Period::Week, today, &Utc, Locale::en_US);
        let values: Vec<_> = series.points.iter().map(|p| p.value).collect();
        assert_eq!(values, [0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 7.5]);
        assert!(series.has_data());
        assert_eq!(series.total_km(), 17.5);
    }

    #[test]
    fn boundary_instant_belongs_to_later_bucket() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let rides = [ride_on(utc(2025, 6, 14, 0, 0), 3.0)];

        let series = compute_series(&rides, Period::Week, today, &Utc, Locale::en_US);
        assert_eq!(series.points[5].value, 3.0);
        assert_eq!(series.points[4].value, 0.0);
    }

    #[test]
    fn buckets_follow_the_given_timezone() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        // 22:30 UTC on the 14th is 01:30 on the 15th at UTC+3.
        let rides = [ride_on(utc(2025, 6, 14, 22, 30), 4.0)];

        let local = compute_series(&rides, Period::Week, today, &plus_three, Locale::en_US);
        assert_eq!(local.points[6].value, 4.0);

        let in_utc = compute_series(&rides, Period::Week, today, &Utc, Locale::en_US);
        assert_eq!(in_utc.points[5].value, 4.0);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let rides: Vec<_> = (0..50)
            .map(|i| {
                let date = utc(2025, 6, 1 + (i % 15), i % 24, 0);
                ride_on(date, 0.1 * f64::from(i))
            })
            .collect();

        let a = compute_series(&rides, Period::Year, today, &Utc, Locale::en_US);
        let b = compute_series(&rides, Period::Year, today, &Utc, Locale::en_US);
        assert_eq!(a.points.len(), 365);
        for (x, y) in a.points.iter().zip(&b.points) {
            assert_eq!(x.value.to_bits(), y.value.to_bits());
            assert_eq!(x.label, y.label);
        }
    }

    #[test]
    fn week_labels_follow_locale() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let series = compute_series(&[], Period::Week, today, &Utc, Locale::ru_RU);

        let labels: Vec<_> = series.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"]);

        // Only the weekly view uses weekday names.
        let month = compute_series(&[], Period::Month, today, &Utc, Locale::ru_RU);
        assert_eq!(month.points[29].label, "15/6");
    }

    #[test]
    fn skipped_midnight_starts_day_at_first_valid_time() {
        let tz = MidnightSpringForward;
        let day = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        assert_eq!(day_start(day, &tz), utc(2025, 3, 30, 0, 0));

        let next = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(day_start(next, &tz), utc(2025, 3, 30, 23, 0));
    }

    #[test]
    fn short_dst_day_does_not_double_count() {
        let tz = MidnightSpringForward;
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let rides = [
            // 23:30 on the 29th, winter time.
            ride_on(utc(2025, 3, 29, 23, 30), 1.0),
            // 01:10 on the 30th, just after the jump.
            ride_on(utc(2025, 3, 30, 0, 10), 2.0),
            // 00:30 on the 31st in summer time, still the 30th in UTC.
            ride_on(utc(2025, 3, 30, 23, 30), 4.0),
        ];

        let series = compute_series(&rides, Period::Week, today, &tz, Locale::en_US);
        let values: Vec<_> = series.points.iter().map(|p| p.value).collect();
        assert_eq!(values, [0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 4.0]);
        assert_eq!(series.total_km(), 7.0);
    }
}
