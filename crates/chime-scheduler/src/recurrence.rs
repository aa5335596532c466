use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};

use crate::error::{Result, SchedulerError};
use crate::types::Recurrence;

/// Compute the next occurrence of `recurrence` strictly after `from`.
///
/// Pure: reads only `from` and the recurrence fields. The candidate is built
/// from `from`'s date with the variant's period-position fields and HH:MM:00
/// applied; a candidate at or before `from` is advanced by exactly one
/// calendar period. Monthly and Yearly re-derive the advanced occurrence from
/// the configured day, so a day-31 schedule still fires on the 31st whenever
/// the next month has one instead of drifting onto a clamped day.
///
/// Returns `InvalidRecurrence` when the fields are out of range. That is a
/// configuration error and must fail loudly: skipping it would leave the
/// schedule due forever without ever dispatching.
pub fn next_occurrence(recurrence: &Recurrence, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
    validate(recurrence)?;
    occurrence_after(recurrence, from).ok_or_else(|| {
        SchedulerError::InvalidRecurrence(format!(
            "{} schedule produced an unrepresentable date after {from}",
            recurrence.kind()
        ))
    })
}

/// Check that every field of `recurrence` is within its calendar range.
///
/// Yearly day bounds use the longest form a month can ever take (Feb 29,
/// Apr/Jun/Sep/Nov 30): Feb 29 is a real date some years and clamps in the
/// others, while Feb 30 is never constructable and is rejected here.
pub fn validate(recurrence: &Recurrence) -> Result<()> {
    let (hour, minute) = match *recurrence {
        Recurrence::Daily { hour, minute } => (hour, minute),
        Recurrence::Weekly {
            weekday,
            hour,
            minute,
        } => {
            if weekday > 6 {
                return Err(invalid(format!("weekday {weekday} out of range 0-6")));
            }
            (hour, minute)
        }
        Recurrence::Monthly { day, hour, minute } => {
            if day == 0 || day > 31 {
                return Err(invalid(format!("day {day} out of range 1-31")));
            }
            (hour, minute)
        }
        Recurrence::Yearly {
            month,
            day,
            hour,
            minute,
        } => {
            if month == 0 || month > 12 {
                return Err(invalid(format!("month {month} out of range 1-12")));
            }
            let max = max_day_of_month(month);
            if day == 0 || day > max {
                return Err(invalid(format!("day {day} out of range 1-{max} for month {month}")));
            }
            (hour, minute)
        }
    };
    if hour > 23 {
        return Err(invalid(format!("hour {hour} out of range 0-23")));
    }
    if minute > 59 {
        return Err(invalid(format!("minute {minute} out of range 0-59")));
    }
    Ok(())
}

fn invalid(detail: String) -> SchedulerError {
    SchedulerError::InvalidRecurrence(detail)
}

fn occurrence_after(recurrence: &Recurrence, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match *recurrence {
        Recurrence::Daily { hour, minute } => {
            // Today's candidate at HH:MM:00.
            let candidate = clamped_candidate(
                from.year(),
                from.month(),
                from.day(),
                hour.into(),
                minute.into(),
            )?;
            if candidate > from {
                Some(candidate)
            } else {
                // Already passed today, so tomorrow.
                Some(candidate + Duration::days(1))
            }
        }

        Recurrence::Weekly {
            weekday,
            hour,
            minute,
        } => {
            // 0 = Monday … 6 = Sunday, matching chrono's num_days_from_monday.
            let today = i64::from(from.weekday().num_days_from_monday());
            let days_ahead = (i64::from(weekday) - today).rem_euclid(7);
            let date = from.date_naive() + Duration::days(days_ahead);
            let candidate =
                clamped_candidate(date.year(), date.month(), date.day(), hour.into(), minute.into())?;
            if candidate > from {
                Some(candidate)
            } else {
                // Only possible when the target weekday is today and HH:MM
                // has already passed, so push a full week.
                Some(candidate + Duration::days(7))
            }
        }

        Recurrence::Monthly { day, hour, minute } => {
            let candidate = clamped_candidate(
                from.year(),
                from.month(),
                day.into(),
                hour.into(),
                minute.into(),
            )?;
            if candidate > from {
                Some(candidate)
            } else {
                let (year, month) = if from.month() == 12 {
                    (from.year() + 1, 1)
                } else {
                    (from.year(), from.month() + 1)
                };
                clamped_candidate(year, month, day.into(), hour.into(), minute.into())
            }
        }

        Recurrence::Yearly {
            month,
            day,
            hour,
            minute,
        } => {
            let candidate = clamped_candidate(
                from.year(),
                month.into(),
                day.into(),
                hour.into(),
                minute.into(),
            )?;
            if candidate > from {
                Some(candidate)
            } else {
                clamped_candidate(
                    from.year() + 1,
                    month.into(),
                    day.into(),
                    hour.into(),
                    minute.into(),
                )
            }
        }
    }
}

/// Build `year-month-day hour:minute:00` UTC, clamping `day` to the last day
/// of the month when it overshoots (Apr 31 → Apr 30, Feb 29 → Feb 28 in
/// non-leap years).
fn clamped_candidate(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Utc>> {
    let day = day.min(days_in_month(year, month)?);
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    // Last day of (year, month) = first of next month minus one day.
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|d| d.day())
}

/// Longest length `month` can ever have across years.
fn max_day_of_month(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn daily_before_time_fires_today() {
        let rec = Recurrence::Daily { hour: 9, minute: 0 };
        let next = next_occurrence(&rec, at(2024, 3, 1, 8, 30)).unwrap();
        assert_eq!(next, at(2024, 3, 1, 9, 0));
    }

    #[test]
    fn daily_after_time_fires_tomorrow() {
        let rec = Recurrence::Daily { hour: 9, minute: 0 };
        let next = next_occurrence(&rec, at(2024, 3, 1, 9, 5)).unwrap();
        assert_eq!(next, at(2024, 3, 2, 9, 0));
    }

    #[test]
    fn daily_at_exact_time_advances() {
        // A candidate equal to the reference time is already "passed":
        // the result must be strictly in the future.
        let rec = Recurrence::Daily { hour: 9, minute: 0 };
        let next = next_occurrence(&rec, at(2024, 3, 1, 9, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 2, 9, 0));
    }

    #[test]
    fn weekly_later_this_week() {
        // 2024-03-04 is a Monday; weekday 2 = Wednesday.
        let rec = Recurrence::Weekly {
            weekday: 2,
            hour: 14,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 3, 4, 10, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 6, 14, 0));
    }

    #[test]
    fn weekly_same_day_passed_advances_full_week() {
        // Monday 10:00, schedule fires Mondays at 09:00.
        let rec = Recurrence::Weekly {
            weekday: 0,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 3, 4, 10, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 11, 9, 0));
    }

    #[test]
    fn weekly_earlier_weekday_wraps_to_next_week() {
        // Wednesday 2024-03-06; weekday 0 = Monday → the following Monday.
        let rec = Recurrence::Weekly {
            weekday: 0,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 3, 6, 12, 0)).unwrap();
        assert_eq!(next, at(2024, 3, 11, 9, 0));
    }

    #[test]
    fn weekly_crosses_month_boundary() {
        // Monday 2024-04-29; weekday 5 = Saturday → 2024-05-04.
        let rec = Recurrence::Weekly {
            weekday: 5,
            hour: 8,
            minute: 15,
        };
        let next = next_occurrence(&rec, at(2024, 4, 29, 12, 0)).unwrap();
        assert_eq!(next, at(2024, 5, 4, 8, 15));
    }

    #[test]
    fn monthly_clamps_to_short_month() {
        let rec = Recurrence::Monthly {
            day: 31,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 4, 10, 0, 0)).unwrap();
        assert_eq!(next, at(2024, 4, 30, 9, 0));
    }

    #[test]
    fn monthly_passed_rederives_day_in_next_month() {
        // The clamped April occurrence has passed; May has a real 31st again.
        let rec = Recurrence::Monthly {
            day: 31,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 4, 30, 10, 0)).unwrap();
        assert_eq!(next, at(2024, 5, 31, 9, 0));
    }

    #[test]
    fn monthly_advances_across_year_end() {
        let rec = Recurrence::Monthly {
            day: 5,
            hour: 0,
            minute: 30,
        };
        let next = next_occurrence(&rec, at(2024, 12, 20, 0, 0)).unwrap();
        assert_eq!(next, at(2025, 1, 5, 0, 30));
    }

    #[test]
    fn yearly_feb29_in_leap_year() {
        let rec = Recurrence::Yearly {
            month: 2,
            day: 29,
            hour: 6,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 1, 10, 0, 0)).unwrap();
        assert_eq!(next, at(2024, 2, 29, 6, 0));
    }

    #[test]
    fn yearly_feb29_clamps_in_non_leap_year() {
        let rec = Recurrence::Yearly {
            month: 2,
            day: 29,
            hour: 6,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2025, 1, 10, 0, 0)).unwrap();
        assert_eq!(next, at(2025, 2, 28, 6, 0));
    }

    #[test]
    fn yearly_passed_advances_one_year() {
        let rec = Recurrence::Yearly {
            month: 3,
            day: 1,
            hour: 12,
            minute: 0,
        };
        let next = next_occurrence(&rec, at(2024, 6, 1, 0, 0)).unwrap();
        assert_eq!(next, at(2025, 3, 1, 12, 0));
    }

    #[test]
    fn every_kind_is_strictly_future_at_own_fire_instant() {
        // Reference time sits exactly on each schedule's occurrence; the next
        // one must land exactly one period later, never "now".
        let now = at(2024, 3, 4, 9, 0); // Monday
        let cases = [
            (
                Recurrence::Daily { hour: 9, minute: 0 },
                at(2024, 3, 5, 9, 0),
            ),
            (
                Recurrence::Weekly {
                    weekday: 0,
                    hour: 9,
                    minute: 0,
                },
                at(2024, 3, 11, 9, 0),
            ),
            (
                Recurrence::Monthly {
                    day: 4,
                    hour: 9,
                    minute: 0,
                },
                at(2024, 4, 4, 9, 0),
            ),
            (
                Recurrence::Yearly {
                    month: 3,
                    day: 4,
                    hour: 9,
                    minute: 0,
                },
                at(2025, 3, 4, 9, 0),
            ),
        ];
        for (rec, expected) in cases {
            let next = next_occurrence(&rec, now).unwrap();
            assert!(next > now, "{} occurrence not in the future", rec.kind());
            assert_eq!(next, expected, "{} advanced wrong", rec.kind());
        }
    }

    #[test]
    fn out_of_range_fields_rejected() {
        let bad = [
            Recurrence::Daily {
                hour: 24,
                minute: 0,
            },
            Recurrence::Daily {
                hour: 0,
                minute: 60,
            },
            Recurrence::Weekly {
                weekday: 7,
                hour: 0,
                minute: 0,
            },
            Recurrence::Monthly {
                day: 0,
                hour: 0,
                minute: 0,
            },
            Recurrence::Monthly {
                day: 32,
                hour: 0,
                minute: 0,
            },
            Recurrence::Yearly {
                month: 13,
                day: 1,
                hour: 0,
                minute: 0,
            },
            Recurrence::Yearly {
                month: 2,
                day: 30,
                hour: 0,
                minute: 0,
            },
        ];
        for rec in bad {
            let err = next_occurrence(&rec, at(2024, 1, 1, 0, 0));
            assert!(
                matches!(err, Err(SchedulerError::InvalidRecurrence(_))),
                "{rec:?} should be rejected"
            );
        }
    }

    #[test]
    fn yearly_feb29_is_accepted() {
        let rec = Recurrence::Yearly {
            month: 2,
            day: 29,
            hour: 0,
            minute: 0,
        };
        assert!(validate(&rec).is_ok());
    }
}
