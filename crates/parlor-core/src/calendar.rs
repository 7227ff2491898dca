use chrono::{Datelike, Days, NaiveDate};

/// Grid shape requested for calendar rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarMode {
    Week,
    Month,
}

impl std::str::FromStr for CalendarMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(CalendarMode::Week),
            "month" => Ok(CalendarMode::Month),
            other => Err(anyhow::anyhow!(
                "unknown calendar mode: {other} (expected week or month)"
            )),
        }
    }
}

/// The seven dates of `date`'s Monday-first week, starting at Monday.
pub fn week_of(date: NaiveDate) -> Vec<NaiveDate> {
    let back = u64::from(date.weekday().num_days_from_monday());
    let monday = date.checked_sub_days(Days::new(back)).unwrap_or(date);

    (0..7)
        .filter_map(|offset| monday.checked_add_days(Days::new(offset)))
        .collect()
}

/// Month view as a flat row-major grid: leading blanks up to the first
/// day's weekday column, every date of the month in order, trailing blanks
/// to a multiple of 7. Chunking by 7 yields complete Monday-first weeks.
pub fn month_grid(date: NaiveDate) -> Vec<Option<NaiveDate>> {
    let first = date.with_day(1).unwrap_or(date);
    let lead = first.weekday().num_days_from_monday() as usize;

    let mut cells: Vec<Option<NaiveDate>> = vec![None; lead];

    let mut day = first;
    while day.month() == first.month() {
        cells.push(Some(day));
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }

    while cells.len() % 7 != 0 {
        cells.push(None);
    }

    cells
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};

    use super::{month_grid, week_of};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-06-12 is a Wednesday.
        let week = week_of(day(2024, 6, 12));
        assert_eq!(week.len(), 7);
        assert_eq!(week[0], day(2024, 6, 10));
        assert_eq!(week[6], day(2024, 6, 16));
        for pair in week.windows(2) {
            assert_eq!(pair[1], pair[0].succ_opt().expect("next day"));
        }
    }

    #[test]
    fn sunday_belongs_to_the_preceding_week() {
        // 2024-06-16 is a Sunday; its week began six days earlier.
        let week = week_of(day(2024, 6, 16));
        assert_eq!(week[0], day(2024, 6, 10));
        assert_eq!(week[6], day(2024, 6, 16));
    }

    #[test]
    fn month_grid_is_whole_weeks() {
        for (y, m) in [(2024, 2), (2024, 6), (2023, 12), (2025, 3), (2026, 8)] {
            let grid = month_grid(day(y, m, 15));
            assert_eq!(grid.len() % 7, 0, "{y}-{m}");

            let first = grid
                .iter()
                .flatten()
                .next()
                .expect("month has at least one date");
            assert_eq!(first.day(), 1, "{y}-{m}");
        }
    }

    #[test]
    fn dates_land_in_their_weekday_columns() {
        let grid = month_grid(day(2024, 6, 1));
        for (idx, cell) in grid.iter().enumerate() {
            if let Some(date) = cell {
                assert_eq!(
                    date.weekday().num_days_from_monday() as usize,
                    idx % 7,
                    "date {date}"
                );
            }
        }
        // June 2024 starts on a Saturday: five leading blanks.
        assert!(grid[..5].iter().all(|c| c.is_none()));
        assert_eq!(grid[5], Some(day(2024, 6, 1)));
    }

    #[test]
    fn february_non_leap_starting_monday_has_no_padding() {
        // February 2021 started on a Monday and had exactly 28 days.
        let grid = month_grid(day(2021, 2, 10));
        assert_eq!(grid.len(), 28);
        assert!(grid.iter().all(|c| c.is_some()));
        assert_eq!(grid.first().copied().flatten(), Some(day(2021, 2, 1)));
        assert_eq!(grid.last().copied().flatten(), Some(day(2021, 2, 28)));
    }

    #[test]
    fn week_mode_parses() {
        use super::CalendarMode;
        assert!(matches!(
            "week".parse::<CalendarMode>().expect("week"),
            CalendarMode::Week
        ));
        assert!(matches!(
            "Month".parse::<CalendarMode>().expect("month"),
            CalendarMode::Month
        ));
        assert!("fortnight".parse::<CalendarMode>().is_err());
    }

    #[test]
    fn weekday_sanity() {
        assert_eq!(day(2024, 6, 1).weekday(), Weekday::Sat);
    }
}
