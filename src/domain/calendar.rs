//! Trading-day arithmetic over the price panel's date index.
//!
//! Offsets count rows of the panel, never calendar days, so a window of
//! `n` days always spans `n` trading sessions regardless of weekends and
//! holidays.

use crate::domain::error::CalendarError;
use crate::domain::price_panel::PricePanel;
use chrono::NaiveDate;

impl PricePanel {
    /// Zero-based row of `date`.
    pub fn locate(&self, date: NaiveDate) -> Result<usize, CalendarError> {
        self.offset_of(date)
            .ok_or(CalendarError::NotATradingDay { date })
    }

    /// Trading date `n` sessions after `date` (`n` may be negative).
    pub fn offset_date(&self, date: NaiveDate, n: isize) -> Result<NaiveDate, CalendarError> {
        let base = self.locate(date)?;
        let target = self.shift(date, base, n)?;
        Ok(self.dates()[target])
    }

    /// Row `n` sessions away from row `base`.
    pub fn shift(&self, date: NaiveDate, base: usize, n: isize) -> Result<usize, CalendarError> {
        let target = base as isize + n;
        if target < 0 || target as usize >= self.len() {
            return Err(CalendarError::OutOfRange {
                date,
                offset: target,
                len: self.len(),
            });
        }
        Ok(target as usize)
    }

    /// Lookup that reports a miss as `None`.
    pub fn try_locate(&self, date: NaiveDate) -> Option<usize> {
        self.locate(date).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Fri 2023-12-29, then the New Year holiday and a weekend
    fn holiday_panel() -> PricePanel {
        let dates = vec![
            date(2023, 12, 27),
            date(2023, 12, 28),
            date(2023, 12, 29),
            date(2024, 1, 2),
            date(2024, 1, 3),
        ];
        let rows = dates.iter().map(|_| vec![10.0]).collect();
        PricePanel::new(dates, vec!["A".into()], rows).unwrap()
    }

    #[test]
    fn locate_finds_row() {
        let panel = holiday_panel();
        assert_eq!(panel.locate(date(2023, 12, 27)), Ok(0));
        assert_eq!(panel.locate(date(2024, 1, 3)), Ok(4));
    }

    #[test]
    fn locate_rejects_holiday() {
        let panel = holiday_panel();
        assert_eq!(
            panel.locate(date(2024, 1, 1)),
            Err(CalendarError::NotATradingDay {
                date: date(2024, 1, 1)
            })
        );
    }

    #[test]
    fn locate_far_future_is_recoverable() {
        let panel = holiday_panel();
        assert!(panel.try_locate(date(2099, 1, 1)).is_none());
        assert!(matches!(
            panel.locate(date(2099, 1, 1)),
            Err(CalendarError::NotATradingDay { .. })
        ));
    }

    #[test]
    fn offset_date_skips_non_trading_days() {
        let panel = holiday_panel();
        assert_eq!(panel.offset_date(date(2023, 12, 29), 1), Ok(date(2024, 1, 2)));
        assert_eq!(panel.offset_date(date(2024, 1, 2), -1), Ok(date(2023, 12, 29)));
        assert_eq!(panel.offset_date(date(2023, 12, 27), 4), Ok(date(2024, 1, 3)));
    }

    #[test]
    fn offset_date_zero_round_trips() {
        let panel = holiday_panel();
        for &d in panel.dates() {
            assert_eq!(panel.offset_date(d, 0), Ok(d));
        }
    }

    #[test]
    fn offset_date_out_of_range() {
        let panel = holiday_panel();
        assert_eq!(
            panel.offset_date(date(2024, 1, 2), 2),
            Err(CalendarError::OutOfRange {
                date: date(2024, 1, 2),
                offset: 5,
                len: 5
            })
        );
        assert!(matches!(
            panel.offset_date(date(2023, 12, 28), -2),
            Err(CalendarError::OutOfRange { offset: -1, .. })
        ));
    }

    #[test]
    fn offset_date_from_missing_date() {
        let panel = holiday_panel();
        assert!(matches!(
            panel.offset_date(date(2023, 12, 30), 1),
            Err(CalendarError::NotATradingDay { .. })
        ));
    }
}
