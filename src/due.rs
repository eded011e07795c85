//! Due-date classification for display. Computed per request, never stored.

use chrono::{Days, NaiveDate};
use serde::Serialize;

pub const DEFAULT_SOON_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    Overdue,
    Today,
    /// Within the soon window after today.
    Soon,
    Later,
    None,
}

impl DueStatus {
    pub fn classify(due: Option<NaiveDate>, today: NaiveDate, soon_window_days: u64) -> Self {
        let Some(due) = due else {
            return DueStatus::None;
        };
        if due < today {
            return DueStatus::Overdue;
        }
        if due == today {
            return DueStatus::Today;
        }
        match today.checked_add_days(Days::new(soon_window_days)) {
            Some(horizon) if due > horizon => DueStatus::Later,
            _ => DueStatus::Soon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn classify(offset: i64) -> DueStatus {
        let due = today() + chrono::Duration::days(offset);
        DueStatus::classify(Some(due), today(), DEFAULT_SOON_WINDOW_DAYS)
    }

    #[test]
    fn no_date_is_none() {
        assert_eq!(DueStatus::classify(None, today(), 7), DueStatus::None);
    }

    #[test]
    fn past_and_present() {
        assert_eq!(classify(-1), DueStatus::Overdue);
        assert_eq!(classify(-30), DueStatus::Overdue);
        assert_eq!(classify(0), DueStatus::Today);
    }

    #[test]
    fn soon_window_is_inclusive() {
        assert_eq!(classify(1), DueStatus::Soon);
        assert_eq!(classify(3), DueStatus::Soon);
        assert_eq!(classify(7), DueStatus::Soon);
        assert_eq!(classify(8), DueStatus::Later);
        assert_eq!(classify(10), DueStatus::Later);
    }

    #[test]
    fn window_is_configurable() {
        let due = today() + chrono::Duration::days(3);
        assert_eq!(DueStatus::classify(Some(due), today(), 2), DueStatus::Later);
    }
}
