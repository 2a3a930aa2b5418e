use chrono::NaiveDate;

/// Streak after a visit on `today`.
///
/// Consecutive days extend the streak, a repeated day keeps it, any gap
/// restarts it at 1. A visit dated before the last one changes nothing.
pub fn advance_streak(last_visit: Option<NaiveDate>, current: u32, today: NaiveDate) -> u32 {
    let Some(last) = last_visit else {
        return 1;
    };

    if today == last {
        current.max(1)
    } else if today < last {
        current
    } else if last.succ_opt() == Some(today) {
        current + 1
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_first_visit() {
        assert_eq!(advance_streak(None, 0, day(1)), 1);
    }

    #[test]
    fn test_same_day_unchanged() {
        assert_eq!(advance_streak(Some(day(3)), 4, day(3)), 4);
    }

    #[test]
    fn test_next_day_extends() {
        assert_eq!(advance_streak(Some(day(3)), 4, day(4)), 5);
    }

    #[test]
    fn test_gap_resets() {
        assert_eq!(advance_streak(Some(day(3)), 4, day(6)), 1);
    }

    #[test]
    fn test_month_boundary() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let feb1 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(advance_streak(Some(jan31), 2, feb1), 3);
    }

    #[test]
    fn test_out_of_order_visit_ignored() {
        assert_eq!(advance_streak(Some(day(5)), 2, day(4)), 2);
    }
}
