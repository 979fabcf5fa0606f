//! Login streak continuity.

use chrono::NaiveDate;

/// Streak value after a login on `today`.
///
/// A login the day after the previous one continues the streak, a second
/// login on the same day leaves it alone, anything else starts over at 1.
pub fn next_streak(current: u32, last_login: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_login {
        Some(day) if Some(day) == today.pred_opt() => current.saturating_add(1),
        Some(day) if day == today => current,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn consecutive_day_increments() {
        assert_eq!(next_streak(4, Some(day(9)), day(10)), 5);
    }

    #[test]
    fn same_day_is_unchanged() {
        assert_eq!(next_streak(4, Some(day(10)), day(10)), 4);
    }

    #[test]
    fn gap_resets_to_one() {
        assert_eq!(next_streak(4, Some(day(8)), day(10)), 1);
        assert_eq!(next_streak(9, Some(day(1)), day(10)), 1);
    }

    #[test]
    fn first_login_starts_at_one() {
        assert_eq!(next_streak(0, None, day(10)), 1);
    }

    #[test]
    fn continues_across_month_boundary() {
        let last = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        assert_eq!(next_streak(2, Some(last), day(1)), 3);
    }
}
