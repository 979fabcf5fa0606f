//! Calendar-day extraction for the day-gated rules (streaks, daily spin).

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Maps instants to calendar days in one fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_follows_the_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 22, 30, 0).unwrap();
        let utc = Calendar::utc();
        let ist = Calendar::new(FixedOffset::east_opt(5 * 3600 + 1800).unwrap());

        assert_eq!(utc.day_of(at), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(ist.day_of(at), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }
}
