//! Pure reward rules. Nothing in here touches storage or the clock directly;
//! the ledger feeds in the instants and the rows.

pub mod calendar;
pub mod quiz;
pub mod referral;
pub mod spin;
pub mod streak;

pub use calendar::Calendar;
pub use quiz::{grade, quiz_xp, Grade};
pub use referral::{generate_referral_code, normalize_referral_code, REFERRAL_BONUS_XP};
pub use spin::{can_spin, SpinWheel};
pub use streak::next_streak;
