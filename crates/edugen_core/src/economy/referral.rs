//! Referral codes.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// XP paid to a referrer when their code is used at registration.
pub const REFERRAL_BONUS_XP: u64 = 500;

pub const REFERRAL_CODE_LEN: usize = 6;

/// A fresh uppercase alphanumeric code. Uniqueness is enforced by the store.
pub fn generate_referral_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Trims and uppercases a user-supplied code; blank input means no code.
pub fn normalize_referral_code(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_uppercase_alphanumerics() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let code = generate_referral_code(&mut rng);
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn blank_code_is_absent() {
        assert_eq!(normalize_referral_code(None), None);
        assert_eq!(normalize_referral_code(Some("   ")), None);
        assert_eq!(normalize_referral_code(Some(" ab12cd ")), Some("AB12CD".to_string()));
    }
}
