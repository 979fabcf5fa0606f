//! crates/edugen_core/src/ledger.rs
//!
//! The reward ledger: every operation that moves XP, streaks or study hours.
//!
//! Each operation hands a mutation to one store unit-of-work, so the
//! precondition check, the XP credit, the level recomputation and the write
//! all happen under the same lock, or not at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Account, Goal, NewAccount, QuizResult, QuizSubmission, Role, StudySession};
use crate::economy::{
    can_spin, generate_referral_code, grade, next_streak, normalize_referral_code, quiz_xp,
    Calendar, SpinWheel, REFERRAL_BONUS_XP,
};
use crate::ports::{Clock, DatabaseService, PortError, PortResult};

/// XP for ending a study session when the client does not name an amount.
pub const DEFAULT_SESSION_XP: u64 = 20;

const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// A validated registration request. The password is already hashed.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpinOutcome {
    pub reward: u64,
    pub account: Account,
}

#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub result: QuizResult,
    pub account: Account,
}

pub struct RewardLedger {
    db: Arc<dyn DatabaseService>,
    clock: Arc<dyn Clock>,
    calendar: Calendar,
    wheel: SpinWheel,
}

impl RewardLedger {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        clock: Arc<dyn Clock>,
        calendar: Calendar,
        wheel: SpinWheel,
    ) -> Self {
        Self {
            db,
            clock,
            calendar,
            wheel,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Creates an account, paying the referrer when the code resolves.
    pub async fn register(&self, registration: Registration) -> PortResult<Account> {
        let name = registration.name.trim().to_string();
        if name.is_empty() {
            return Err(PortError::Invalid("name is required".to_string()));
        }
        let email = normalize_email(&registration.email)?;
        let referral_code = normalize_referral_code(registration.referral_code.as_deref());

        let reward_referrer = |referrer: &mut Account| -> PortResult<()> {
            referrer.experience.credit(REFERRAL_BONUS_XP);
            referrer.referral_count = referrer.referral_count.saturating_add(1);
            Ok(())
        };

        for attempt in 1..=REFERRAL_CODE_ATTEMPTS {
            let new = NewAccount {
                name: name.clone(),
                email: email.clone(),
                password_hash: registration.password_hash.clone(),
                role: registration.role,
                referral_code: generate_referral_code(&mut rand::thread_rng()),
            };

            match self
                .db
                .insert_account(new, referral_code.as_deref(), &reward_referrer, self.now())
                .await
            {
                Ok(account) => {
                    match account.referred_by {
                        Some(referrer) => info!(
                            account_id = %account.id,
                            referrer_id = %referrer,
                            "Account registered with referral"
                        ),
                        None => info!(account_id = %account.id, "Account registered"),
                    }
                    return Ok(account);
                }
                Err(PortError::ReferralCodeTaken) => {
                    debug!(attempt, "Generated referral code collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(PortError::Unexpected(
            "could not allocate a unique referral code".to_string(),
        ))
    }

    /// Advances the login streak. Call once per successful authentication.
    pub async fn record_login(&self, account_id: Uuid) -> PortResult<Account> {
        let now = self.now();
        let today = self.calendar.day_of(now);
        let calendar = self.calendar;

        let account = self
            .db
            .update_account(account_id, &|account: &mut Account| {
                let last_day = account.last_login_at.map(|at| calendar.day_of(at));
                account.streak = next_streak(account.streak, last_day, today);
                account.last_login_at = Some(now);
                Ok(())
            })
            .await?;

        debug!(account_id = %account_id, streak = account.streak, "Login streak updated");
        Ok(account)
    }

    /// Grades a submission, stores the result and pays for the correct answers.
    pub async fn submit_quiz(
        &self,
        account_id: Uuid,
        submission: QuizSubmission,
    ) -> PortResult<QuizOutcome> {
        if submission.answers.is_empty() {
            return Err(PortError::Invalid("answers must not be empty".to_string()));
        }

        let ids: Vec<Uuid> = submission.answers.iter().map(|a| a.question_id).collect();
        let questions = self.db.get_questions_by_ids(&ids).await?;
        let grade = grade(&submission.answers, &questions);
        let xp_earned = quiz_xp(grade.correct, submission.difficulty);

        let result = QuizResult {
            id: Uuid::new_v4(),
            account_id,
            subject: submission.subject,
            difficulty: submission.difficulty,
            total_questions: grade.total,
            correct_answers: grade.correct,
            accuracy: grade.accuracy,
            time_taken_secs: submission.time_taken_secs,
            xp_earned,
            answers: grade.answers,
            created_at: self.now(),
        };

        let account = self
            .db
            .record_quiz_result(result.clone(), &|account: &mut Account| {
                account.experience.credit(xp_earned);
                Ok(())
            })
            .await?;

        info!(
            account_id = %account_id,
            correct = result.correct_answers,
            total = result.total_questions,
            xp_earned,
            "Quiz submitted"
        );
        Ok(QuizOutcome { result, account })
    }

    /// Marks a goal completed and pays its reward. Completing twice is an error.
    pub async fn complete_goal(&self, account_id: Uuid, goal_id: Uuid) -> PortResult<(Goal, Account)> {
        let now = self.now();

        let (goal, account) = self
            .db
            .complete_goal(account_id, goal_id, &|goal: &mut Goal, account: &mut Account| {
                if goal.completed {
                    return Err(PortError::AlreadyCompleted(format!("goal {}", goal.id)));
                }
                goal.completed = true;
                goal.completed_at = Some(now);
                account.experience.credit(goal.xp_reward);
                Ok(())
            })
            .await?;

        info!(account_id = %account_id, goal_id = %goal_id, xp = goal.xp_reward, "Goal completed");
        Ok((goal, account))
    }

    /// Ends a running study session, crediting its hours and XP.
    pub async fn end_session(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        xp_earned: Option<u64>,
    ) -> PortResult<(StudySession, Account)> {
        let now = self.now();
        let xp_earned = xp_earned.unwrap_or(DEFAULT_SESSION_XP);

        let (session, account) = self
            .db
            .end_session(
                account_id,
                session_id,
                &|session: &mut StudySession, account: &mut Account| {
                    if session.completed {
                        return Err(PortError::AlreadyCompleted(format!("session {}", session.id)));
                    }
                    session.completed = true;
                    session.ended_at = Some(now);
                    session.xp_earned = xp_earned;
                    account.total_study_hours += f64::from(session.duration_minutes) / 60.0;
                    account.experience.credit(xp_earned);
                    Ok(())
                },
            )
            .await?;

        info!(account_id = %account_id, session_id = %session_id, xp_earned, "Study session ended");
        Ok((session, account))
    }

    /// Claims the once-per-calendar-day spin reward.
    pub async fn claim_spin(&self, account_id: Uuid) -> PortResult<SpinOutcome> {
        let now = self.now();
        let today = self.calendar.day_of(now);
        let calendar = self.calendar;
        let reward = self.wheel.draw(&mut rand::thread_rng());

        let account = self
            .db
            .update_account(account_id, &|account: &mut Account| {
                let last_day = account.last_spin_at.map(|at| calendar.day_of(at));
                if !can_spin(last_day, today) {
                    return Err(PortError::AlreadyClaimedToday);
                }
                account.experience.credit(reward);
                account.last_spin_at = Some(now);
                Ok(())
            })
            .await
            .inspect_err(|e| {
                if matches!(e, PortError::AlreadyClaimedToday) {
                    warn!(account_id = %account_id, "Spin already claimed today");
                }
            })?;

        info!(account_id = %account_id, reward, "Daily spin claimed");
        Ok(SpinOutcome { reward, account })
    }

    /// Sets an account's XP to an absolute value. Administrative only.
    pub async fn set_xp(&self, account_id: Uuid, xp: u64) -> PortResult<Account> {
        let account = self
            .db
            .update_account(account_id, &|account: &mut Account| {
                account.experience.reset(xp);
                Ok(())
            })
            .await?;
        warn!(account_id = %account_id, xp, "XP set by administrator");
        Ok(account)
    }

    /// Top students by XP.
    pub async fn leaderboard(&self, limit: usize) -> PortResult<Vec<Account>> {
        self.db.leaderboard(limit).await
    }
}

/// Trims and lowercases an email, rejecting anything without `local@domain.tld` shape.
pub fn normalize_email(email: &str) -> PortResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(PortError::Invalid(format!("'{}' is not a valid email", email)));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "ada", "@example.com", "ada@example", "ada@.com", "a b@example.com", "a@b@c.com"] {
            assert!(normalize_email(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
