//! crates/edugen_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

//=========================================================================================
// Levels and Experience
//=========================================================================================

/// One of the four ordered learner levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Level {
    pub const INTERMEDIATE_XP: u64 = 500;
    pub const ADVANCED_XP: u64 = 2000;
    pub const EXPERT_XP: u64 = 5000;

    /// Maps a total XP amount to its level. Thresholds are closed-open.
    pub fn classify(xp: u64) -> Self {
        if xp >= Self::EXPERT_XP {
            Level::Expert
        } else if xp >= Self::ADVANCED_XP {
            Level::Advanced
        } else if xp >= Self::INTERMEDIATE_XP {
            Level::Intermediate
        } else {
            Level::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Expert => "Expert",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An XP total paired with the level derived from it.
///
/// The fields are private: every change goes through `credit` or `reset`,
/// both of which reclassify, so the level can never go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Experience {
    xp: u64,
    level: Level,
}

impl Experience {
    pub fn new(xp: u64) -> Self {
        Self {
            xp,
            level: Level::classify(xp),
        }
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Adds `amount` XP and recomputes the level.
    pub fn credit(&mut self, amount: u64) {
        self.xp = self.xp.saturating_add(amount);
        self.level = Level::classify(self.xp);
    }

    /// Replaces the XP total. Administrative use only.
    pub fn reset(&mut self, xp: u64) {
        *self = Self::new(xp);
    }
}

impl Default for Experience {
    fn default() -> Self {
        Self::new(0)
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(PortError::Invalid(format!("unknown role '{}'", other))),
        }
    }
}

/// A learner's account: identity, economy fields and referral linkage.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub experience: Experience,
    pub streak: u32,
    pub total_study_hours: f64,
    pub avatar: String,
    pub theme: String,
    pub language: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_spin_at: Option<DateTime<Utc>>,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub referral_count: u32,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_AVATAR: &str = "🎓";
pub const THEMES: [&str; 2] = ["dark", "light"];
pub const LANGUAGES: [&str; 2] = ["en", "hi"];

impl Account {
    /// Builds a fresh account with zeroed economy fields.
    pub fn new(new: NewAccount, referred_by: Option<Uuid>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            role: new.role,
            experience: Experience::default(),
            streak: 0,
            total_study_hours: 0.0,
            avatar: DEFAULT_AVATAR.to_string(),
            theme: THEMES[0].to_string(),
            language: LANGUAGES[0].to_string(),
            last_login_at: None,
            last_spin_at: None,
            referral_code: new.referral_code,
            referred_by,
            referral_count: 0,
            created_at,
        }
    }

    pub fn xp(&self) -> u64 {
        self.experience.xp()
    }

    pub fn level(&self) -> Level {
        self.experience.level()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Everything needed to insert an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub referral_code: String,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    pub password_hash: String,
}

/// Editable profile fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub theme: Option<String>,
    pub language: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), PortError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(PortError::Invalid("name must not be empty".to_string()));
            }
        }
        if let Some(theme) = &self.theme {
            if !THEMES.contains(&theme.as_str()) {
                return Err(PortError::Invalid(format!("unknown theme '{}'", theme)));
            }
        }
        if let Some(language) = &self.language {
            if !LANGUAGES.contains(&language.as_str()) {
                return Err(PortError::Invalid(format!("unknown language '{}'", language)));
            }
        }
        Ok(())
    }

    pub fn apply(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.trim().to_string();
        }
        if let Some(avatar) = &self.avatar {
            account.avatar = avatar.clone();
        }
        if let Some(theme) = &self.theme {
            account.theme = theme.clone();
        }
        if let Some(language) = &self.language {
            account.language = language.clone();
        }
    }
}

//=========================================================================================
// Question Bank and Quiz Results
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
    Challenge,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Hard => "Hard",
            Difficulty::Challenge => "Challenge",
        }
    }
}

impl FromStr for Difficulty {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Moderate" => Ok(Difficulty::Moderate),
            "Hard" => Ok(Difficulty::Hard),
            "Challenge" => Ok(Difficulty::Challenge),
            other => Err(PortError::Invalid(format!("unknown difficulty '{}'", other))),
        }
    }
}

/// A multiple-choice question from the shared bank.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub subject: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: u8,
    pub explanation: String,
    pub xp_reward: u32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub subject: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: u8,
    pub explanation: String,
    pub xp_reward: u32,
}

impl NewQuestion {
    pub fn validate(&self) -> Result<(), PortError> {
        if self.subject.trim().is_empty() || self.prompt.trim().is_empty() {
            return Err(PortError::Invalid(
                "subject and question text are required".to_string(),
            ));
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(PortError::Invalid(format!(
                "a question needs exactly {} options",
                OPTIONS_PER_QUESTION
            )));
        }
        if usize::from(self.answer) >= OPTIONS_PER_QUESTION {
            return Err(PortError::Invalid("answer must be an option index 0-3".to_string()));
        }
        Ok(())
    }
}

/// One submitted answer.
#[derive(Debug, Clone, Copy)]
pub struct Answer {
    pub question_id: Uuid,
    pub selected_option: u8,
}

/// A submitted answer after grading.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub selected_option: u8,
    pub correct: bool,
    pub correct_option: Option<u8>,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct QuizSubmission {
    pub subject: String,
    pub difficulty: Difficulty,
    pub answers: Vec<Answer>,
    pub time_taken_secs: u32,
}

/// A persisted quiz attempt.
#[derive(Debug, Clone)]
pub struct QuizResult {
    pub id: Uuid,
    pub account_id: Uuid,
    pub subject: String,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub accuracy: u32,
    pub time_taken_secs: u32,
    pub xp_earned: u64,
    pub answers: Vec<GradedAnswer>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Goals and Study Sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalKind {
    Daily,
    Weekly,
}

impl GoalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalKind::Daily => "daily",
            GoalKind::Weekly => "weekly",
        }
    }
}

impl FromStr for GoalKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(GoalKind::Daily),
            "weekly" => Ok(GoalKind::Weekly),
            other => Err(PortError::Invalid(format!("unknown goal type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Goal {
    pub id: Uuid,
    pub account_id: Uuid,
    pub title: String,
    pub description: String,
    pub kind: GoalKind,
    pub xp_reward: u64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_GOAL_XP: u64 = 25;
pub const DEFAULT_GOAL_ICON: &str = "🎯";

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub description: String,
    pub kind: GoalKind,
    pub xp_reward: u64,
    pub due_date: Option<DateTime<Utc>>,
    pub icon: String,
}

/// Editable goal fields. Completion state and reward are not editable here.
#[derive(Debug, Clone, Default)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<GoalKind>,
    pub due_date: Option<DateTime<Utc>>,
    pub icon: Option<String>,
}

impl GoalUpdate {
    pub fn apply(&self, goal: &mut Goal) {
        if let Some(title) = &self.title {
            goal.title = title.clone();
        }
        if let Some(description) = &self.description {
            goal.description = description.clone();
        }
        if let Some(kind) = self.kind {
            goal.kind = kind;
        }
        if let Some(due_date) = self.due_date {
            goal.due_date = Some(due_date);
        }
        if let Some(icon) = &self.icon {
            goal.icon = icon.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Pomodoro,
    Focus,
    Break,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Pomodoro => "pomodoro",
            SessionKind::Focus => "focus",
            SessionKind::Break => "break",
        }
    }
}

impl FromStr for SessionKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(SessionKind::Pomodoro),
            "focus" => Ok(SessionKind::Focus),
            "break" => Ok(SessionKind::Break),
            other => Err(PortError::Invalid(format!("unknown session type '{}'", other))),
        }
    }
}

/// A timed study session.
#[derive(Debug, Clone)]
pub struct StudySession {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: SessionKind,
    pub duration_minutes: u32,
    pub subject: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub xp_earned: u64,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub kind: SessionKind,
    pub duration_minutes: u32,
    pub subject: String,
}

//=========================================================================================
// Reporting
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct Analytics {
    pub total_accounts: u64,
    pub total_quizzes: u64,
    pub average_accuracy: f64,
    pub quizzes_by_subject: Vec<(String, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundaries() {
        assert_eq!(Level::classify(0), Level::Beginner);
        assert_eq!(Level::classify(499), Level::Beginner);
        assert_eq!(Level::classify(500), Level::Intermediate);
        assert_eq!(Level::classify(1999), Level::Intermediate);
        assert_eq!(Level::classify(2000), Level::Advanced);
        assert_eq!(Level::classify(4999), Level::Advanced);
        assert_eq!(Level::classify(5000), Level::Expert);
        assert_eq!(Level::classify(u64::MAX), Level::Expert);
    }

    #[test]
    fn experience_credit_reclassifies() {
        let mut exp = Experience::new(480);
        assert_eq!(exp.level(), Level::Beginner);
        exp.credit(60);
        assert_eq!(exp.xp(), 540);
        assert_eq!(exp.level(), Level::Intermediate);
    }

    #[test]
    fn experience_reset_can_lower_level() {
        let mut exp = Experience::new(6000);
        exp.reset(100);
        assert_eq!(exp.xp(), 100);
        assert_eq!(exp.level(), Level::Beginner);
    }

    #[test]
    fn profile_update_rejects_unknown_theme() {
        let update = ProfileUpdate {
            theme: Some("neon".to_string()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(PortError::Invalid(_))));
    }

    #[test]
    fn new_question_needs_four_options() {
        let q = NewQuestion {
            subject: "Mathematics".to_string(),
            difficulty: Difficulty::Easy,
            prompt: "2 + 2?".to_string(),
            options: vec!["3".into(), "4".into()],
            answer: 1,
            explanation: String::new(),
            xp_reward: 10,
        };
        assert!(q.validate().is_err());
    }

    proptest::proptest! {
        #[test]
        fn classify_is_monotonic(a in 0u64..20_000, b in 0u64..20_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            proptest::prop_assert!(Level::classify(lo) <= Level::classify(hi));
        }

        #[test]
        fn credit_keeps_level_in_sync(start in 0u64..10_000, delta in 0u64..10_000) {
            let mut exp = Experience::new(start);
            exp.credit(delta);
            proptest::prop_assert_eq!(exp.xp(), start + delta);
            proptest::prop_assert_eq!(exp.level(), Level::classify(start + delta));
        }
    }
}
