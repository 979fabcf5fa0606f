//! crates/edugen_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, AccountCredentials, Analytics, Difficulty, Goal, GoalUpdate, NewAccount, NewGoal,
    NewQuestion, NewSession, Question, QuizResult, StudySession,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("An account with email {0} already exists")]
    DuplicateAccount(String),
    #[error("Referral code already in use")]
    ReferralCodeTaken,
    #[error("Already completed: {0}")]
    AlreadyCompleted(String),
    #[error("You have already spun the wheel today")]
    AlreadyClaimedToday,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortError::Unavailable(_) | PortError::Unexpected(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Mutation applied to a locked account inside a store transaction.
/// Returning an error aborts the transaction with nothing written.
pub type AccountMutation<'a> = &'a (dyn Fn(&mut Account) -> PortResult<()> + Send + Sync);

/// Mutation applied to a locked goal and its owner inside one transaction.
pub type GoalMutation<'a> = &'a (dyn Fn(&mut Goal, &mut Account) -> PortResult<()> + Send + Sync);

/// Mutation applied to a locked study session and its owner inside one transaction.
pub type SessionMutation<'a> =
    &'a (dyn Fn(&mut StudySession, &mut Account) -> PortResult<()> + Send + Sync);

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The account store and its child records.
///
/// Every method taking a mutation is a unit of work: the implementation loads
/// the rows under a lock, runs the mutation, and persists every touched row
/// atomically, or nothing at all if the mutation or the write fails.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Accounts ---

    /// Inserts `new`. When `referral_code` resolves to an account,
    /// `reward_referrer` runs on it and the new account is linked to it.
    async fn insert_account(
        &self,
        new: NewAccount,
        referral_code: Option<&str>,
        reward_referrer: AccountMutation<'_>,
        created_at: DateTime<Utc>,
    ) -> PortResult<Account>;

    async fn get_account(&self, account_id: Uuid) -> PortResult<Account>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<AccountCredentials>;

    async fn update_account(
        &self,
        account_id: Uuid,
        mutation: AccountMutation<'_>,
    ) -> PortResult<Account>;

    async fn set_password_hash(&self, account_id: Uuid, password_hash: &str) -> PortResult<()>;

    async fn list_accounts(&self) -> PortResult<Vec<Account>>;

    /// Hard delete. Child records go with the account.
    async fn delete_account(&self, account_id: Uuid) -> PortResult<()>;

    /// Students ordered by XP, highest first.
    async fn leaderboard(&self, limit: usize) -> PortResult<Vec<Account>>;

    async fn analytics(&self) -> PortResult<Analytics>;

    // --- Question Bank ---
    async fn create_question(
        &self,
        question: NewQuestion,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> PortResult<Question>;

    async fn update_question(&self, question_id: Uuid, question: NewQuestion) -> PortResult<Question>;

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()>;

    async fn list_questions(&self) -> PortResult<Vec<Question>>;

    async fn find_questions(
        &self,
        subject: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> PortResult<Vec<Question>>;

    async fn get_questions_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Question>>;

    // --- Quiz Results ---

    /// Inserts `result` and applies `credit` to its owner in one transaction.
    async fn record_quiz_result(
        &self,
        result: QuizResult,
        credit: AccountMutation<'_>,
    ) -> PortResult<Account>;

    async fn list_quiz_results(&self, account_id: Uuid, limit: usize) -> PortResult<Vec<QuizResult>>;

    async fn get_quiz_result(&self, account_id: Uuid, result_id: Uuid) -> PortResult<QuizResult>;

    // --- Goals ---
    async fn create_goal(
        &self,
        account_id: Uuid,
        goal: NewGoal,
        created_at: DateTime<Utc>,
    ) -> PortResult<Goal>;

    async fn list_goals(&self, account_id: Uuid) -> PortResult<Vec<Goal>>;

    async fn update_goal(&self, account_id: Uuid, goal_id: Uuid, update: GoalUpdate) -> PortResult<Goal>;

    async fn delete_goal(&self, account_id: Uuid, goal_id: Uuid) -> PortResult<()>;

    async fn complete_goal(
        &self,
        account_id: Uuid,
        goal_id: Uuid,
        mutation: GoalMutation<'_>,
    ) -> PortResult<(Goal, Account)>;

    // --- Study Sessions ---
    async fn create_session(
        &self,
        account_id: Uuid,
        session: NewSession,
        started_at: DateTime<Utc>,
    ) -> PortResult<StudySession>;

    async fn list_sessions(&self, account_id: Uuid, limit: usize) -> PortResult<Vec<StudySession>>;

    async fn end_session(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        mutation: SessionMutation<'_>,
    ) -> PortResult<(StudySession, Account)>;
}

/// Where a chat reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Cache,
    Local,
    Remote,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Cache => "cache",
            ReplySource::Local => "local",
            ReplySource::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub source: ReplySource,
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Answers a study question, optionally scoped to a subject.
    async fn reply(&self, message: &str, subject: Option<&str>) -> PortResult<ChatReply>;
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
