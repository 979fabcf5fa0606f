//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every reward-affecting write runs in a transaction that first locks the rows
//! it touches with `SELECT ... FOR UPDATE`, so concurrent credits to one account
//! serialize instead of overwriting each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edugen_core::domain::{
    Account, AccountCredentials, Analytics, Difficulty, Experience, Goal, GoalUpdate,
    GradedAnswer, NewAccount, NewGoal, NewQuestion, NewSession, Question, QuizResult,
    StudySession,
};
use edugen_core::ports::{
    AccountMutation, DatabaseService, GoalMutation, PortError, PortResult, SessionMutation,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const ACCOUNT_COLUMNS: &str = "id, name, email, role, xp, streak, total_study_hours, avatar, \
    theme, language, last_login_at, last_spin_at, referral_code, referred_by, referral_count, created_at";

const QUESTION_COLUMNS: &str =
    "id, subject, difficulty, prompt, options, answer, explanation, xp_reward, created_by, created_at";

const QUIZ_RESULT_COLUMNS: &str = "id, account_id, subject, difficulty, total_questions, \
    correct_answers, accuracy, time_taken_secs, xp_earned, answers, created_at";

const GOAL_COLUMNS: &str = "id, account_id, title, description, kind, xp_reward, completed, \
    completed_at, due_date, icon, created_at";

const SESSION_COLUMNS: &str = "id, account_id, kind, duration_minutes, subject, started_at, \
    ended_at, completed, xp_earned";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    xp: i64,
    streak: i32,
    total_study_hours: f64,
    avatar: String,
    theme: String,
    language: String,
    last_login_at: Option<DateTime<Utc>>,
    last_spin_at: Option<DateTime<Utc>>,
    referral_code: String,
    referred_by: Option<Uuid>,
    referral_count: i32,
    created_at: DateTime<Utc>,
}
impl AccountRecord {
    fn to_domain(self) -> PortResult<Account> {
        Ok(Account {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            // The stored level column is derived data; rebuild it from xp.
            experience: Experience::new(self.xp.max(0) as u64),
            streak: self.streak.max(0) as u32,
            total_study_hours: self.total_study_hours,
            avatar: self.avatar,
            theme: self.theme,
            language: self.language,
            last_login_at: self.last_login_at,
            last_spin_at: self.last_spin_at,
            referral_code: self.referral_code,
            referred_by: self.referred_by,
            referral_count: self.referral_count.max(0) as u32,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    #[sqlx(flatten)]
    account: AccountRecord,
    password_hash: String,
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    subject: String,
    difficulty: String,
    prompt: String,
    options: Vec<String>,
    answer: i16,
    explanation: String,
    xp_reward: i32,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<Question> {
        Ok(Question {
            id: self.id,
            subject: self.subject,
            difficulty: self.difficulty.parse()?,
            prompt: self.prompt,
            options: self.options,
            answer: self.answer.clamp(0, 3) as u8,
            explanation: self.explanation,
            xp_reward: self.xp_reward.max(0) as u32,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct GradedAnswerRecord {
    question_id: Uuid,
    selected_option: u8,
    correct: bool,
    correct_option: Option<u8>,
    explanation: String,
}
impl From<&GradedAnswer> for GradedAnswerRecord {
    fn from(a: &GradedAnswer) -> Self {
        Self {
            question_id: a.question_id,
            selected_option: a.selected_option,
            correct: a.correct,
            correct_option: a.correct_option,
            explanation: a.explanation.clone(),
        }
    }
}
impl GradedAnswerRecord {
    fn to_domain(self) -> GradedAnswer {
        GradedAnswer {
            question_id: self.question_id,
            selected_option: self.selected_option,
            correct: self.correct,
            correct_option: self.correct_option,
            explanation: self.explanation,
        }
    }
}

#[derive(FromRow)]
struct QuizResultRecord {
    id: Uuid,
    account_id: Uuid,
    subject: String,
    difficulty: String,
    total_questions: i32,
    correct_answers: i32,
    accuracy: i32,
    time_taken_secs: i32,
    xp_earned: i64,
    answers: Json<Vec<GradedAnswerRecord>>,
    created_at: DateTime<Utc>,
}
impl QuizResultRecord {
    fn to_domain(self) -> PortResult<QuizResult> {
        Ok(QuizResult {
            id: self.id,
            account_id: self.account_id,
            subject: self.subject,
            difficulty: self.difficulty.parse()?,
            total_questions: self.total_questions.max(0) as u32,
            correct_answers: self.correct_answers.max(0) as u32,
            accuracy: self.accuracy.max(0) as u32,
            time_taken_secs: self.time_taken_secs.max(0) as u32,
            xp_earned: self.xp_earned.max(0) as u64,
            answers: self.answers.0.into_iter().map(|a| a.to_domain()).collect(),
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct GoalRecord {
    id: Uuid,
    account_id: Uuid,
    title: String,
    description: String,
    kind: String,
    xp_reward: i64,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    icon: String,
    created_at: DateTime<Utc>,
}
impl GoalRecord {
    fn to_domain(self) -> PortResult<Goal> {
        Ok(Goal {
            id: self.id,
            account_id: self.account_id,
            title: self.title,
            description: self.description,
            kind: self.kind.parse()?,
            xp_reward: self.xp_reward.max(0) as u64,
            completed: self.completed,
            completed_at: self.completed_at,
            due_date: self.due_date,
            icon: self.icon,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    account_id: Uuid,
    kind: String,
    duration_minutes: i32,
    subject: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    completed: bool,
    xp_earned: i64,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<StudySession> {
        Ok(StudySession {
            id: self.id,
            account_id: self.account_id,
            kind: self.kind.parse()?,
            duration_minutes: self.duration_minutes.max(0) as u32,
            subject: self.subject,
            started_at: self.started_at,
            ended_at: self.ended_at,
            completed: self.completed,
            xp_earned: self.xp_earned.max(0) as u64,
        })
    }
}

//=========================================================================================
// Error Mapping and Row-Level Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(what: impl FnOnce() -> String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => unexpected(e),
    }
}

fn db_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn db_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

async fn lock_account(conn: &mut PgConnection, account_id: Uuid) -> PortResult<Account> {
    let query = format!("SELECT {} FROM accounts WHERE id = $1 FOR UPDATE", ACCOUNT_COLUMNS);
    sqlx::query_as::<_, AccountRecord>(&query)
        .bind(account_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found(|| format!("Account {} not found", account_id)))?
        .to_domain()
}

/// Writes back every mutable account column. Identity, email and referral
/// linkage never change after insert and are left alone.
async fn save_account(conn: &mut PgConnection, account: &Account) -> PortResult<()> {
    sqlx::query(
        "UPDATE accounts SET name = $1, role = $2, xp = $3, level = $4, streak = $5, \
         total_study_hours = $6, avatar = $7, theme = $8, language = $9, last_login_at = $10, \
         last_spin_at = $11, referral_count = $12 WHERE id = $13",
    )
    .bind(&account.name)
    .bind(account.role.as_str())
    .bind(db_i64(account.xp()))
    .bind(account.level().as_str())
    .bind(db_i32(account.streak))
    .bind(account.total_study_hours)
    .bind(&account.avatar)
    .bind(&account.theme)
    .bind(&account.language)
    .bind(account.last_login_at)
    .bind(account.last_spin_at)
    .bind(db_i32(account.referral_count))
    .bind(account.id)
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(())
}

async fn lock_goal(conn: &mut PgConnection, account_id: Uuid, goal_id: Uuid) -> PortResult<Goal> {
    let query = format!(
        "SELECT {} FROM goals WHERE id = $1 AND account_id = $2 FOR UPDATE",
        GOAL_COLUMNS
    );
    sqlx::query_as::<_, GoalRecord>(&query)
        .bind(goal_id)
        .bind(account_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found(|| format!("Goal {} not found", goal_id)))?
        .to_domain()
}

async fn save_goal(conn: &mut PgConnection, goal: &Goal) -> PortResult<()> {
    sqlx::query(
        "UPDATE goals SET title = $1, description = $2, kind = $3, completed = $4, \
         completed_at = $5, due_date = $6, icon = $7 WHERE id = $8",
    )
    .bind(&goal.title)
    .bind(&goal.description)
    .bind(goal.kind.as_str())
    .bind(goal.completed)
    .bind(goal.completed_at)
    .bind(goal.due_date)
    .bind(&goal.icon)
    .bind(goal.id)
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(())
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn insert_account(
        &self,
        new: NewAccount,
        referral_code: Option<&str>,
        reward_referrer: AccountMutation<'_>,
        created_at: DateTime<Utc>,
    ) -> PortResult<Account> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE email = $1")
            .bind(&new.email)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?;
        if existing.is_some() {
            return Err(PortError::DuplicateAccount(new.email));
        }

        let referrer = match referral_code {
            Some(code) => {
                let query = format!(
                    "SELECT {} FROM accounts WHERE referral_code = $1 FOR UPDATE",
                    ACCOUNT_COLUMNS
                );
                sqlx::query_as::<_, AccountRecord>(&query)
                    .bind(code)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(unexpected)?
                    .map(AccountRecord::to_domain)
                    .transpose()?
            }
            None => None,
        };

        let referred_by = match referrer {
            Some(mut referrer) => {
                reward_referrer(&mut referrer)?;
                save_account(&mut tx, &referrer).await?;
                Some(referrer.id)
            }
            None => None,
        };

        let password_hash = new.password_hash.clone();
        let account = Account::new(new, referred_by, created_at);

        sqlx::query(
            "INSERT INTO accounts (id, name, email, password_hash, role, xp, level, streak, \
             total_study_hours, avatar, theme, language, referral_code, referred_by, \
             referral_count, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&password_hash)
        .bind(account.role.as_str())
        .bind(db_i64(account.xp()))
        .bind(account.level().as_str())
        .bind(db_i32(account.streak))
        .bind(account.total_study_hours)
        .bind(&account.avatar)
        .bind(&account.theme)
        .bind(&account.language)
        .bind(&account.referral_code)
        .bind(account.referred_by)
        .bind(db_i32(account.referral_count))
        .bind(account.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                match db.constraint() {
                    Some("accounts_referral_code_key") => PortError::ReferralCodeTaken,
                    _ => PortError::DuplicateAccount(account.email.clone()),
                }
            }
            _ => unexpected(e),
        })?;

        tx.commit().await.map_err(unexpected)?;
        Ok(account)
    }

    async fn get_account(&self, account_id: Uuid) -> PortResult<Account> {
        let query = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, AccountRecord>(&query)
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(|| format!("Account {} not found", account_id)))?
            .to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<AccountCredentials> {
        let query = format!(
            "SELECT {}, password_hash FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        );
        let record = sqlx::query_as::<_, CredentialsRecord>(&query)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(|| format!("No account for {}", email)))?;

        Ok(AccountCredentials {
            account: record.account.to_domain()?,
            password_hash: record.password_hash,
        })
    }

    async fn update_account(
        &self,
        account_id: Uuid,
        mutation: AccountMutation<'_>,
    ) -> PortResult<Account> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut account = lock_account(&mut tx, account_id).await?;
        mutation(&mut account)?;
        save_account(&mut tx, &account).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(account)
    }

    async fn set_password_hash(&self, account_id: Uuid, password_hash: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Account {} not found", account_id)));
        }
        Ok(())
    }

    async fn list_accounts(&self) -> PortResult<Vec<Account>> {
        let query = format!("SELECT {} FROM accounts ORDER BY created_at DESC", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, AccountRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(AccountRecord::to_domain)
            .collect()
    }

    async fn delete_account(&self, account_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Account {} not found", account_id)));
        }
        Ok(())
    }

    async fn leaderboard(&self, limit: usize) -> PortResult<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM accounts WHERE role = 'student' ORDER BY xp DESC, created_at ASC LIMIT $1",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, AccountRecord>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(AccountRecord::to_domain)
            .collect()
    }

    async fn analytics(&self) -> PortResult<Analytics> {
        let (total_accounts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        let (total_quizzes, average_accuracy): (i64, Option<f64>) =
            sqlx::query_as("SELECT COUNT(*), AVG(accuracy)::float8 FROM quiz_results")
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        let by_subject: Vec<(String, i64)> = sqlx::query_as(
            "SELECT subject, COUNT(*) FROM quiz_results GROUP BY subject ORDER BY subject",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(Analytics {
            total_accounts: total_accounts.max(0) as u64,
            total_quizzes: total_quizzes.max(0) as u64,
            average_accuracy: average_accuracy.unwrap_or(0.0),
            quizzes_by_subject: by_subject
                .into_iter()
                .map(|(subject, count)| (subject, count.max(0) as u64))
                .collect(),
        })
    }

    async fn create_question(
        &self,
        question: NewQuestion,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> PortResult<Question> {
        let query = format!(
            "INSERT INTO questions (id, subject, difficulty, prompt, options, answer, explanation, \
             xp_reward, created_by, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {}",
            QUESTION_COLUMNS
        );
        sqlx::query_as::<_, QuestionRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(&question.subject)
            .bind(question.difficulty.as_str())
            .bind(&question.prompt)
            .bind(&question.options)
            .bind(i16::from(question.answer))
            .bind(&question.explanation)
            .bind(db_i32(question.xp_reward))
            .bind(created_by)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn update_question(&self, question_id: Uuid, question: NewQuestion) -> PortResult<Question> {
        let query = format!(
            "UPDATE questions SET subject = $1, difficulty = $2, prompt = $3, options = $4, \
             answer = $5, explanation = $6, xp_reward = $7 WHERE id = $8 RETURNING {}",
            QUESTION_COLUMNS
        );
        sqlx::query_as::<_, QuestionRecord>(&query)
            .bind(&question.subject)
            .bind(question.difficulty.as_str())
            .bind(&question.prompt)
            .bind(&question.options)
            .bind(i16::from(question.answer))
            .bind(&question.explanation)
            .bind(db_i32(question.xp_reward))
            .bind(question_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(|| format!("Question {} not found", question_id)))?
            .to_domain()
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Question {} not found", question_id)));
        }
        Ok(())
    }

    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        let query = format!("SELECT {} FROM questions ORDER BY created_at DESC", QUESTION_COLUMNS);
        sqlx::query_as::<_, QuestionRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(QuestionRecord::to_domain)
            .collect()
    }

    async fn find_questions(
        &self,
        subject: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> PortResult<Vec<Question>> {
        let query = format!(
            "SELECT {} FROM questions WHERE ($1::text IS NULL OR subject = $1) \
             AND ($2::text IS NULL OR difficulty = $2)",
            QUESTION_COLUMNS
        );
        sqlx::query_as::<_, QuestionRecord>(&query)
            .bind(subject)
            .bind(difficulty.map(|d| d.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(QuestionRecord::to_domain)
            .collect()
    }

    async fn get_questions_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Question>> {
        let query = format!("SELECT {} FROM questions WHERE id = ANY($1)", QUESTION_COLUMNS);
        sqlx::query_as::<_, QuestionRecord>(&query)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(QuestionRecord::to_domain)
            .collect()
    }

    async fn record_quiz_result(
        &self,
        result: QuizResult,
        credit: AccountMutation<'_>,
    ) -> PortResult<Account> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut account = lock_account(&mut tx, result.account_id).await?;

        let answers: Vec<GradedAnswerRecord> = result.answers.iter().map(Into::into).collect();
        sqlx::query(
            "INSERT INTO quiz_results (id, account_id, subject, difficulty, total_questions, \
             correct_answers, accuracy, time_taken_secs, xp_earned, answers, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(result.id)
        .bind(result.account_id)
        .bind(&result.subject)
        .bind(result.difficulty.as_str())
        .bind(db_i32(result.total_questions))
        .bind(db_i32(result.correct_answers))
        .bind(db_i32(result.accuracy))
        .bind(db_i32(result.time_taken_secs))
        .bind(db_i64(result.xp_earned))
        .bind(Json(answers))
        .bind(result.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        credit(&mut account)?;
        save_account(&mut tx, &account).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(account)
    }

    async fn list_quiz_results(&self, account_id: Uuid, limit: usize) -> PortResult<Vec<QuizResult>> {
        let query = format!(
            "SELECT {} FROM quiz_results WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
            QUIZ_RESULT_COLUMNS
        );
        sqlx::query_as::<_, QuizResultRecord>(&query)
            .bind(account_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(QuizResultRecord::to_domain)
            .collect()
    }

    async fn get_quiz_result(&self, account_id: Uuid, result_id: Uuid) -> PortResult<QuizResult> {
        let query = format!(
            "SELECT {} FROM quiz_results WHERE id = $1 AND account_id = $2",
            QUIZ_RESULT_COLUMNS
        );
        sqlx::query_as::<_, QuizResultRecord>(&query)
            .bind(result_id)
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found(|| format!("Result {} not found", result_id)))?
            .to_domain()
    }

    async fn create_goal(
        &self,
        account_id: Uuid,
        goal: NewGoal,
        created_at: DateTime<Utc>,
    ) -> PortResult<Goal> {
        let query = format!(
            "INSERT INTO goals (id, account_id, title, description, kind, xp_reward, due_date, \
             icon, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            GOAL_COLUMNS
        );
        sqlx::query_as::<_, GoalRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(account_id)
            .bind(&goal.title)
            .bind(&goal.description)
            .bind(goal.kind.as_str())
            .bind(db_i64(goal.xp_reward))
            .bind(goal.due_date)
            .bind(&goal.icon)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn list_goals(&self, account_id: Uuid) -> PortResult<Vec<Goal>> {
        let query = format!(
            "SELECT {} FROM goals WHERE account_id = $1 ORDER BY created_at DESC",
            GOAL_COLUMNS
        );
        sqlx::query_as::<_, GoalRecord>(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(GoalRecord::to_domain)
            .collect()
    }

    async fn update_goal(&self, account_id: Uuid, goal_id: Uuid, update: GoalUpdate) -> PortResult<Goal> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut goal = lock_goal(&mut tx, account_id, goal_id).await?;
        update.apply(&mut goal);
        save_goal(&mut tx, &goal).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(goal)
    }

    async fn delete_goal(&self, account_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND account_id = $2")
            .bind(goal_id)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }

    async fn complete_goal(
        &self,
        account_id: Uuid,
        goal_id: Uuid,
        mutation: GoalMutation<'_>,
    ) -> PortResult<(Goal, Account)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut goal = lock_goal(&mut tx, account_id, goal_id).await?;
        let mut account = lock_account(&mut tx, account_id).await?;

        mutation(&mut goal, &mut account)?;

        save_goal(&mut tx, &goal).await?;
        save_account(&mut tx, &account).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok((goal, account))
    }

    async fn create_session(
        &self,
        account_id: Uuid,
        session: NewSession,
        started_at: DateTime<Utc>,
    ) -> PortResult<StudySession> {
        let query = format!(
            "INSERT INTO study_sessions (id, account_id, kind, duration_minutes, subject, started_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(account_id)
            .bind(session.kind.as_str())
            .bind(db_i32(session.duration_minutes))
            .bind(&session.subject)
            .bind(started_at)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn list_sessions(&self, account_id: Uuid, limit: usize) -> PortResult<Vec<StudySession>> {
        let query = format!(
            "SELECT {} FROM study_sessions WHERE account_id = $1 ORDER BY started_at DESC LIMIT $2",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&query)
            .bind(account_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(SessionRecord::to_domain)
            .collect()
    }

    async fn end_session(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        mutation: SessionMutation<'_>,
    ) -> PortResult<(StudySession, Account)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let query = format!(
            "SELECT {} FROM study_sessions WHERE id = $1 AND account_id = $2 FOR UPDATE",
            SESSION_COLUMNS
        );
        let mut session = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(session_id)
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found(|| format!("Session {} not found", session_id)))?
            .to_domain()?;
        let mut account = lock_account(&mut tx, account_id).await?;

        mutation(&mut session, &mut account)?;

        sqlx::query(
            "UPDATE study_sessions SET ended_at = $1, completed = $2, xp_earned = $3 WHERE id = $4",
        )
        .bind(session.ended_at)
        .bind(session.completed)
        .bind(db_i64(session.xp_earned))
        .bind(session.id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        save_account(&mut tx, &account).await?;

        tx.commit().await.map_err(unexpected)?;
        Ok((session, account))
    }
}
