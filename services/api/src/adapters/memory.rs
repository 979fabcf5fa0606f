//! services/api/src/adapters/memory.rs
//!
//! An in-memory `DatabaseService` used by the tests and by local runs without
//! `DATABASE_URL`. One mutex guards all tables, so every unit of work is
//! serialized. Mutations run on a copy of the row and are written back only
//! when they succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edugen_core::domain::{
    Account, AccountCredentials, Analytics, Difficulty, Goal, GoalUpdate, NewAccount, NewGoal,
    NewQuestion, NewSession, Question, QuizResult, Role, StudySession,
};
use edugen_core::ports::{
    AccountMutation, DatabaseService, GoalMutation, PortError, PortResult, SessionMutation,
};
use std::collections::BTreeMap;
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;
use uuid::Uuid;

struct StoredAccount {
    account: Account,
    password_hash: String,
}

// Tables are insertion-ordered vectors so listings are stable under a fixed clock.
#[derive(Default)]
struct StorageData {
    accounts: Vec<StoredAccount>,
    questions: Vec<Question>,
    quiz_results: Vec<QuizResult>,
    goals: Vec<Goal>,
    sessions: Vec<StudySession>,
}

impl StorageData {
    fn account_index(&self, account_id: Uuid) -> PortResult<usize> {
        self.accounts
            .iter()
            .position(|s| s.account.id == account_id)
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", account_id)))
    }

    fn goal_index(&self, account_id: Uuid, goal_id: Uuid) -> PortResult<usize> {
        self.goals
            .iter()
            .position(|g| g.id == goal_id && g.account_id == account_id)
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))
    }

    fn question_index(&self, question_id: Uuid) -> PortResult<usize> {
        self.questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| PortError::NotFound(format!("Question {} not found", question_id)))
    }
}

/// In-memory storage implementation.
#[derive(Default)]
pub struct MemoryDatabase {
    data: TokioMutex<StorageData>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, at most `limit`.
fn recent<T>(rows: impl DoubleEndedIterator<Item = T>, limit: usize) -> Vec<T> {
    rows.rev().take(limit).collect()
}

#[async_trait]
impl DatabaseService for MemoryDatabase {
    async fn insert_account(
        &self,
        new: NewAccount,
        referral_code: Option<&str>,
        reward_referrer: AccountMutation<'_>,
        created_at: DateTime<Utc>,
    ) -> PortResult<Account> {
        let mut data = self.data.lock().await;

        if data.accounts.iter().any(|s| s.account.email == new.email) {
            return Err(PortError::DuplicateAccount(new.email));
        }
        if data
            .accounts
            .iter()
            .any(|s| s.account.referral_code == new.referral_code)
        {
            return Err(PortError::ReferralCodeTaken);
        }

        let referrer = referral_code.and_then(|code| {
            data.accounts
                .iter()
                .position(|s| s.account.referral_code == code)
        });
        let referred_by = match referrer {
            Some(index) => {
                let mut referrer = data.accounts[index].account.clone();
                reward_referrer(&mut referrer)?;
                let id = referrer.id;
                data.accounts[index].account = referrer;
                Some(id)
            }
            None => None,
        };

        let password_hash = new.password_hash.clone();
        let account = Account::new(new, referred_by, created_at);
        data.accounts.push(StoredAccount {
            account: account.clone(),
            password_hash,
        });
        debug!(account_id = %account.id, "Stored account in memory");
        Ok(account)
    }

    async fn get_account(&self, account_id: Uuid) -> PortResult<Account> {
        let data = self.data.lock().await;
        let index = data.account_index(account_id)?;
        Ok(data.accounts[index].account.clone())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<AccountCredentials> {
        let data = self.data.lock().await;
        data.accounts
            .iter()
            .find(|s| s.account.email == email)
            .map(|s| AccountCredentials {
                account: s.account.clone(),
                password_hash: s.password_hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))
    }

    async fn update_account(
        &self,
        account_id: Uuid,
        mutation: AccountMutation<'_>,
    ) -> PortResult<Account> {
        let mut data = self.data.lock().await;
        let index = data.account_index(account_id)?;
        let mut account = data.accounts[index].account.clone();
        mutation(&mut account)?;
        data.accounts[index].account = account.clone();
        Ok(account)
    }

    async fn set_password_hash(&self, account_id: Uuid, password_hash: &str) -> PortResult<()> {
        let mut data = self.data.lock().await;
        let index = data.account_index(account_id)?;
        data.accounts[index].password_hash = password_hash.to_string();
        Ok(())
    }

    async fn list_accounts(&self) -> PortResult<Vec<Account>> {
        let data = self.data.lock().await;
        Ok(recent(data.accounts.iter().map(|s| s.account.clone()), usize::MAX))
    }

    async fn delete_account(&self, account_id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        let index = data.account_index(account_id)?;
        data.accounts.remove(index);

        data.quiz_results.retain(|r| r.account_id != account_id);
        data.goals.retain(|g| g.account_id != account_id);
        data.sessions.retain(|s| s.account_id != account_id);
        for stored in data.accounts.iter_mut() {
            if stored.account.referred_by == Some(account_id) {
                stored.account.referred_by = None;
            }
        }
        for question in data.questions.iter_mut() {
            if question.created_by == Some(account_id) {
                question.created_by = None;
            }
        }
        Ok(())
    }

    async fn leaderboard(&self, limit: usize) -> PortResult<Vec<Account>> {
        let data = self.data.lock().await;
        let mut students: Vec<Account> = data
            .accounts
            .iter()
            .filter(|s| s.account.role == Role::Student)
            .map(|s| s.account.clone())
            .collect();
        // Stable sort keeps registration order among equal XP.
        students.sort_by(|a, b| b.xp().cmp(&a.xp()));
        students.truncate(limit);
        Ok(students)
    }

    async fn analytics(&self) -> PortResult<Analytics> {
        let data = self.data.lock().await;
        let total_quizzes = data.quiz_results.len() as u64;
        let average_accuracy = if total_quizzes == 0 {
            0.0
        } else {
            data.quiz_results
                .iter()
                .map(|r| f64::from(r.accuracy))
                .sum::<f64>()
                / total_quizzes as f64
        };

        let mut by_subject: BTreeMap<String, u64> = BTreeMap::new();
        for result in &data.quiz_results {
            *by_subject.entry(result.subject.clone()).or_default() += 1;
        }

        Ok(Analytics {
            total_accounts: data.accounts.len() as u64,
            total_quizzes,
            average_accuracy,
            quizzes_by_subject: by_subject.into_iter().collect(),
        })
    }

    async fn create_question(
        &self,
        question: NewQuestion,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> PortResult<Question> {
        let mut data = self.data.lock().await;
        let question = Question {
            id: Uuid::new_v4(),
            subject: question.subject,
            difficulty: question.difficulty,
            prompt: question.prompt,
            options: question.options,
            answer: question.answer,
            explanation: question.explanation,
            xp_reward: question.xp_reward,
            created_by: Some(created_by),
            created_at,
        };
        data.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(&self, question_id: Uuid, question: NewQuestion) -> PortResult<Question> {
        let mut data = self.data.lock().await;
        let index = data.question_index(question_id)?;
        let stored = &mut data.questions[index];
        stored.subject = question.subject;
        stored.difficulty = question.difficulty;
        stored.prompt = question.prompt;
        stored.options = question.options;
        stored.answer = question.answer;
        stored.explanation = question.explanation;
        stored.xp_reward = question.xp_reward;
        Ok(stored.clone())
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        let index = data.question_index(question_id)?;
        data.questions.remove(index);
        Ok(())
    }

    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        let data = self.data.lock().await;
        Ok(recent(data.questions.iter().cloned(), usize::MAX))
    }

    async fn find_questions(
        &self,
        subject: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> PortResult<Vec<Question>> {
        let data = self.data.lock().await;
        Ok(data
            .questions
            .iter()
            .filter(|q| subject.map_or(true, |s| q.subject == s))
            .filter(|q| difficulty.map_or(true, |d| q.difficulty == d))
            .cloned()
            .collect())
    }

    async fn get_questions_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Question>> {
        let data = self.data.lock().await;
        Ok(data
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn record_quiz_result(
        &self,
        result: QuizResult,
        credit: AccountMutation<'_>,
    ) -> PortResult<Account> {
        let mut data = self.data.lock().await;
        let index = data.account_index(result.account_id)?;
        let mut account = data.accounts[index].account.clone();
        credit(&mut account)?;
        data.accounts[index].account = account.clone();
        data.quiz_results.push(result);
        Ok(account)
    }

    async fn list_quiz_results(&self, account_id: Uuid, limit: usize) -> PortResult<Vec<QuizResult>> {
        let data = self.data.lock().await;
        Ok(recent(
            data.quiz_results
                .iter()
                .filter(|r| r.account_id == account_id)
                .cloned(),
            limit,
        ))
    }

    async fn get_quiz_result(&self, account_id: Uuid, result_id: Uuid) -> PortResult<QuizResult> {
        let data = self.data.lock().await;
        data.quiz_results
            .iter()
            .find(|r| r.id == result_id && r.account_id == account_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Result {} not found", result_id)))
    }

    async fn create_goal(
        &self,
        account_id: Uuid,
        goal: NewGoal,
        created_at: DateTime<Utc>,
    ) -> PortResult<Goal> {
        let mut data = self.data.lock().await;
        data.account_index(account_id)?;
        let goal = Goal {
            id: Uuid::new_v4(),
            account_id,
            title: goal.title,
            description: goal.description,
            kind: goal.kind,
            xp_reward: goal.xp_reward,
            completed: false,
            completed_at: None,
            due_date: goal.due_date,
            icon: goal.icon,
            created_at,
        };
        data.goals.push(goal.clone());
        Ok(goal)
    }

    async fn list_goals(&self, account_id: Uuid) -> PortResult<Vec<Goal>> {
        let data = self.data.lock().await;
        Ok(recent(
            data.goals
                .iter()
                .filter(|g| g.account_id == account_id)
                .cloned(),
            usize::MAX,
        ))
    }

    async fn update_goal(&self, account_id: Uuid, goal_id: Uuid, update: GoalUpdate) -> PortResult<Goal> {
        let mut data = self.data.lock().await;
        let index = data.goal_index(account_id, goal_id)?;
        update.apply(&mut data.goals[index]);
        Ok(data.goals[index].clone())
    }

    async fn delete_goal(&self, account_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        let mut data = self.data.lock().await;
        let index = data.goal_index(account_id, goal_id)?;
        data.goals.remove(index);
        Ok(())
    }

    async fn complete_goal(
        &self,
        account_id: Uuid,
        goal_id: Uuid,
        mutation: GoalMutation<'_>,
    ) -> PortResult<(Goal, Account)> {
        let mut data = self.data.lock().await;
        let goal_index = data.goal_index(account_id, goal_id)?;
        let account_index = data.account_index(account_id)?;

        let mut goal = data.goals[goal_index].clone();
        let mut account = data.accounts[account_index].account.clone();
        mutation(&mut goal, &mut account)?;

        data.goals[goal_index] = goal.clone();
        data.accounts[account_index].account = account.clone();
        Ok((goal, account))
    }

    async fn create_session(
        &self,
        account_id: Uuid,
        session: NewSession,
        started_at: DateTime<Utc>,
    ) -> PortResult<StudySession> {
        let mut data = self.data.lock().await;
        data.account_index(account_id)?;
        let session = StudySession {
            id: Uuid::new_v4(),
            account_id,
            kind: session.kind,
            duration_minutes: session.duration_minutes,
            subject: session.subject,
            started_at,
            ended_at: None,
            completed: false,
            xp_earned: 0,
        };
        data.sessions.push(session.clone());
        Ok(session)
    }

    async fn list_sessions(&self, account_id: Uuid, limit: usize) -> PortResult<Vec<StudySession>> {
        let data = self.data.lock().await;
        Ok(recent(
            data.sessions
                .iter()
                .filter(|s| s.account_id == account_id)
                .cloned(),
            limit,
        ))
    }

    async fn end_session(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        mutation: SessionMutation<'_>,
    ) -> PortResult<(StudySession, Account)> {
        let mut data = self.data.lock().await;
        let session_index = data
            .sessions
            .iter()
            .position(|s| s.id == session_id && s.account_id == account_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
        let account_index = data.account_index(account_id)?;

        let mut session = data.sessions[session_index].clone();
        let mut account = data.accounts[account_index].account.clone();
        mutation(&mut session, &mut account)?;

        data.sessions[session_index] = session.clone();
        data.accounts[account_index].account = account.clone();
        Ok((session, account))
    }
}
