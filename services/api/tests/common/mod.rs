// Common test helpers for integration tests
#![allow(dead_code)]

use api_lib::adapters::{MemoryDatabase, Tutor};
use api_lib::config::Config;
use api_lib::web::{state::AppState, token::TokenSigner};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use edugen_core::domain::{Account, Difficulty, NewGoal, NewQuestion, Question, Role, DEFAULT_GOAL_ICON};
use edugen_core::economy::{Calendar, SpinWheel};
use edugen_core::ports::{Clock, DatabaseService};
use edugen_core::{GoalKind, Registration, RewardLedger};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";
/// Every spin pays this in tests.
pub const SPIN_REWARD: u64 = 100;

/// A clock the test moves by hand.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn test_config(offset: FixedOffset) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        log_level: tracing::Level::DEBUG,
        jwt_secret: TEST_SECRET.to_string(),
        token_ttl: Duration::hours(1),
        day_boundary_offset: offset,
        spin_rewards: vec![SPIN_REWARD],
        cors_origin: "http://localhost:5173".to_string(),
        openai_api_key: None,
        chat_model: "test-model".to_string(),
        chat_timeout: std::time::Duration::from_secs(1),
        chat_cache_size: 10,
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDatabase>,
    pub clock: Arc<TestClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_offset(FixedOffset::east_opt(0).unwrap())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        let config = Arc::new(test_config(offset));
        let db = Arc::new(MemoryDatabase::new());
        let clock = Arc::new(TestClock::new(at(2025, 3, 10, 9, 0)));
        let ledger = Arc::new(RewardLedger::new(
            db.clone(),
            clock.clone(),
            Calendar::new(offset),
            SpinWheel::new(config.spin_rewards.clone()).unwrap(),
        ));
        let state = Arc::new(AppState {
            db: db.clone(),
            config: config.clone(),
            ledger,
            tokens: Arc::new(TokenSigner::new(&config.jwt_secret, config.token_ttl)),
            chat: Arc::new(Tutor::new(None, config.chat_timeout, config.chat_cache_size)),
        });
        Self { state, db, clock }
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.state.ledger
    }

    /// Registers a student straight through the ledger; the hash is a placeholder.
    pub async fn student(&self, name: &str, referral_code: Option<&str>) -> Account {
        self.ledger()
            .register(Registration {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "not-a-real-hash".to_string(),
                role: Role::Student,
                referral_code: referral_code.map(str::to_string),
            })
            .await
            .unwrap()
    }

    pub async fn admin(&self, name: &str) -> Account {
        let account = self.student(name, None).await;
        self.db
            .update_account(account.id, &|a: &mut Account| {
                a.role = Role::Admin;
                Ok(())
            })
            .await
            .unwrap()
    }

    pub async fn account(&self, id: Uuid) -> Account {
        self.db.get_account(id).await.unwrap()
    }

    /// Adds `count` questions whose correct option is always 0.
    pub async fn questions(&self, subject: &str, difficulty: Difficulty, count: usize) -> Vec<Question> {
        let author = Uuid::new_v4();
        let mut created = Vec::with_capacity(count);
        for i in 0..count {
            let question = self
                .db
                .create_question(
                    NewQuestion {
                        subject: subject.to_string(),
                        difficulty,
                        prompt: format!("{} question {}", subject, i),
                        options: vec!["right".into(), "wrong".into(), "wrong".into(), "wrong".into()],
                        answer: 0,
                        explanation: format!("explanation {}", i),
                        xp_reward: 10,
                    },
                    author,
                    self.clock.now(),
                )
                .await
                .unwrap();
            created.push(question);
        }
        created
    }

    pub async fn goal(&self, account_id: Uuid, xp_reward: u64) -> Uuid {
        self.db
            .create_goal(
                account_id,
                NewGoal {
                    title: "Read a chapter".to_string(),
                    description: String::new(),
                    kind: GoalKind::Daily,
                    xp_reward,
                    due_date: None,
                    icon: DEFAULT_GOAL_ICON.to_string(),
                },
                self.clock.now(),
            )
            .await
            .unwrap()
            .id
    }
}
