//! Reward ledger behaviour against the in-memory store.

mod common;

use chrono::{Duration, FixedOffset};
use common::{at, TestApp, SPIN_REWARD};
use edugen_core::domain::{Answer, Difficulty, Level, NewSession, QuizSubmission, SessionKind};
use edugen_core::ports::{Clock, DatabaseService, PortError};
use edugen_core::Registration;
use edugen_core::Role;
use uuid::Uuid;

async fn set_xp(app: &TestApp, id: Uuid, xp: u64) {
    app.ledger().set_xp(id, xp).await.unwrap();
}

fn all_correct(questions: &[edugen_core::Question], count: usize) -> Vec<Answer> {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| Answer {
            question_id: q.id,
            selected_option: if i < count { 0 } else { 1 },
        })
        .collect()
}

#[tokio::test]
async fn quiz_credit_crosses_into_intermediate() {
    let app = TestApp::new();
    let student = app.student("Asha", None).await;
    set_xp(&app, student.id, 480).await;
    let questions = app.questions("Math", Difficulty::Moderate, 5).await;

    let outcome = app
        .ledger()
        .submit_quiz(
            student.id,
            QuizSubmission {
                subject: "Math".into(),
                difficulty: Difficulty::Moderate,
                answers: all_correct(&questions, 4),
                time_taken_secs: 90,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.result.correct_answers, 4);
    assert_eq!(outcome.result.total_questions, 5);
    assert_eq!(outcome.result.accuracy, 80);
    assert_eq!(outcome.result.xp_earned, 60);
    assert_eq!(outcome.account.xp(), 540);
    assert_eq!(outcome.account.level(), Level::Intermediate);

    let history = app.db.list_quiz_results(student.id, 20).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn hard_quiz_rounds_to_even_and_reaches_advanced() {
    let app = TestApp::new();
    let student = app.student("Bilal", None).await;
    set_xp(&app, student.id, 1900).await;
    let questions = app.questions("Physics", Difficulty::Hard, 5).await;

    let outcome = app
        .ledger()
        .submit_quiz(
            student.id,
            QuizSubmission {
                subject: "Physics".into(),
                difficulty: Difficulty::Hard,
                answers: all_correct(&questions, 5),
                time_taken_secs: 120,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.result.xp_earned, 112);
    assert_eq!(outcome.account.xp(), 2012);
    assert_eq!(outcome.account.level(), Level::Advanced);
}

#[tokio::test]
async fn empty_quiz_is_rejected_without_storing_a_result() {
    let app = TestApp::new();
    let student = app.student("Chen", None).await;

    let err = app
        .ledger()
        .submit_quiz(
            student.id,
            QuizSubmission {
                subject: "Math".into(),
                difficulty: Difficulty::Easy,
                answers: vec![],
                time_taken_secs: 0,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Invalid(_)));
    assert!(app.db.list_quiz_results(student.id, 20).await.unwrap().is_empty());
    assert_eq!(app.account(student.id).await.xp(), 0);
}

#[tokio::test]
async fn unknown_question_ids_count_as_incorrect() {
    let app = TestApp::new();
    let student = app.student("Dara", None).await;
    let questions = app.questions("Biology", Difficulty::Easy, 1).await;

    let outcome = app
        .ledger()
        .submit_quiz(
            student.id,
            QuizSubmission {
                subject: "Biology".into(),
                difficulty: Difficulty::Easy,
                answers: vec![
                    Answer {
                        question_id: questions[0].id,
                        selected_option: 0,
                    },
                    Answer {
                        question_id: Uuid::new_v4(),
                        selected_option: 0,
                    },
                ],
                time_taken_secs: 30,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.result.correct_answers, 1);
    assert_eq!(outcome.result.total_questions, 2);
    assert_eq!(outcome.result.accuracy, 50);
    assert!(!outcome.result.answers[1].correct);
    assert_eq!(outcome.result.answers[1].correct_option, None);
}

#[tokio::test]
async fn referral_pays_the_referrer_and_links_the_new_account() {
    let app = TestApp::new();
    let referrer = app.student("Esha", None).await;
    let padded = format!("  {}  ", referrer.referral_code.to_lowercase());

    let referred = app.student("Farid", Some(&padded)).await;

    let referrer = app.account(referrer.id).await;
    assert_eq!(referrer.xp(), 500);
    assert_eq!(referrer.level(), Level::Intermediate);
    assert_eq!(referrer.referral_count, 1);
    assert_eq!(referred.referred_by, Some(referrer.id));
    assert_eq!(referred.xp(), 0);
}

#[tokio::test]
async fn unknown_referral_code_is_ignored() {
    let app = TestApp::new();
    let existing = app.student("Gita", None).await;

    let account = app.student("Hugo", Some("NOPE00")).await;

    assert_eq!(account.referred_by, None);
    assert_eq!(app.account(existing.id).await.xp(), 0);
}

#[tokio::test]
async fn duplicate_email_does_not_credit_the_referrer() {
    let app = TestApp::new();
    let referrer = app.student("Ines", None).await;
    app.student("Jon", None).await;

    let err = app
        .ledger()
        .register(Registration {
            name: "Jon Again".into(),
            email: "JON@example.com".into(),
            password_hash: "hash".into(),
            role: Role::Student,
            referral_code: Some(referrer.referral_code.clone()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::DuplicateAccount(_)));
    let referrer = app.account(referrer.id).await;
    assert_eq!(referrer.xp(), 0);
    assert_eq!(referrer.referral_count, 0);
}

#[tokio::test]
async fn spin_is_once_per_calendar_day() {
    let app = TestApp::new();
    let student = app.student("Kiran", None).await;

    app.clock.set(at(2025, 3, 10, 23, 59));
    let first = app.ledger().claim_spin(student.id).await.unwrap();
    assert_eq!(first.reward, SPIN_REWARD);
    assert_eq!(first.account.xp(), SPIN_REWARD);

    app.clock.set(at(2025, 3, 11, 0, 1));
    let second = app.ledger().claim_spin(student.id).await.unwrap();
    assert_eq!(second.account.xp(), 2 * SPIN_REWARD);

    app.clock.set(at(2025, 3, 11, 18, 0));
    let err = app.ledger().claim_spin(student.id).await.unwrap_err();
    assert!(matches!(err, PortError::AlreadyClaimedToday));
    assert_eq!(app.account(student.id).await.xp(), 2 * SPIN_REWARD);
}

#[tokio::test]
async fn spin_day_follows_the_configured_offset() {
    let app = TestApp::with_offset(FixedOffset::east_opt(5 * 3600 + 1800).unwrap());
    let student = app.student("Lata", None).await;

    // 18:00 UTC is 23:30 local; 18:45 UTC is already the next local day.
    app.clock.set(at(2025, 3, 10, 18, 0));
    app.ledger().claim_spin(student.id).await.unwrap();

    app.clock.set(at(2025, 3, 10, 18, 45));
    app.ledger().claim_spin(student.id).await.unwrap();

    app.clock.set(at(2025, 3, 10, 23, 0));
    let err = app.ledger().claim_spin(student.id).await.unwrap_err();
    assert!(matches!(err, PortError::AlreadyClaimedToday));
}

#[tokio::test]
async fn login_streak_tracks_consecutive_days() {
    let app = TestApp::new();
    let student = app.student("Mani", None).await;

    app.clock.set(at(2025, 3, 10, 8, 0));
    assert_eq!(app.ledger().record_login(student.id).await.unwrap().streak, 1);

    app.clock.set(at(2025, 3, 10, 21, 0));
    assert_eq!(app.ledger().record_login(student.id).await.unwrap().streak, 1);

    app.clock.set(at(2025, 3, 11, 7, 0));
    assert_eq!(app.ledger().record_login(student.id).await.unwrap().streak, 2);

    app.clock.set(at(2025, 3, 14, 7, 0));
    assert_eq!(app.ledger().record_login(student.id).await.unwrap().streak, 1);
}

#[tokio::test]
async fn goal_pays_once() {
    let app = TestApp::new();
    let student = app.student("Nadia", None).await;
    let goal_id = app.goal(student.id, 25).await;

    let (goal, account) = app.ledger().complete_goal(student.id, goal_id).await.unwrap();
    assert!(goal.completed);
    assert!(goal.completed_at.is_some());
    assert_eq!(account.xp(), 25);

    let err = app.ledger().complete_goal(student.id, goal_id).await.unwrap_err();
    assert!(matches!(err, PortError::AlreadyCompleted(_)));
    assert_eq!(app.account(student.id).await.xp(), 25);
}

#[tokio::test]
async fn another_accounts_goal_is_not_found() {
    let app = TestApp::new();
    let owner = app.student("Omar", None).await;
    let other = app.student("Priya", None).await;
    let goal_id = app.goal(owner.id, 25).await;

    let err = app.ledger().complete_goal(other.id, goal_id).await.unwrap_err();

    assert!(matches!(err, PortError::NotFound(_)));
    assert_eq!(app.account(owner.id).await.xp(), 0);
    assert_eq!(app.account(other.id).await.xp(), 0);
}

#[tokio::test]
async fn ending_a_session_credits_hours_and_default_xp() {
    let app = TestApp::new();
    let student = app.student("Quinn", None).await;
    let session = app
        .db
        .create_session(
            student.id,
            NewSession {
                kind: SessionKind::Pomodoro,
                duration_minutes: 30,
                subject: "Chemistry".into(),
            },
            app.clock.now(),
        )
        .await
        .unwrap();

    app.clock.advance(Duration::minutes(30));
    let (ended, account) = app.ledger().end_session(student.id, session.id, None).await.unwrap();

    assert!(ended.completed);
    assert_eq!(ended.xp_earned, 20);
    assert!((account.total_study_hours - 0.5).abs() < f64::EPSILON);
    assert_eq!(account.xp(), 20);

    let err = app
        .ledger()
        .end_session(student.id, session.id, Some(50))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::AlreadyCompleted(_)));
    assert_eq!(app.account(student.id).await.xp(), 20);
}

#[tokio::test]
async fn set_xp_can_lower_the_level() {
    let app = TestApp::new();
    let student = app.student("Rosa", None).await;
    set_xp(&app, student.id, 5200).await;
    assert_eq!(app.account(student.id).await.level(), Level::Expert);

    let account = app.ledger().set_xp(student.id, 499).await.unwrap();
    assert_eq!(account.level(), Level::Beginner);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_goal_completions_pay_exactly_once() {
    let app = TestApp::new();
    let student = app.student("Sana", None).await;
    let goal_id = app.goal(student.id, 40).await;
    let student_id = student.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = app.state.ledger.clone();
            tokio::spawn(async move { ledger.complete_goal(student_id, goal_id).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(matches!(e, PortError::AlreadyCompleted(_))),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(app.account(student.id).await.xp(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_quiz_credits_are_not_lost() {
    let app = TestApp::new();
    let student = app.student("Tariq", None).await;
    let questions = app.questions("History", Difficulty::Easy, 2).await;
    let student_id = student.id;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let ledger = app.state.ledger.clone();
            let answers = all_correct(&questions, 2);
            tokio::spawn(async move {
                ledger
                    .submit_quiz(
                        student_id,
                        QuizSubmission {
                            subject: "History".into(),
                            difficulty: Difficulty::Easy,
                            answers,
                            time_taken_secs: 10,
                        },
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(app.account(student.id).await.xp(), 10 * 30);
    assert_eq!(app.db.list_quiz_results(student.id, 20).await.unwrap().len(), 10);
}
