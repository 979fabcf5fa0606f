//! Quiz grading and the XP formula.

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{Answer, Difficulty, GradedAnswer, Question};

pub const XP_PER_CORRECT_ANSWER: u64 = 15;

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct: u32,
    pub total: u32,
    pub accuracy: u32,
    pub answers: Vec<GradedAnswer>,
}

/// Grades `answers` against the stored questions.
///
/// An answer whose question is not in `questions` counts as incorrect.
pub fn grade(answers: &[Answer], questions: &[Question]) -> Grade {
    let by_id: HashMap<Uuid, &Question> = questions.iter().map(|q| (q.id, q)).collect();

    let graded: Vec<GradedAnswer> = answers
        .iter()
        .map(|ans| {
            let question = by_id.get(&ans.question_id);
            GradedAnswer {
                question_id: ans.question_id,
                selected_option: ans.selected_option,
                correct: question.is_some_and(|q| q.answer == ans.selected_option),
                correct_option: question.map(|q| q.answer),
                explanation: question.map(|q| q.explanation.clone()).unwrap_or_default(),
            }
        })
        .collect();

    let total = graded.len() as u32;
    let correct = graded.iter().filter(|a| a.correct).count() as u32;

    Grade {
        correct,
        total,
        accuracy: accuracy_percent(correct, total),
        answers: graded,
    }
}

/// `round(correct / total * 100)`, halves rounding up. Zero when `total` is zero.
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (correct, total) = (u64::from(correct), u64::from(total));
    ((correct * 200 + total) / (2 * total)) as u32
}

/// XP paid for `correct` answers at `difficulty`.
///
/// Hard pays x1.5 and Challenge x2; fractional halves round to even, so
/// 5 correct on Hard pays 112.
pub fn quiz_xp(correct: u32, difficulty: Difficulty) -> u64 {
    let base = u64::from(correct) * XP_PER_CORRECT_ANSWER;
    match difficulty {
        Difficulty::Hard => (base as f64 * 1.5).round_ties_even() as u64,
        Difficulty::Challenge => base * 2,
        Difficulty::Easy | Difficulty::Moderate => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(answer: u8) -> Question {
        Question {
            id: Uuid::new_v4(),
            subject: "Science".to_string(),
            difficulty: Difficulty::Moderate,
            prompt: "?".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer,
            explanation: "because".to_string(),
            xp_reward: 10,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn grades_against_stored_answers() {
        let qs = vec![question(0), question(1), question(2)];
        let answers = vec![
            Answer { question_id: qs[0].id, selected_option: 0 },
            Answer { question_id: qs[1].id, selected_option: 3 },
            Answer { question_id: qs[2].id, selected_option: 2 },
        ];

        let g = grade(&answers, &qs);
        assert_eq!(g.correct, 2);
        assert_eq!(g.total, 3);
        assert_eq!(g.accuracy, 67);
        assert!(!g.answers[1].correct);
        assert_eq!(g.answers[1].correct_option, Some(1));
        assert_eq!(g.answers[1].explanation, "because");
    }

    #[test]
    fn unknown_question_counts_as_wrong() {
        let answers = vec![Answer { question_id: Uuid::new_v4(), selected_option: 0 }];
        let g = grade(&answers, &[]);
        assert_eq!(g.correct, 0);
        assert_eq!(g.total, 1);
        assert_eq!(g.answers[0].correct_option, None);
    }

    #[test]
    fn accuracy_rounds_half_up() {
        assert_eq!(accuracy_percent(4, 5), 80);
        assert_eq!(accuracy_percent(1, 8), 13);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(0, 0), 0);
    }

    #[test]
    fn difficulty_multipliers() {
        assert_eq!(quiz_xp(4, Difficulty::Moderate), 60);
        assert_eq!(quiz_xp(4, Difficulty::Easy), 60);
        assert_eq!(quiz_xp(5, Difficulty::Hard), 112);
        assert_eq!(quiz_xp(4, Difficulty::Hard), 90);
        assert_eq!(quiz_xp(3, Difficulty::Hard), 68);
        assert_eq!(quiz_xp(5, Difficulty::Challenge), 150);
        assert_eq!(quiz_xp(0, Difficulty::Challenge), 0);
    }
}
