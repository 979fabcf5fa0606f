pub mod domain;
pub mod economy;
pub mod ledger;
pub mod ports;

pub use domain::{
    Account, AccountCredentials, Analytics, Answer, Difficulty, Experience, Goal, GoalKind,
    GoalUpdate, GradedAnswer, Level, NewAccount, NewGoal, NewQuestion, NewSession, ProfileUpdate,
    Question, QuizResult, QuizSubmission, Role, SessionKind, StudySession,
};
pub use ledger::{Registration, RewardLedger};
pub use ports::{
    AccountMutation, ChatReply, ChatService, Clock, DatabaseService, GoalMutation, PortError,
    PortResult, ReplySource, SessionMutation, SystemClock,
};
