//! Quiz session engine.
//!
//! A session walks its plan one question at a time:
//! `Presenting(i)` -> `Grading(i)` -> `Presenting(i + 1)` ... -> `Completed`.
//! Positions are 1-based.

use crate::db::QuizStore;
use crate::error::{QuizError, QuizResult};
use crate::models::{PerformanceRecord, Player, Question};
use crate::sampler::QuizPlan;
use crate::stats::{self, StatsReport, UpsertStrategy};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a response to question `i`.
    Presenting(usize),
    /// Question `i` was answered; feedback is on screen.
    Grading(usize),
    Completed,
}

/// A question with its options in presentation order.
#[derive(Debug, Clone)]
pub struct PresentedQuestion {
    pub question: Question,
    pub options: Vec<String>,
}

impl PresentedQuestion {
    /// Shuffle the correct answer in with the two incorrect ones.
    pub fn new<R: Rng + ?Sized>(question: Question, rng: &mut R) -> Self {
        let mut options = question.options();
        options.shuffle(rng);
        Self { question, options }
    }

    pub fn grade(&self, response: &str) -> bool {
        grade(&self.options, &self.question.correct_answer, response)
    }
}

/// Whether `response` picks the correct option.
///
/// Only an integer in `1..=options.len()` selects anything; every other
/// input counts as a wrong answer.
pub fn grade(options: &[String], correct_answer: &str, response: &str) -> bool {
    match response.trim().parse::<usize>() {
        Ok(choice) if (1..=options.len()).contains(&choice) => options[choice - 1] == correct_answer,
        _ => false,
    }
}

/// Result of grading one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub correct: bool,
    pub correct_answer: String,
}

/// Final score handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSummary {
    pub correct: u32,
    /// The question count the player asked for.
    pub requested: usize,
    /// Questions actually asked.
    pub answered: u32,
    pub performance: PerformanceRecord,
    /// `None` for guests.
    pub stats: Option<StatsReport>,
}

#[derive(Debug)]
pub struct QuizSession<R> {
    plan: QuizPlan,
    rng: R,
    state: SessionState,
    planned: usize,
    requested: usize,
    current: Option<PresentedQuestion>,
    last_outcome: Option<Outcome>,
    performance: PerformanceRecord,
}

impl<R: Rng> QuizSession<R> {
    /// Start on the first question of `plan`.
    ///
    /// An empty plan is fatal for the session.
    pub fn start(mut plan: QuizPlan, requested: usize, mut rng: R) -> QuizResult<Self> {
        let planned = plan.len();
        let first = plan.next().ok_or(QuizError::NoQuestions)?;
        let current = PresentedQuestion::new(first, &mut rng);

        tracing::info!(planned, requested, "quiz session started");
        Ok(Self {
            plan,
            rng,
            state: SessionState::Presenting(1),
            planned,
            requested,
            current: Some(current),
            last_outcome: None,
            performance: PerformanceRecord::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current(&self) -> Option<&PresentedQuestion> {
        self.current.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    /// Number of questions in this run.
    pub fn planned(&self) -> usize {
        self.planned
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn performance(&self) -> &PerformanceRecord {
        &self.performance
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Grade a response to the question being presented.
    ///
    /// Returns `None` outside `Presenting`.
    pub fn submit(&mut self, response: &str) -> Option<&Outcome> {
        let SessionState::Presenting(position) = self.state else {
            return None;
        };
        let presented = self.current.as_ref()?;

        let correct = presented.grade(response);
        self.performance.record(presented.question.category_id, correct);
        tracing::debug!(
            position,
            question = presented.question.id,
            category = presented.question.category_id,
            correct,
            "graded response"
        );

        self.last_outcome = Some(Outcome {
            correct,
            correct_answer: presented.question.correct_answer.clone(),
        });
        self.state = SessionState::Grading(position);
        self.last_outcome.as_ref()
    }

    /// Leave `Grading` for the next question, or complete the session.
    pub fn advance(&mut self) -> SessionState {
        let SessionState::Grading(position) = self.state else {
            return self.state;
        };

        match self.plan.next() {
            Some(question) => {
                self.current = Some(PresentedQuestion::new(question, &mut self.rng));
                self.state = SessionState::Presenting(position + 1);
            }
            None => {
                self.current = None;
                self.state = SessionState::Completed;
                tracing::info!(
                    correct = self.performance.total_correct(),
                    answered = self.performance.total_attempted(),
                    "quiz session completed"
                );
            }
        }
        self.last_outcome = None;
        self.state
    }

    /// Report the score and, for signed-in players, persist the tallies.
    ///
    /// Consumes the session so its tallies are flushed at most once. An
    /// incomplete session is handed back unchanged.
    pub fn finish<S>(self, player: &Player, store: &S, strategy: UpsertStrategy) -> Result<QuizSummary, Self>
    where
        S: QuizStore + ?Sized,
    {
        if !self.is_complete() {
            return Err(self);
        }

        let stats = player
            .user_id()
            .map(|user| stats::apply(store, user, &self.performance, strategy));

        Ok(QuizSummary {
            correct: self.performance.total_correct(),
            requested: self.requested,
            answered: self.performance.total_attempted(),
            performance: self.performance,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{populated, RecordingStore};
    use crate::models::{CategorySelection, User};
    use crate::sampler;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn question(id: i64, category: i64) -> Question {
        Question {
            id,
            category_id: category,
            text: format!("Question {}", id),
            correct_answer: format!("right {}", id),
            incorrect_answers: [format!("wrong {}a", id), format!("wrong {}b", id)],
        }
    }

    fn correct_response(session: &QuizSession<StdRng>) -> String {
        let presented = session.current().unwrap();
        let index = presented
            .options
            .iter()
            .position(|o| *o == presented.question.correct_answer)
            .unwrap();
        (index + 1).to_string()
    }

    fn member(id: i64) -> Player {
        Player::Member(User { id, username: format!("user{}", id), is_admin: false })
    }

    /// Answer every question, correctly when `pattern` says so.
    fn play(session: &mut QuizSession<StdRng>, pattern: impl Fn(usize) -> bool) {
        let mut n = 0;
        while !session.is_complete() {
            let response = if pattern(n) { correct_response(session) } else { "x".to_string() };
            session.submit(&response).unwrap();
            session.advance();
            n += 1;
        }
    }

    #[test]
    fn test_grade_responses() {
        let opts = options(&["Paris", "Lyon", "Nice"]);
        assert!(grade(&opts, "Paris", "1"));
        assert!(grade(&opts, "Paris", " 1 "));
        assert!(!grade(&opts, "Paris", "2"));
        assert!(!grade(&opts, "Paris", "abc"));
        assert!(!grade(&opts, "Paris", "0"));
        assert!(!grade(&opts, "Paris", "4"));
        assert!(!grade(&opts, "Paris", ""));
        assert!(!grade(&opts, "Paris", "-1"));
    }

    proptest! {
        #[test]
        fn test_grade_never_panics(response in ".*") {
            let opts = options(&["Paris", "Lyon", "Nice"]);
            let graded = grade(&opts, "Paris", &response);
            prop_assert!(!graded || response.trim().parse::<usize>() == Ok(1));
        }
    }

    #[test]
    fn test_presented_options_are_a_permutation() {
        let mut rng = StdRng::seed_from_u64(3);
        let q = question(1, 1);
        let presented = PresentedQuestion::new(q.clone(), &mut rng);
        let mut shown = presented.options.clone();
        let mut expected = q.options();
        shown.sort();
        expected.sort();
        assert_eq!(shown, expected);
    }

    #[test]
    fn test_empty_plan_is_fatal() {
        let result = QuizSession::start(QuizPlan::new(Vec::new()), 5, StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(QuizError::NoQuestions)));
    }

    #[test]
    fn test_state_machine() {
        let plan = QuizPlan::new(vec![question(1, 1), question(2, 1)]);
        let mut session = QuizSession::start(plan, 2, StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(session.state(), SessionState::Presenting(1));
        assert!(session.last_outcome().is_none());
        assert_eq!(session.advance(), SessionState::Presenting(1));

        let response = correct_response(&session);
        assert!(session.submit(&response).unwrap().correct);
        assert_eq!(session.state(), SessionState::Grading(1));
        assert!(session.submit("1").is_none());

        assert_eq!(session.advance(), SessionState::Presenting(2));
        let outcome = session.submit("nope").unwrap().clone();
        assert!(!outcome.correct);
        assert_eq!(outcome.correct_answer, "right 2");

        assert_eq!(session.advance(), SessionState::Completed);
        assert!(session.current().is_none());
        assert_eq!(session.advance(), SessionState::Completed);
    }

    #[test]
    fn test_performance_per_category() {
        let plan = QuizPlan::new(vec![question(1, 1), question(2, 2), question(3, 1)]);
        let mut session = QuizSession::start(plan, 3, StdRng::seed_from_u64(8)).unwrap();
        play(&mut session, |n| n != 1);

        let performance = session.performance();
        assert_eq!(performance.total_attempted(), 3);
        assert_eq!(performance.total_correct(), 2);
        for (_, tally) in performance.iter() {
            assert!(tally.correct <= tally.attempted);
        }
    }

    #[test]
    fn test_finish_before_completion() {
        let db = populated(&[1]);
        db.insert_user("ada", "h", "s", false).unwrap();
        let plan = QuizPlan::new(vec![question(1, 1)]);
        let session = QuizSession::start(plan, 1, StdRng::seed_from_u64(1)).unwrap();

        let mut session = session
            .finish(&member(1), &db, UpsertStrategy::ReadThenWrite)
            .unwrap_err();
        assert_eq!(session.state(), SessionState::Presenting(1));
        assert!(db.user_stat(1, 1).unwrap().is_none());

        play(&mut session, |_| false);
        let summary = session.finish(&member(1), &db, UpsertStrategy::ReadThenWrite).unwrap();
        assert_eq!(summary.answered, 1);
    }

    #[test]
    fn test_member_session_flushes_once() {
        let db = populated(&[2]);
        db.insert_user("ada", "h", "s", false).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let plan = sampler::sample(&db, &mut rng, &CategorySelection::new([1]), 2).unwrap();
        let mut session = QuizSession::start(plan, 2, StdRng::seed_from_u64(4)).unwrap();
        play(&mut session, |_| false);

        // `finish` takes the session by value, so there is no second flush.
        let summary = session.finish(&member(1), &db, UpsertStrategy::ReadThenWrite).unwrap();
        assert_eq!(summary.stats.unwrap().written, 1);
        let tally = db.user_stat(1, 1).unwrap().unwrap();
        assert_eq!(tally.attempted, 2);
        assert_eq!(tally.correct, 0);
    }

    #[test]
    fn test_guest_quiz_writes_nothing() {
        let db = populated(&[5, 5]);
        let store = RecordingStore::new(&db);
        let mut rng = StdRng::seed_from_u64(11);

        let plan = sampler::sample(&store, &mut rng, &CategorySelection::new([1, 2]), 5).unwrap();
        let mut session = QuizSession::start(plan, 5, StdRng::seed_from_u64(12)).unwrap();
        play(&mut session, |_| true);

        let summary = session.finish(&Player::Guest, &store, UpsertStrategy::ReadThenWrite).unwrap();
        assert_eq!(summary.correct, 5);
        assert_eq!(summary.requested, 5);
        assert!(summary.stats.is_none());
        assert!(store.writes().is_empty());
        assert!(store.reads().is_empty());
    }

    #[test]
    fn test_member_quiz_upserts_once_per_category() {
        let db = populated(&[5, 5, 5]);
        db.insert_user("ada", "h", "s", false).unwrap();
        let user = db.find_credentials("ada").unwrap().unwrap().user;

        let store = RecordingStore::new(&db);
        let mut rng = StdRng::seed_from_u64(21);
        let plan = sampler::sample(&store, &mut rng, &CategorySelection::new([1, 3]), 4).unwrap();
        let mut session = QuizSession::start(plan, 4, StdRng::seed_from_u64(22)).unwrap();
        play(&mut session, |n| n % 2 == 0);

        let player = Player::Member(user.clone());
        let summary = session.finish(&player, &store, UpsertStrategy::ReadThenWrite).unwrap();
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.answered, 4);
        assert_eq!(store.writes().len(), 2);

        let first = db.user_stat(user.id, 1).unwrap().unwrap();
        let third = db.user_stat(user.id, 3).unwrap().unwrap();
        assert_eq!(first.attempted + third.attempted, 4);
        assert_eq!(first.correct + third.correct, 2);
        assert!(db.user_stat(user.id, 2).unwrap().is_none());
    }

    #[test]
    fn test_short_plan_reports_requested_total() {
        let db = populated(&[2]);
        db.insert_user("bo", "h", "s", false).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let plan = sampler::sample(&db, &mut rng, &CategorySelection::new([1]), 10).unwrap();
        let mut session = QuizSession::start(plan, 10, StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(session.planned(), 2);
        play(&mut session, |_| true);

        let summary = session.finish(&member(1), &db, UpsertStrategy::Atomic).unwrap();
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.answered, 2);
        assert_eq!(summary.requested, 10);
    }
}
