use std::collections::HashSet;

use exam_core::model::{Question, QuestionId};
use exam_core::time::fixed_clock;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::sessions::select;
use services::{ExamSession, Outcome, ReviewFilter, SessionPhase};

const CATEGORIES: [&str; 3] = ["Fire", "Law", "Evacuation"];

fn bank(len: usize, option_count: usize) -> Vec<Question> {
    (0..len)
        .map(|i| {
            Question::new(
                QuestionId::new(i as u64),
                format!("Q{i}"),
                (0..option_count).map(|o| format!("option {o}")).collect(),
                i % option_count,
                "",
            )
            .unwrap()
            .with_category(CATEGORIES[i % CATEGORIES.len()])
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Select(usize),
    Next,
    Previous,
    GoTo(usize),
    Flag,
    NextFlagged,
    Tick,
    Submit,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..6usize).prop_map(Action::Select),
        Just(Action::Next),
        Just(Action::Previous),
        (0..12usize).prop_map(Action::GoTo),
        Just(Action::Flag),
        Just(Action::NextFlagged),
        Just(Action::Tick),
        Just(Action::Submit),
    ]
}

fn apply(session: &mut ExamSession, action: Action) -> Outcome {
    match action {
        Action::Select(option) => session.select_answer(option),
        Action::Next => session.go_next(),
        Action::Previous => session.go_previous(),
        Action::GoTo(position) => session.go_to(position),
        Action::Flag => session.toggle_current_flag(),
        Action::NextFlagged => session.next_flagged(),
        Action::Tick => session.tick(),
        Action::Submit => session.submit(),
    }
}

proptest! {
    #[test]
    fn selection_is_distinct_and_bounded(
        bank_len in 0..40usize,
        count in 0..50usize,
        seed in any::<u64>(),
    ) {
        let bank = bank(bank_len, 4);
        let selection = select(&bank, count, None, &mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(selection.len(), count.min(bank_len));
        let ids: HashSet<_> = selection.questions().iter().map(Question::id).collect();
        prop_assert_eq!(ids.len(), selection.len());
        let bank_ids: HashSet<_> = bank.iter().map(Question::id).collect();
        prop_assert!(ids.is_subset(&bank_ids));
    }

    #[test]
    fn balanced_selection_never_exceeds_request(
        bank_len in 0..40usize,
        count in 0..30usize,
        seed in any::<u64>(),
    ) {
        let bank = bank(bank_len, 4);
        let categories: Vec<String> = CATEGORIES
            .iter()
            .chain(&["Fire", "Law"])
            .map(|c| (*c).to_owned())
            .collect();
        let selection = select(&bank, count, Some(&categories), &mut StdRng::seed_from_u64(seed));

        prop_assert!(selection.len() <= count);
        let ids: HashSet<_> = selection.questions().iter().map(Question::id).collect();
        prop_assert_eq!(ids.len(), selection.len());
    }

    #[test]
    fn cursor_and_answers_stay_in_bounds(
        len in 1..8usize,
        limit in 0..5u32,
        actions in proptest::collection::vec(action(), 0..60),
    ) {
        let questions = bank(len, 4);
        let mut session = ExamSession::new(fixed_clock()).with_time_limit_secs(limit);
        session.start(questions).unwrap();

        for action in actions {
            let _ = apply(&mut session, action);
            prop_assert!(session.current_position() < len);
            prop_assert!(session.answers().keys().all(|p| *p < len));
            prop_assert!(session.answers().values().all(|o| *o < 4));
            prop_assert!(session.flagged().iter().all(|p| *p < len));
            if let Some(remaining) = session.remaining_secs() {
                prop_assert!(remaining <= limit);
            }
        }
    }

    #[test]
    fn completed_session_never_changes(
        len in 1..6usize,
        before in proptest::collection::vec(action(), 0..20),
        after in proptest::collection::vec(action(), 1..30),
    ) {
        let mut session = ExamSession::new(fixed_clock()).with_time_limit_secs(30);
        session.start(bank(len, 4)).unwrap();
        for action in before {
            let _ = apply(&mut session, action);
        }
        let _ = session.submit();
        prop_assert_eq!(session.phase(), SessionPhase::Completed);

        let answers = session.answers().clone();
        let flagged = session.flagged().clone();
        let position = session.current_position();
        let remaining = session.remaining_secs();
        let score = session.score();
        let reason = session.completion_reason();

        for action in after {
            prop_assert!(!apply(&mut session, action).is_applied());
        }

        prop_assert_eq!(session.answers(), &answers);
        prop_assert_eq!(session.flagged(), &flagged);
        prop_assert_eq!(session.current_position(), position);
        prop_assert_eq!(session.remaining_secs(), remaining);
        prop_assert_eq!(session.score(), score);
        prop_assert_eq!(session.completion_reason(), reason);
    }

    #[test]
    fn review_filters_partition_the_attempt(
        len in 1..10usize,
        actions in proptest::collection::vec(action(), 0..40),
    ) {
        let mut session = ExamSession::new(fixed_clock());
        session.start(bank(len, 4)).unwrap();
        for action in actions {
            let _ = apply(&mut session, action);
        }
        let _ = session.submit();

        let positions = |mode: ReviewFilter| -> HashSet<usize> {
            session.review(mode).iter().map(|item| item.position).collect()
        };
        let all = positions(ReviewFilter::All);
        let correct = positions(ReviewFilter::Correct);
        let incorrect = positions(ReviewFilter::Incorrect);

        prop_assert_eq!(all.len(), len);
        prop_assert!(correct.is_disjoint(&incorrect));
        prop_assert_eq!(correct.union(&incorrect).count(), len);
        prop_assert!(positions(ReviewFilter::Unanswered).is_subset(&incorrect));
        prop_assert_eq!(correct.len() as u32, session.score().correct);
        let flagged: HashSet<usize> = session.flagged().iter().copied().collect();
        prop_assert_eq!(positions(ReviewFilter::Flagged), flagged);
    }
}
