use exam_core::model::{AnswerPolicy, ExamConfig, Question, QuestionId};
use exam_core::scoring::{GradeBand, GradeScale, Score};
use exam_core::time::{fixed_clock, fixed_now};
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::sessions::ReviewStatus;
use services::{
    Clock, CompletionReason, ExamRunner, ExamSession, Outcome, QuestionBank, ReviewFilter,
    SessionError, SessionPhase, StaticSource,
};

const BANK_JSON: &str = r#"[
    {"id": 1, "question": "Which extinguisher suits electrical fires?",
     "options": ["CO2", "Water", "Foam", "Wet chemical"], "correctAnswer": 0,
     "explanation": "CO2 does not conduct.", "category": "Extinguishers", "difficulty": "basic"},
    {"id": 2, "question": "Who appoints the responsible person?",
     "options": ["Fire service", "Employer", "Insurer", "Landlord"], "correctAnswer": 1,
     "category": "Law", "difficulty": "intermediate"},
    {"id": 3, "question": "Minimum evacuation drill frequency?",
     "options": ["Monthly", "Weekly", "Annually", "Never"], "correctAnswer": 2,
     "category": "Evacuation", "difficulty": "advanced"}
]"#;

fn ordered_bank() -> Vec<Question> {
    (0..3)
        .map(|i| {
            Question::new(
                QuestionId::new(i),
                format!("Q{i}"),
                vec!["a".into(), "b".into(), "c".into()],
                i as usize,
                "",
            )
            .unwrap()
        })
        .collect()
}

#[test]
fn answer_all_then_finish_scores_and_reviews() {
    let mut session = ExamSession::new(fixed_clock());
    session.start(ordered_bank()).unwrap();

    let _ = session.select_answer(0);
    let _ = session.go_next();
    let _ = session.select_answer(2);
    let _ = session.go_next();
    let _ = session.select_answer(2);
    assert_eq!(
        session.go_next(),
        Outcome::Completed(CompletionReason::Finished)
    );

    assert_eq!(session.phase(), SessionPhase::Completed);
    assert_eq!(
        session.score(),
        Score {
            correct: 2,
            total: 3,
            percentage: 67
        }
    );

    let incorrect = session.review(ReviewFilter::Incorrect);
    assert_eq!(incorrect.len(), 1);
    assert_eq!(incorrect[0].position, 1);
    assert_eq!(incorrect[0].selected, Some(2));
    assert_eq!(incorrect[0].status, ReviewStatus::Incorrect);
}

#[test]
fn review_partitions_every_position() {
    let mut session = ExamSession::new(fixed_clock());
    session.start(ordered_bank()).unwrap();
    let _ = session.select_answer(0);
    let _ = session.toggle_flag(2);
    let _ = session.submit();

    let correct = session.review(ReviewFilter::Correct).len();
    let incorrect = session.review(ReviewFilter::Incorrect).len();
    assert_eq!(correct + incorrect, session.review(ReviewFilter::All).len());
    assert_eq!(session.review(ReviewFilter::Unanswered).len(), 2);
    assert_eq!(session.review(ReviewFilter::Flagged)[0].number(), 3);
}

#[tokio::test]
async fn runner_runs_attempt_from_static_source() {
    let config = ExamConfig::from_json(
        r#"{
            "exam_id": "fire-safety-l2-m7",
            "title": "Level 2 Fire Safety Mock Exam 7",
            "total_questions": 3,
            "time_limit_secs": 2700,
            "pass_threshold": 70,
            "categories": ["Extinguishers", "Law", "Evacuation"]
        }"#,
    )
    .unwrap();
    let source = StaticSource::from_json(BANK_JSON).unwrap();
    let runner = ExamRunner::load(config, &source, Clock::fixed(fixed_now()))
        .await
        .unwrap();

    let mut session = runner.start_with_rng(&mut StdRng::seed_from_u64(11)).unwrap();
    assert_eq!(session.questions().len(), 3);
    assert_eq!(session.remaining_secs(), Some(2700));
    assert!(matches!(
        runner.results(&session),
        Err(SessionError::NotCompleted)
    ));

    while session.is_in_progress() {
        let correct = session.current_question().unwrap().correct_option();
        let _ = session.select_answer(correct);
        let _ = session.go_next();
    }

    let results = runner.results(&session).unwrap();
    assert_eq!(results.score.percentage, 100);
    assert!(results.passed);
    assert_eq!(results.grade.label, "Pass");
    assert_eq!(results.reason, CompletionReason::Finished);
    assert_eq!(runner.review(&session, ReviewFilter::Incorrect).len(), 0);
}

#[test]
fn grade_bands_from_config_drive_results() {
    let scale = GradeScale::new(
        vec![
            GradeBand::new(80, "Distinction", true),
            GradeBand::new(65, "Merit", true),
            GradeBand::new(60, "Pass", true),
        ],
        "Fail",
    )
    .unwrap();
    let config = ExamConfig::new("l3", "Level 3", 3)
        .unwrap()
        .with_grade_bands(scale);
    let bank = QuestionBank::new(ordered_bank()).unwrap();
    let runner = ExamRunner::new(config, bank, fixed_clock()).unwrap();

    let mut session = runner.start_with_rng(&mut StdRng::seed_from_u64(3)).unwrap();
    for _ in 0..2 {
        let correct = session.current_question().unwrap().correct_option();
        let _ = session.select_answer(correct);
        let _ = session.go_next();
    }
    let _ = session.submit();

    let results = runner.results(&session).unwrap();
    assert_eq!(results.score.percentage, 67);
    assert_eq!(results.grade.label, "Merit");
    assert_eq!(results.reason, CompletionReason::Submitted);
    assert_eq!(results.stats.unanswered, 1);
}

#[test]
fn require_answer_policy_from_config() {
    let config = ExamConfig::new("gated", "Gated", 3)
        .unwrap()
        .with_answer_policy(AnswerPolicy::RequireAnswer);
    let bank = QuestionBank::new(ordered_bank()).unwrap();
    let runner = ExamRunner::new(config, bank, fixed_clock()).unwrap();
    let mut session = runner.start_with_rng(&mut StdRng::seed_from_u64(8)).unwrap();

    assert!(!session.go_next().is_applied());
    let _ = session.select_answer(1);
    assert!(session.go_next().is_applied());
}

#[test]
fn restart_after_completion_starts_clean() {
    let bank = QuestionBank::new(ordered_bank()).unwrap();
    let runner = ExamRunner::new(
        ExamConfig::new("again", "Again", 2).unwrap(),
        bank,
        fixed_clock(),
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(21);
    let mut session = runner.start_with_rng(&mut rng).unwrap();
    let _ = session.select_answer(0);
    let _ = session.toggle_current_flag();
    let _ = session.submit();
    let first = runner.results(&session).unwrap();

    runner.restart_with_rng(&mut session, &mut rng).unwrap();

    assert_ne!(session.id(), first.session_id);
    assert_eq!(session.phase(), SessionPhase::InProgress);
    assert_eq!(session.stats().answered, 0);
    assert_eq!(session.stats().flagged, 0);
    assert_eq!(session.current_position(), 0);
}
