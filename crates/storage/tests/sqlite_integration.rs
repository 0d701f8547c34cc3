use chrono::Duration;
use quiz_core::model::{
    AttemptId, QuestionDraft, QuestionId, Quiz, QuizDifficulty, QuizId, ResultSummary,
    SessionEnding, SessionTag,
};
use quiz_core::time::fixed_now;
use storage::repository::{QuizRepository, QuizResultRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_quiz(id: u64, question_count: u64) -> Quiz {
    let questions = (1..=question_count)
        .map(|qid| {
            QuestionDraft::new(
                format!("Question {qid}"),
                vec!["Yes".into(), "No".into(), "Maybe".into()],
                i64::try_from(qid % 3).unwrap(),
            )
            .with_encouragement("Nice!")
            .validate(QuestionId::new(qid))
            .unwrap()
        })
        .collect();
    Quiz::new(
        QuizId::new(id),
        format!("Quiz {id}"),
        QuizDifficulty::Hard,
        Some(90),
        questions,
    )
    .unwrap()
}

fn build_result(tag: &str, offset_secs: i64, answers: Vec<Option<usize>>, score: u32) -> ResultSummary {
    let started = fixed_now() + Duration::seconds(offset_secs);
    let total = u32::try_from(answers.len()).unwrap();
    let answered = u32::try_from(answers.iter().flatten().count()).unwrap();
    ResultSummary::from_persisted(
        AttemptId::generate(),
        SessionTag::new(tag),
        score,
        total,
        answered,
        answers,
        SessionEnding::TimedOut,
        started,
        started + Duration::seconds(30),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_round_trips_quiz_with_ordered_questions() {
    let repo = connect("memdb_quiz_roundtrip").await;
    let quiz = build_quiz(1, 4);
    repo.upsert_quiz(&quiz).await.unwrap();

    let fetched = repo.get_quiz(QuizId::new(1)).await.unwrap();
    assert_eq!(fetched, quiz);
    assert_eq!(fetched.time_limit_secs(), Some(90));
    assert_eq!(fetched.questions()[0].encouragement(), Some("Nice!"));

    // Replacing the quiz drops questions that are no longer present.
    let smaller = build_quiz(1, 2);
    repo.upsert_quiz(&smaller).await.unwrap();
    let fetched = repo.get_quiz(QuizId::new(1)).await.unwrap();
    assert_eq!(fetched.questions().len(), 2);

    repo.upsert_quiz(&build_quiz(2, 1)).await.unwrap();
    let listed = repo.list_quizzes(1).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), QuizId::new(1));
}

#[tokio::test]
async fn sqlite_missing_quiz_is_not_found() {
    let repo = connect("memdb_quiz_missing").await;
    let err = repo.get_quiz(QuizId::new(404)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_results_persist_and_list_newest_first() {
    let repo = connect("memdb_results").await;

    let older = build_result("quiz:1", 0, vec![Some(0), None, Some(2)], 1);
    let other = build_result("quiz:2", 60, vec![Some(1)], 1);
    let newer = build_result("quiz:1", 120, vec![Some(0), Some(1), Some(2)], 3);

    let older_id = repo.append_result(&older).await.unwrap();
    repo.append_result(&other).await.unwrap();
    let newer_id = repo.append_result(&newer).await.unwrap();

    let fetched = repo.get_result(older_id).await.unwrap();
    assert_eq!(fetched, older);
    assert_eq!(fetched.answers(), &[Some(0), None, Some(2)]);

    let tag = SessionTag::new("quiz:1");
    let rows = repo.list_recent_results(Some(&tag), 10).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer_id, older_id]);

    let all = repo.list_recent_results(None, 2).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, newer_id);
}

#[tokio::test]
async fn sqlite_rejects_duplicate_attempt() {
    let repo = connect("memdb_results_dupe").await;
    let result = build_result("quiz:1", 0, vec![Some(0)], 0);
    repo.append_result(&result).await.unwrap();
    let err = repo.append_result(&result).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}
