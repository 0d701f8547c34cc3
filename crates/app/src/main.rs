use std::fmt;
use std::sync::Arc;

use log::warn;
use quiz_core::countdown::format_clock;
use quiz_core::model::{AttemptId, QuizId, ResultSummary, SessionEnding, SessionTag};
use quiz_core::scoring::Verdict;
use services::sources::builtin_quiz;
use services::{
    BuiltinSource, CatalogSource, Clock, FallbackSource, GeneratorSource, NullSink,
    QuestionSource, QuizCriteria, QuizHistoryService, QuizLoopError, QuizLoopService, QuizRun,
    QuizSettings, RepositorySink, ResultSink, SessionError, SubmissionStatus, TickEvent,
};
use storage::repository::{QuizRepository, Storage};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Args {
    db_url: String,
    quiz_id: QuizId,
    language: String,
    generate: bool,
    untimed: bool,
    track: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play    [--db <sqlite_url>] [--quiz-id <id>] [--untimed] [--no-track]");
    eprintln!("  cargo run -p app -- play    --generate [--language <lang>]");
    eprintln!("  cargo run -p app -- seed    [--db <sqlite_url>] [--quiz-id <id>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--quiz-id <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --quiz-id 1");
    eprintln!("  --language en");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_ID, QUIZ_LANGUAGE");
    eprintln!("  QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL (for --generate)");
    eprintln!("  RUST_LOG (e.g. RUST_LOG=services=debug)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Seed,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "seed" => Some(Self::Seed),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("quiz.sqlite3".into()), normalize_sqlite_url);
        let mut quiz_id = std::env::var("QUIZ_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| QuizId::new(1), QuizId::new);
        let mut language = std::env::var("QUIZ_LANGUAGE").unwrap_or_else(|_| "en".into());
        let mut generate = false;
        let mut untimed = false;
        let mut track = true;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    quiz_id = QuizId::new(parsed);
                }
                "--language" => language = require_value(args, "--language")?,
                "--generate" => generate = true,
                "--untimed" => untimed = true,
                "--no-track" => track = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            quiz_id,
            language,
            generate,
            untimed,
            track,
        })
    }

    fn criteria(&self) -> QuizCriteria {
        QuizCriteria::new(self.language.clone()).with_quiz_id(self.quiz_id)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so the library crates never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Play => play(&parsed, &storage).await,
        Command::Seed => {
            let quiz = builtin_quiz(parsed.quiz_id)?;
            storage.quizzes.upsert_quiz(&quiz).await?;
            println!(
                "seeded quiz {} \"{}\" with {} questions into {}",
                quiz.id(),
                quiz.title(),
                quiz.questions().len(),
                parsed.db_url
            );
            Ok(())
        }
        Command::History => {
            let tag = SessionTag::for_quiz(parsed.quiz_id);
            print_history(&QuizHistoryService::new(storage.results), &tag).await
        }
    }
}

fn build_source(args: &Args, storage: &Storage) -> Arc<dyn QuestionSource> {
    if !args.generate {
        return Arc::new(CatalogSource::new(Arc::clone(&storage.quizzes)));
    }
    let generator = GeneratorSource::from_env();
    if !generator.enabled() {
        warn!("QUIZ_AI_API_KEY is not set; playing the built-in questions");
    }
    Arc::new(FallbackSource::new(Arc::new(generator), Arc::new(BuiltinSource)))
}

async fn play(args: &Args, storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn ResultSink> = if args.track {
        Arc::new(RepositorySink::new(Arc::clone(&storage.results)))
    } else {
        Arc::new(NullSink)
    };
    let settings = QuizSettings {
        timed: !args.untimed,
        ..QuizSettings::default()
    };
    let loop_svc = QuizLoopService::new(Clock::default_clock(), build_source(args, storage), sink)
        .with_settings(settings);
    let criteria = args.criteria();
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    let Some(mut run) = begin_with_retry(&loop_svc, &criteria, &mut input).await? else {
        return Ok(());
    };
    render_question(&run);
    let mut shown: Option<AttemptId> = None;

    loop {
        // Results are rendered here only, so a timeout whose tick was cut
        // short by a keypress still reaches the screen.
        if let Some(summary) = unshown_result(&run, shown).cloned() {
            run.ensure_submitted().await;
            if summary.ending() == SessionEnding::TimedOut {
                println!();
                println!("Time's up!");
            }
            render_result(&run, &summary);
            shown = Some(summary.attempt_id());
        }
        if run.session().is_complete() {
            println!("Press r to play again or q to quit.");
        }

        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    run.abandon();
                    return Ok(());
                };
                match line.trim() {
                    "q" => {
                        run.abandon();
                        return Ok(());
                    }
                    "n" => match run.advance().await {
                        Ok(Some(_)) => {}
                        Ok(None) => render_question(&run),
                        Err(err) => println!("{}", describe(&err)),
                    },
                    "r" if run.session().is_complete() => {
                        match loop_svc.refresh(&mut run, &criteria).await {
                            Ok(()) => render_question(&run),
                            Err(err) => println!("Could not load new questions: {err}"),
                        }
                    }
                    other => match other.parse::<usize>() {
                        Ok(choice) if choice > 0 => answer(&mut run, choice - 1),
                        _ => println!("Type an option number, n for next, or q to quit."),
                    },
                }
            }
            Some(event) = run.next_tick(), if run.has_timer() => match event {
                TickEvent::Remaining(secs) if secs <= 5 || secs % 30 == 0 => {
                    println!("  ({} left)", format_clock(secs));
                }
                TickEvent::Remaining(_) | TickEvent::TimedOut(_) => {}
            },
        }
    }
}

async fn begin_with_retry(
    loop_svc: &QuizLoopService,
    criteria: &QuizCriteria,
    input: &mut Input,
) -> Result<Option<QuizRun>, Box<dyn std::error::Error>> {
    loop {
        match loop_svc.begin(criteria).await {
            Ok(run) => return Ok(Some(run)),
            Err(QuizLoopError::Source(err)) if err.is_retryable() => {
                println!("Could not load questions: {err}");
                println!("Retry? [y/N]");
                let Some(line) = input.next_line().await? else {
                    return Ok(None);
                };
                if !line.trim().eq_ignore_ascii_case("y") {
                    return Ok(None);
                }
            }
            Err(QuizLoopError::Source(services::SourceError::NotFound(id))) => {
                println!("Quiz {id} is not in the catalog. Run `seed --quiz-id {id}` first.");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// The finished result of this run that has not been put on screen yet.
fn unshown_result(run: &QuizRun, shown: Option<AttemptId>) -> Option<&ResultSummary> {
    let summary = run.session().summary()?;
    (shown != Some(summary.attempt_id())).then_some(summary)
}

fn answer(run: &mut QuizRun, option: usize) {
    match run.select_answer(option) {
        Ok(feedback) if feedback.is_correct => {
            let cheer = feedback.encouragement.as_deref().unwrap_or("Correct!");
            println!("✓ {cheer}");
            println!("Press n for the next question.");
        }
        Ok(feedback) => {
            let correct = run
                .session()
                .questions()
                .get(feedback.question_index)
                .and_then(|q| q.options().get(feedback.correct_index))
                .map_or("?", String::as_str);
            println!("✗ Not quite. The answer was: {correct}");
            println!("Press n for the next question.");
        }
        Err(err) => println!("{}", describe(&err)),
    }
}

fn describe(err: &SessionError) -> String {
    match err {
        SessionError::AlreadyAnswered { .. } => "You already answered this one. Press n.".into(),
        SessionError::OptionOutOfRange { len, .. } => format!("Pick a number from 1 to {len}."),
        SessionError::InvalidTransition { .. } => "Answer the question first.".into(),
        other => other.to_string(),
    }
}

fn render_question(run: &QuizRun) {
    let session = run.session();
    let Some(question) = session.current_question() else {
        return;
    };
    let progress = session.progress();
    println!();
    match progress.time_remaining {
        Some(secs) => println!(
            "{}  [{}]  {}",
            run.title(),
            progress.position_label(),
            format_clock(secs)
        ),
        None => println!("{}  [{}]", run.title(), progress.position_label()),
    }
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
}

fn render_result(run: &QuizRun, summary: &ResultSummary) {
    println!();
    println!(
        "You scored {}/{} ({}%).",
        summary.score(),
        summary.total(),
        summary.percentage()
    );
    match Verdict::for_score(summary.score(), summary.total()) {
        Verdict::Perfect => println!("Perfect score! You're a civic sense champion!"),
        Verdict::KeepTrying => println!("Keep learning and try again!"),
    }

    for (i, question) in run.session().questions().iter().enumerate() {
        let mark = match run.session().is_answer_correct(i) {
            Some(true) => "✓",
            Some(false) => "✗",
            None => "-",
        };
        println!("  {mark} {}", question.prompt());
    }

    if let SubmissionStatus::Submitted(receipt) = run.submission() {
        if let Some(id) = receipt.id {
            println!("Saved as result #{id}.");
        }
    }
}

async fn print_history(
    history: &QuizHistoryService,
    tag: &SessionTag,
) -> Result<(), Box<dyn std::error::Error>> {
    let items = history.list_recent(None).await?;
    if items.is_empty() {
        println!("No results yet.");
        return Ok(());
    }

    println!("Recent results:");
    for item in &items {
        let ending = match item.ending {
            SessionEnding::Finished => "",
            SessionEnding::TimedOut => " (timed out)",
        };
        println!(
            "  #{:<4} {}  {:<20} {}/{} ({}%){ending}",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.session_tag.as_str(),
            item.score,
            item.total,
            item.percentage
        );
    }

    let trend = history.score_trend(Some(tag)).await?;
    if !trend.is_empty() {
        let series: Vec<String> = trend.iter().map(|p| format!("{}%", p.percentage)).collect();
        println!("Trend for {tag}: {}", series.join(" → "));
    }
    Ok(())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::time::fixed_clock;
    use services::{ResultReceipt, SinkError};
    use std::time::Duration;

    struct StalledSink;

    #[async_trait]
    impl ResultSink for StalledSink {
        async fn submit_result(&self, _: &ResultSummary) -> Result<ResultReceipt, SinkError> {
            std::future::pending().await
        }
    }

    fn loop_svc(sink: Arc<dyn ResultSink>, settings: QuizSettings) -> QuizLoopService {
        QuizLoopService::new(fixed_clock(), Arc::new(BuiltinSource), sink).with_settings(settings)
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_interrupted_mid_submission_is_still_rendered() {
        let svc = loop_svc(
            Arc::new(StalledSink),
            QuizSettings {
                seconds_per_question: 1,
                timed: true,
            },
        );
        let mut run = svc.begin(&QuizCriteria::default()).await.unwrap();
        assert!(unshown_result(&run, None).is_none());

        // Stands in for a keypress winning the select while the sink is busy.
        let ticking = async { while run.next_tick().await.is_some() {} };
        assert!(tokio::time::timeout(Duration::from_secs(30), ticking).await.is_err());

        assert_eq!(run.submission(), &SubmissionStatus::Idle);
        let summary = unshown_result(&run, None).expect("timed-out result pending");
        assert_eq!(summary.ending(), SessionEnding::TimedOut);
        let attempt = summary.attempt_id();
        assert!(unshown_result(&run, Some(attempt)).is_none());
    }

    #[tokio::test]
    async fn restarted_run_has_a_fresh_result_to_show() {
        let svc = loop_svc(
            Arc::new(NullSink),
            QuizSettings {
                seconds_per_question: 20,
                timed: false,
            },
        );
        let mut run = svc.begin(&QuizCriteria::default()).await.unwrap();
        while !run.session().is_complete() {
            let correct = run.session().current_question().unwrap().correct_option_index();
            run.select_answer(correct).unwrap();
            run.advance().await.unwrap();
        }
        let first = unshown_result(&run, None).unwrap().attempt_id();

        run.restart().await.unwrap();
        assert!(unshown_result(&run, Some(first)).is_none());
        while !run.session().is_complete() {
            run.select_answer(0).unwrap();
            run.advance().await.unwrap();
        }
        let second = unshown_result(&run, Some(first)).unwrap();
        assert_ne!(second.attempt_id(), first);
    }
}
