use std::fmt;
use std::io::BufRead;

use quiz_core::model::{
    AttemptId, ContestId, ContestWindow, Coordinates, QuizLaunch, QuizResult, QuizStatus, option_label,
};
use services::config;
use services::{Clock, EntryError, QuizCommand, QuizError, QuizEvent, QuizRunner, QuizServices, QuizView};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingContestId,
    InvalidDbUrl { raw: String },
    InvalidCoordinate { flag: &'static str, raw: String },
    IncompletePosition,
    UnknownContest { id: ContestId },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingContestId => write!(f, "contest requires a contest id"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCoordinate { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::IncompletePosition => write!(f, "--lat and --lon must be given together"),
            ArgsError::UnknownContest { id } => write!(f, "no contest with id {id}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz practice      [options]");
    eprintln!("  quiz contest <id>  [options]");
    eprintln!("  quiz contests      [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --api <url>          backend base URL (default http://localhost:5000/api)");
    eprintln!("  --db <sqlite_url>    snapshot database (default sqlite://quiz.sqlite3)");
    eprintln!("  --token <token>      bearer token for the backend");
    eprintln!("  --code <code>        access code for a guarded contest or practice");
    eprintln!("  --lat <deg> --lon <deg>  your position, for venue-fenced contests");
    eprintln!();
    eprintln!("Keys while a quiz runs:");
    eprintln!("  a-d answer, n next, p previous, s submit, q quit (progress is kept)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_API_URL, QUIZ_API_TOKEN, QUIZ_DB_URL, QUIZ_PRACTICE_CODE,");
    eprintln!("  QUIZ_API_TIMEOUT_SECS, QUIZ_SUBMIT_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Practice,
    Contest(ContestId),
    Contests,
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    api_url: Option<String>,
    token: Option<String>,
    code: Option<String>,
    position: Option<Coordinates>,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        // Default behavior: practice when no subcommand is provided.
        let first = args.peek().cloned();
        let command = match first.as_deref() {
            Some("practice") => {
                args.next();
                Command::Practice
            }
            Some("contests") => {
                args.next();
                Command::Contests
            }
            Some("contest") => {
                args.next();
                let id = args
                    .next()
                    .filter(|id| !id.starts_with("--") && !id.trim().is_empty())
                    .ok_or(ArgsError::MissingContestId)?;
                Command::Contest(ContestId::new(id.trim()))
            }
            Some(first) if !first.starts_with("--") => {
                return Err(ArgsError::UnknownArg(first.to_string()));
            }
            _ => Command::Practice,
        };

        let mut db_url = config::db_url_from_env()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut api_url = None;
        let mut token = None;
        let mut code = None;
        let mut latitude = None;
        let mut longitude = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--api" => api_url = Some(require_value(&mut args, "--api")?),
                "--token" => token = Some(require_value(&mut args, "--token")?),
                "--code" => code = Some(require_value(&mut args, "--code")?),
                "--lat" => latitude = Some(parse_coordinate(&mut args, "--lat")?),
                "--lon" => longitude = Some(parse_coordinate(&mut args, "--lon")?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let position = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            (None, None) => None,
            _ => return Err(ArgsError::IncompletePosition),
        };

        Ok(Self {
            command,
            db_url,
            api_url,
            token,
            code,
            position,
        })
    }
}

fn parse_coordinate(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<f64, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ArgsError::InvalidCoordinate { flag, raw: value })
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Keys ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Command(QuizCommand),
    Quit,
}

fn parse_key(line: &str) -> Option<Key> {
    let key = match line.trim().to_ascii_lowercase().as_str() {
        "a" => Key::Command(QuizCommand::AnswerChoice(0)),
        "b" => Key::Command(QuizCommand::AnswerChoice(1)),
        "c" => Key::Command(QuizCommand::AnswerChoice(2)),
        "d" => Key::Command(QuizCommand::AnswerChoice(3)),
        "n" => Key::Command(QuizCommand::Advance),
        "p" => Key::Command(QuizCommand::Retreat),
        "s" => Key::Command(QuizCommand::Submit),
        "q" => Key::Quit,
        _ => return None,
    };
    Some(key)
}

/// Read keys on a plain thread; dropping `commands` on quit or EOF ends the run.
fn spawn_key_reader(commands: mpsc::Sender<QuizCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_key(&line) {
                Some(Key::Command(command)) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Some(Key::Quit) => break,
                None => eprintln!("keys: a-d answer, n next, p previous, s submit, q quit"),
            }
        }
    });
}

// ─── Rendering ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Screen {
    last: Option<QuizView>,
}

impl Screen {
    fn show(&mut self, event: &QuizEvent) {
        match event {
            QuizEvent::Progress(view) => self.progress(view),
            QuizEvent::Notice(message) => eprintln!("! {message}"),
            QuizEvent::SubmissionFailed(message) => {
                println!("Submission failed: {message}");
                println!("Your answers are kept. Press s to try again.");
            }
            QuizEvent::Submitted(_) => {}
        }
    }

    fn progress(&mut self, view: &QuizView) {
        let redraw = self.last.as_ref().is_none_or(|last| {
            last.progress.position != view.progress.position
                || last.progress.status != view.progress.status
                || last.selected != view.selected
        });

        if redraw {
            draw(view);
        } else if view.progress.status == QuizStatus::Active && clock_is_due(view.progress.time_left)
        {
            println!("  time left {}", view.progress.clock());
        }
        self.last = Some(view.clone());
    }
}

fn clock_is_due(time_left: u32) -> bool {
    if time_left <= 10 {
        return true;
    }
    let every = if time_left <= 60 { 15 } else { 60 };
    time_left % every == 0
}

fn draw(view: &QuizView) {
    let progress = &view.progress;
    if progress.status == QuizStatus::Submitting {
        println!("Submitting...");
        return;
    }

    println!();
    println!(
        "Question {}/{}   answered {}/{}   time left {}{}",
        progress.position,
        progress.total,
        progress.answered,
        progress.total,
        progress.clock(),
        if progress.is_low_time() { "  (hurry!)" } else { "" }
    );
    println!("{}", view.question.text());
    for (index, option) in view.question.options().iter().enumerate() {
        let marker = if view.selected.as_deref() == Some(option.as_str()) {
            '*'
        } else {
            ' '
        };
        let label = option_label(index).unwrap_or('?');
        println!(" {marker} {label}) {option}");
    }

    let mut hints = vec![if view.is_last { "n finish" } else { "n next" }];
    if view.can_retreat {
        hints.push("p previous");
    }
    hints.extend(["s submit", "q quit"]);
    println!("[{}]", hints.join(", "));
}

fn print_result(heading: &str, result: &QuizResult) {
    println!();
    for line in result_lines(heading, result) {
        println!("{line}");
    }
}

fn result_lines(heading: &str, result: &QuizResult) -> Vec<String> {
    let mut lines = vec![heading.to_string()];
    match (result.score, result.total_questions) {
        (Some(score), Some(total)) if result.is_published => {
            let percentage = result.percentage().unwrap_or(0.0);
            lines.push(format!("Score: {score}/{total} ({percentage:.0}%)"));
        }
        _ => lines.push("Results will be available once they are published.".into()),
    }

    if result.is_published {
        match result.analysis() {
            Some(reviews) => {
                lines.push("Answer analysis:".into());
                for (index, review) in reviews.iter().enumerate() {
                    let number = index + 1;
                    let selected = review.selected_answer.as_deref().unwrap_or("timed out / skipped");
                    if review.is_correct {
                        lines.push(format!("  Q{number}. {} [correct: {selected}]", review.question_text));
                    } else {
                        let correct = review.correct_answer.as_deref().unwrap_or("?");
                        lines.push(format!(
                            "  Q{number}. {} [yours: {selected}, correct: {correct}]",
                            review.question_text
                        ));
                    }
                }
            }
            None => lines.push("Answer analysis is pending publication.".into()),
        }
    }

    if let Some(id) = &result.attempt_id {
        lines.push(format!("Attempt: {id}"));
    }
    lines
}

// ─── Commands ──────────────────────────────────────────────────────────────────

async fn list_contests(services: &QuizServices) -> Result<(), Box<dyn std::error::Error>> {
    let contests = services.backend().list_contests().await?;
    if contests.is_empty() {
        println!("No contests.");
        return Ok(());
    }

    let gate = services.gate();
    for (label, window) in [
        ("Active", ContestWindow::Active),
        ("Upcoming", ContestWindow::Upcoming),
        ("Ended", ContestWindow::Ended),
    ] {
        let group = gate.filter_window(&contests, window);
        if group.is_empty() {
            continue;
        }
        println!("{label}:");
        for contest in group {
            let mut flags = Vec::new();
            if contest.requires_access_code() {
                flags.push("code");
            }
            if contest.geofence().is_some() {
                flags.push("venue");
            }
            if contest.is_completed {
                flags.push("completed");
            }
            println!(
                "  {}  {}  ({} / {}, {} to {}){}",
                contest.id,
                contest.title,
                contest.category,
                contest.difficulty,
                contest.start_time.format("%Y-%m-%d %H:%M"),
                contest.end_time.format("%Y-%m-%d %H:%M"),
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            );
        }
    }
    Ok(())
}

/// What the parsed command line asks for once entry checks have run.
enum Entry {
    Listing,
    Play(QuizLaunch),
    Review(AttemptId),
}

async fn entry_for(services: &QuizServices, args: &Args) -> Result<Entry, Box<dyn std::error::Error>> {
    let gate = services.gate();
    let launch = match &args.command {
        Command::Contests => return Ok(Entry::Listing),
        Command::Practice => gate.enter_practice(args.code.as_deref()).await?,
        Command::Contest(id) => {
            let contests = services.backend().list_contests().await?;
            let contest = contests
                .iter()
                .find(|contest| &contest.id == id)
                .ok_or_else(|| ArgsError::UnknownContest { id: id.clone() })?;
            match gate
                .enter_contest(contest, args.position, args.code.as_deref())
                .await
            {
                Ok(launch) => launch,
                Err(EntryError::AlreadyCompleted {
                    attempt_id: Some(attempt_id),
                }) => return Ok(Entry::Review(attempt_id)),
                Err(err) => return Err(err.into()),
            }
        }
    };
    Ok(Entry::Play(launch))
}

async fn play(runner: QuizRunner) -> Result<(), Box<dyn std::error::Error>> {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, mut events) = mpsc::unbounded_channel();

    spawn_key_reader(command_tx);
    let run = tokio::spawn(runner.run(command_rx, event_tx));

    let mut screen = Screen::default();
    while let Some(event) = events.recv().await {
        screen.show(&event);
    }

    match run.await? {
        Ok(result) => {
            print_result("Quiz submitted.", &result);
            Ok(())
        }
        Err(QuizError::Abandoned) => {
            println!("Progress saved. Run the same command again to resume.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    let mut draft = config::settings_draft_from_env();
    if let Some(api_url) = &args.api_url {
        draft.api_base_url = Some(api_url.clone());
    }
    if let Some(token) = &args.token {
        draft.api_token = Some(token.clone());
    }
    let settings = draft.validate()?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let services = QuizServices::new_sqlite(
        &args.db_url,
        settings,
        Clock::System,
        config::practice_code_from_env(),
    )
    .await?;

    let launch = match entry_for(&services, &args).await? {
        Entry::Listing => return list_contests(&services).await,
        Entry::Review(attempt_id) => {
            let result = services.attempt_result(&attempt_id).await?;
            print_result("Contest already completed.", &result);
            return Ok(());
        }
        Entry::Play(launch) => launch,
    };

    info!(key = %launch.key, title = %launch.quiz_title, "opening quiz");
    let runner = services.open(launch).await?;
    play(runner).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| (*a).to_string()).collect()
    }

    #[test]
    fn no_subcommand_means_practice() {
        let args = Args::parse(argv(&["--db", "sqlite::memory:"])).unwrap();
        assert_eq!(args.command, Command::Practice);
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn contest_takes_an_id_and_position() {
        let args = Args::parse(argv(&[
            "contest", "c42", "--code", "x", "--lat", "1.5", "--lon", "-2",
        ]))
        .unwrap();
        assert_eq!(args.command, Command::Contest(ContestId::new("c42")));
        assert_eq!(args.code.as_deref(), Some("x"));
        assert_eq!(
            args.position,
            Some(Coordinates {
                latitude: 1.5,
                longitude: -2.0
            })
        );
    }

    #[test]
    fn contest_without_id_is_rejected() {
        assert!(matches!(
            Args::parse(argv(&["contest", "--api", "http://x"])),
            Err(ArgsError::MissingContestId)
        ));
    }

    #[test]
    fn half_a_position_is_rejected() {
        assert!(matches!(
            Args::parse(argv(&["practice", "--lat", "1"])),
            Err(ArgsError::IncompletePosition)
        ));
        assert!(matches!(
            Args::parse(argv(&["practice", "--lon", "east"])),
            Err(ArgsError::InvalidCoordinate { flag: "--lon", .. })
        ));
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(parse_key("B"), Some(Key::Command(QuizCommand::AnswerChoice(1))));
        assert_eq!(parse_key(" n "), Some(Key::Command(QuizCommand::Advance)));
        assert_eq!(parse_key("q"), Some(Key::Quit));
        assert_eq!(parse_key("x"), None);
    }

    #[test]
    fn published_result_lists_the_analysis() {
        let result: QuizResult = serde_json::from_value(serde_json::json!({
            "_id": "a1",
            "score": 1,
            "totalQuestions": 2,
            "isPublished": true,
            "isAnalysisPublished": true,
            "questions": [
                {"questionText": "2+2?", "selectedAnswer": "4", "correctAnswer": "4", "isCorrect": true},
                {"questionText": "Capital of Peru?", "correctAnswer": "Lima", "isCorrect": false}
            ]
        }))
        .unwrap();

        assert_eq!(
            result_lines("Contest already completed.", &result),
            vec![
                "Contest already completed.",
                "Score: 1/2 (50%)",
                "Answer analysis:",
                "  Q1. 2+2? [correct: 4]",
                "  Q2. Capital of Peru? [yours: timed out / skipped, correct: Lima]",
                "Attempt: a1",
            ]
        );
    }

    #[test]
    fn pending_analysis_is_announced() {
        let result = QuizResult {
            score: Some(3),
            total_questions: Some(4),
            is_published: true,
            ..QuizResult::default()
        };
        let lines = result_lines("Quiz submitted.", &result);
        assert_eq!(lines[1], "Score: 3/4 (75%)");
        assert_eq!(lines[2], "Answer analysis is pending publication.");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn unpublished_result_hides_score_and_analysis() {
        let lines = result_lines("Quiz submitted.", &QuizResult::default());
        assert_eq!(
            lines,
            vec!["Quiz submitted.", "Results will be available once they are published."]
        );
    }

    #[test]
    fn clock_reminders_thin_out_with_time() {
        assert!(clock_is_due(120));
        assert!(!clock_is_due(119));
        assert!(clock_is_due(45));
        assert!(!clock_is_due(44));
        assert!(clock_is_due(7));
    }
}
