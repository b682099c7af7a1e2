use std::fmt;
use std::io::Write as _;

use course_core::Clock;
use course_core::metrics::AchievementTier;
use course_core::model::{Catalog, LessonId};
use services::{
    CompletionOutcome, LifecycleEvent, LoadOutcome, LoadSource, ProgressTracker,
    ResetConfirmation, ResetOutcome, SaveStatus,
};
use storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingLessonId { command: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidLessonId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingLessonId { command } => {
                write!(f, "{command} requires a lesson id")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid lesson id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [status]                  show course progress");
    eprintln!("  cargo run -p app -- complete <lesson-id>      mark a lesson done");
    eprintln!("  cargo run -p app -- uncomplete <lesson-id>    unmark a lesson");
    eprintln!("  cargo run -p app -- note <lesson-id> [text]   set (or clear) a lesson note");
    eprintln!("  cargo run -p app -- goto <lesson-id>          jump to a lesson");
    eprintln!("  cargo run -p app -- next | prev               step through lessons");
    eprintln!("  cargo run -p app -- export                    print all notes as text");
    eprintln!("  cargo run -p app -- reset [--yes]             erase all progress");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>    storage location (default sqlite://progress.sqlite3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Complete(LessonId),
    Uncomplete(LessonId),
    Note { lesson: LessonId, text: Option<String> },
    Goto(LessonId),
    Next,
    Prev,
    Export,
    Reset { assume_yes: bool },
}

struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://progress.sqlite3".into(), normalize_sqlite_url);
        let mut assume_yes = false;
        let mut positionals: Vec<String> = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = args.next().ok_or(ArgsError::MissingValue { flag: "--db" })?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--yes" => assume_yes = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let command = Self::parse_command(&positionals, assume_yes)?;
        Ok(Self { db_url, command })
    }

    fn parse_command(positionals: &[String], assume_yes: bool) -> Result<Command, ArgsError> {
        fn lesson_arg(
            positionals: &[String],
            command: &'static str,
        ) -> Result<LessonId, ArgsError> {
            let raw = positionals
                .get(1)
                .ok_or(ArgsError::MissingLessonId { command })?;
            raw.parse()
                .map_err(|_| ArgsError::InvalidLessonId { raw: raw.clone() })
        }

        let Some(name) = positionals.first() else {
            return Ok(Command::Status);
        };

        match name.as_str() {
            "status" => Ok(Command::Status),
            "complete" => Ok(Command::Complete(lesson_arg(positionals, "complete")?)),
            "uncomplete" => Ok(Command::Uncomplete(lesson_arg(positionals, "uncomplete")?)),
            "note" => {
                let lesson = lesson_arg(positionals, "note")?;
                let text = positionals[2..].join(" ");
                let text = if text.trim().is_empty() { None } else { Some(text) };
                Ok(Command::Note { lesson, text })
            }
            "goto" => Ok(Command::Goto(lesson_arg(positionals, "goto")?)),
            "next" => Ok(Command::Next),
            "prev" => Ok(Command::Prev),
            "export" => Ok(Command::Export),
            "reset" => Ok(Command::Reset { assume_yes }),
            other => Err(ArgsError::UnknownCommand(other.to_string())),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
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
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}

fn report_load(outcome: &LoadOutcome, tracker: &ProgressTracker) {
    if outcome.source == LoadSource::FallbackAfterError {
        eprintln!("warning: saved progress could not be read; starting from defaults");
    }
    match outcome.streak {
        Some(course_core::streak::StreakChange::Extended) => {
            println!("Streak extended: {} days in a row!", tracker.streak());
        }
        Some(course_core::streak::StreakChange::Reset) => {
            println!("Streak reset. Today is day one again.");
        }
        _ => {}
    }
}

fn report_save(status: SaveStatus) {
    if status == SaveStatus::Failed {
        eprintln!("warning: progress could not be saved; changes last only this session");
    }
}

fn print_status(tracker: &ProgressTracker) {
    let catalog = tracker.catalog();
    let completed = catalog
        .iter()
        .filter(|lesson| tracker.is_completed(lesson.id()))
        .count();

    println!("{}", catalog.title());
    println!(
        "Progress: {}% ({completed}/{} lessons)",
        tracker.progress_percent(),
        catalog.len()
    );
    println!("Streak: {} days   XP: {}", tracker.streak(), tracker.xp());
    let tier = tracker.achievement_tier();
    if tier != AchievementTier::None {
        println!("Achievement: {tier}");
    }
    println!();

    for lesson in catalog.iter() {
        let mark = if tracker.is_completed(lesson.id()) { "x" } else { " " };
        let here = if lesson.id() == tracker.current_lesson() { " <- current" } else { "" };
        let noted = if tracker.note(lesson.id()).is_some() { " [note]" } else { "" };
        println!("  [{mark}] {}. {}{noted}{here}", lesson.id(), lesson.title());
    }

    let next = tracker.next_incomplete_lesson();
    if let Some(lesson) = catalog.get(next) {
        println!();
        println!("Next up: {}. {}", lesson.id(), lesson.title());
    }
}

fn report_completion(id: LessonId, outcome: &CompletionOutcome) {
    if outcome.newly_completed {
        println!("+{} XP earned!", outcome.xp_awarded);
        if outcome.tier != AchievementTier::None {
            println!("Achievement: {}", outcome.tier);
        }
    } else {
        println!("Lesson {id} was already completed.");
    }
    report_save(outcome.save);
}

fn confirm_reset_on_stdin() -> ResetConfirmation {
    print!("Reset all progress? This cannot be undone. Type 'yes' to confirm: ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(_) if line.trim() == "yes" => ResetConfirmation::Confirmed,
        _ => ResetConfirmation::Cancelled,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;

    let clock = Clock::default_clock();
    let (mut tracker, loaded) =
        ProgressTracker::open(Catalog::builtin(), storage.progress, clock).await;
    report_load(&loaded, &tracker);

    match args.command {
        Command::Status => print_status(&tracker),
        Command::Complete(id) => match tracker.complete_lesson(id).await {
            Ok(outcome) => report_completion(id, &outcome),
            Err(err) => eprintln!("{err}"),
        },
        Command::Uncomplete(id) => match tracker.uncomplete_lesson(id).await {
            Ok(SaveStatus::Skipped) => println!("Lesson {id} was not completed."),
            Ok(status) => {
                println!("Lesson {id} unmarked.");
                report_save(status);
            }
            Err(err) => eprintln!("{err}"),
        },
        Command::Note { lesson, text } => {
            let result = match text {
                Some(text) => tracker.set_note(lesson, text).await.map(|status| {
                    println!("Note saved for lesson {lesson}.");
                    status
                }),
                None => tracker.clear_note(lesson).await.map(|status| {
                    println!("Note cleared for lesson {lesson}.");
                    status
                }),
            };
            match result {
                Ok(status) => report_save(status),
                Err(err) => eprintln!("{err}"),
            }
        }
        Command::Goto(id) => match tracker.go_to_lesson(id).await {
            Ok(status) => {
                print_current(&tracker);
                report_save(status);
            }
            Err(err) => eprintln!("{err}"),
        },
        Command::Next => {
            report_save(tracker.next_lesson().await);
            print_current(&tracker);
        }
        Command::Prev => {
            report_save(tracker.previous_lesson().await);
            print_current(&tracker);
        }
        Command::Export => print!("{}", tracker.export_notes()),
        Command::Reset { assume_yes } => {
            let confirmation = if assume_yes {
                ResetConfirmation::Confirmed
            } else {
                confirm_reset_on_stdin()
            };
            match tracker.reset(confirmation).await {
                ResetOutcome::Cancelled => println!("Reset cancelled."),
                ResetOutcome::Reset { save } => {
                    println!("Progress reset.");
                    report_save(save);
                }
            }
        }
    }

    // Mirror of the page-unload hook: one last flush before the process ends.
    let status = tracker.handle_lifecycle(LifecycleEvent::Unload).await;
    report_save(status);

    Ok(())
}

fn print_current(tracker: &ProgressTracker) {
    if let Some(lesson) = tracker.catalog().get(tracker.current_lesson()) {
        println!("Now on lesson {}. {}", lesson.id(), lesson.title());
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // Startup failures get printed once here, nowhere else.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
