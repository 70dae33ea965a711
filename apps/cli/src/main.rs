use anyhow::{bail, Context};
use std::io::{self, BufRead, Write};
use torii_cli::api::{resolve_token, ApiClient, RetryConfig};
use torii_cli::config::{self, Preferences};
use torii_cli::db::{Store, StoreError};
use torii_cli::session::{Card, Session};
use torii_cli::sync::{self, SyncOutcome};
use torii_core::types::{ReviewTask, Verdict};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Reviews,
    Lessons,
}

struct Args {
    token: Option<String>,
    regen: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        token: std::env::var("TORII_API_TOKEN").ok(),
        regen: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--token" => {
                args.token = Some(iter.next().context("--token requires a value")?);
            }
            "--regen" => args.regen = true,
            other => bail!("unknown argument: {other} (expected --token <value> or --regen)"),
        }
    }
    Ok(args)
}

fn open_store(regen: bool) -> anyhow::Result<Store> {
    let path = config::db_path()?;
    if regen {
        return Ok(Store::open_with_regen(&path)?);
    }
    match Store::open(&path) {
        Ok(store) => Ok(store),
        Err(StoreError::SchemaCorrupted(tables)) => {
            bail!("local cache is corrupted (missing tables: {tables}); rerun with --regen to rebuild it")
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("torii=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let prefs = Preferences::load()?;
    let store = open_store(args.regen)?;

    let token = match resolve_token(&store, args.token) {
        Ok(token) => token,
        Err(StoreError::MissingApiKey) => {
            bail!("no API token stored; run once with --token <value> or set TORII_API_TOKEN")
        }
        Err(e) => return Err(e.into()),
    };
    let client = ApiClient::new(prefs.api_base_url.clone(), token, RetryConfig::default());

    let mut session = Session::new(store, &prefs)?;
    session.refresh()?;

    run(&mut session, &client).await
}

async fn run(session: &mut Session, client: &ApiClient) -> anyhow::Result<()> {
    println!("torii | :sync :report :lessons :reviews :back :exit");
    let stdin = io::stdin();
    let mut mode = Mode::Reviews;

    loop {
        match mode {
            Mode::Reviews => show_review(session)?,
            Mode::Lessons => show_lesson(session)?,
        }
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if let Some(command) = line.strip_prefix(':') {
            match command {
                "exit" | "quit" => break,
                "sync" => run_sync(session, client).await?,
                "report" => report(session)?,
                "lessons" => mode = Mode::Lessons,
                "reviews" => mode = Mode::Reviews,
                "back" if mode == Mode::Lessons => match session.unsee_lesson() {
                    Ok(()) => {}
                    Err(e) => println!("{e}"),
                },
                other => println!("unknown command :{other}"),
            }
            continue;
        }

        match mode {
            Mode::Reviews => answer_review(session, line)?,
            Mode::Lessons => answer_lesson(session, line)?,
        }
    }
    Ok(())
}

fn show_review(session: &mut Session) -> anyhow::Result<()> {
    match session.review_card()? {
        None => println!("No reviews due. :sync to fetch, :lessons to learn something new."),
        Some((card, row)) => {
            let task = if !row.meaning_passed {
                "meaning"
            } else {
                "reading"
            };
            println!("\n  {}  ({task})", card.subject.display_characters());
        }
    }
    Ok(())
}

fn answer_review(session: &mut Session, answer: &str) -> anyhow::Result<()> {
    if answer.is_empty() {
        return Ok(());
    }
    let Some((card, row)) = session.review_card()? else {
        return Ok(());
    };
    let task = if !row.meaning_passed {
        ReviewTask::Meaning
    } else {
        ReviewTask::Reading
    };
    let verdict = match task {
        ReviewTask::Meaning => session.answer_review_meaning(answer)?,
        ReviewTask::Reading => session.answer_review_reading(answer)?,
    };
    print_verdict(verdict, &card, task);
    Ok(())
}

fn show_lesson(session: &mut Session) -> anyhow::Result<()> {
    match session.lesson_card()? {
        None => println!("No lessons available. :sync to fetch, :reviews to quiz."),
        Some((card, item)) => {
            if !item.seen {
                print_lesson_card(&card);
                println!("(press Enter when ready, :back to revisit)");
            } else {
                let task = if !item.meaning_passed {
                    "meaning"
                } else {
                    "reading"
                };
                println!("\n  {}  ({task})", card.subject.display_characters());
            }
        }
    }
    Ok(())
}

fn answer_lesson(session: &mut Session, answer: &str) -> anyhow::Result<()> {
    let Some((card, item)) = session.lesson_card()? else {
        return Ok(());
    };
    if !item.seen {
        // Any input acknowledges the card; the quiz starts next prompt.
        session.see_lesson()?;
        return Ok(());
    }
    if answer.is_empty() {
        return Ok(());
    }
    let task = if !item.meaning_passed {
        ReviewTask::Meaning
    } else {
        ReviewTask::Reading
    };
    let verdict = match task {
        ReviewTask::Meaning => session.answer_lesson_meaning(answer)?,
        ReviewTask::Reading => session.answer_lesson_reading(answer)?,
    };
    print_verdict(verdict, &card, task);
    Ok(())
}

fn print_lesson_card(card: &Card) {
    println!("\n  {}  [{}]", card.subject.display_characters(), card.subject.kind.as_str());
    let meanings: Vec<&str> = card
        .meanings
        .iter()
        .filter(|m| m.accepted)
        .map(|m| m.text.as_str())
        .collect();
    println!("  meanings: {}", meanings.join(", "));
    if let Some(mnemonic) = &card.subject.meaning_mnemonic {
        println!("  {mnemonic}");
    }
    if !card.readings.is_empty() {
        let readings: Vec<&str> = card
            .readings
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.text.as_str())
            .collect();
        println!("  readings: {}", readings.join(", "));
        if let Some(mnemonic) = &card.subject.reading_mnemonic {
            println!("  {mnemonic}");
        }
    }
    if !card.components.is_empty() {
        let parts: Vec<&str> = card
            .components
            .iter()
            .map(|s| s.display_characters())
            .collect();
        println!("  made of: {}", parts.join(" + "));
    }
}

fn print_verdict(verdict: Verdict, card: &Card, task: ReviewTask) {
    if verdict.is_correct() {
        println!("correct");
        return;
    }
    let expected: Vec<&str> = match task {
        ReviewTask::Meaning => card
            .meanings
            .iter()
            .filter(|m| m.accepted)
            .map(|m| m.text.as_str())
            .collect(),
        ReviewTask::Reading => card
            .readings
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.text.as_str())
            .collect(),
    };
    println!("incorrect (expected: {})", expected.join(", "));
}

async fn run_sync(session: &mut Session, client: &ApiClient) -> anyhow::Result<()> {
    match sync::push(session, client).await? {
        SyncOutcome::Offline => {
            println!("offline, sync skipped");
            return Ok(());
        }
        SyncOutcome::Pushed { reviews, lessons } => {
            println!("reported {reviews} reviews, {lessons} lessons");
        }
        other => println!("{other:?}"),
    }
    match sync::pull(session, client).await? {
        SyncOutcome::Offline => println!("offline, pull skipped"),
        SyncOutcome::Pulled {
            subjects,
            assignments,
        } => println!("pulled {subjects} subjects, {assignments} assignments"),
        other => println!("{other:?}"),
    }
    Ok(())
}

fn report(session: &Session) -> anyhow::Result<()> {
    let fraction = session.progress_fraction()?;
    println!(
        "reviews due: {}, lessons available: {}, session progress: {:.0}%",
        session.available_reviews()?,
        session.available_lessons()?,
        fraction * 100.0
    );
    Ok(())
}
