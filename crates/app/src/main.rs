use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use env_logger::Env;
use log::{info, warn};
use pharma_core::filter::{CardFilter, StudyMode};
use services::{AppServices, Clock, Completion, SessionSnapshot, Speech, StudyLoop};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

mod commands;

use commands::{Command, CommandError, print_help};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidMode { raw: String },
    InvalidSeed { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
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

#[derive(Debug, PartialEq)]
struct Args {
    deck: PathBuf,
    db_url: Option<String>,
    mode: StudyMode,
    seed: Option<u64>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--deck <file>] [--db <sqlite_url> | --memory]");
    eprintln!("                      [--mode <mode>] [--seed <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --deck drugs.json   (.json, .csv or .tsv)");
    eprintln!("  --db   sqlite:pharma.sqlite3");
    eprintln!("  --mode mixed        (mixed, importance, weak, quick, due)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PHARMA_DECK, PHARMA_DB_URL, RUST_LOG");
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut deck = env("PHARMA_DECK").map_or_else(|| PathBuf::from("drugs.json"), PathBuf::from);
        let mut db_url = Some(
            env("PHARMA_DB_URL").map_or_else(|| "sqlite:pharma.sqlite3".into(), normalize_sqlite_url),
        );
        let mut mode = StudyMode::default();
        let mut seed = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--deck" => deck = PathBuf::from(require_value(args, "--deck")?),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(normalize_sqlite_url(value));
                }
                "--memory" => db_url = None,
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    seed = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            deck,
            db_url,
            mode,
            seed,
        }))
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

/// Prints spoken text to the terminal instead of a voice.
struct ConsoleSpeech;

impl Speech for ConsoleSpeech {
    fn speak(&self, text: &str, on_end: Option<Completion>) {
        println!("  ♪ {text}");
        if let Some(on_end) = on_end {
            on_end();
        }
    }
}

fn render(snapshot: &SessionSnapshot, remaining: &str) {
    println!();
    if let Some(err) = &snapshot.deck_error {
        println!("No deck loaded: {err}");
        return;
    }

    let filter = match &snapshot.filter {
        Some(CardFilter::Category(category)) => format!(" | category {category}"),
        Some(CardFilter::Search(query)) => format!(" | search {query:?}"),
        None => String::new(),
    };
    println!(
        "[{}{filter}] {} cards | today {} ({}%) | accuracy {}% | streak {} | lv {} ({} xp) | {remaining} left",
        snapshot.mode,
        snapshot.total_cards,
        snapshot.stats.today_studied,
        snapshot.progress_percent,
        snapshot.accuracy,
        snapshot.stats.streak,
        snapshot.stats.level,
        snapshot.stats.xp,
    );
    if snapshot.fell_back {
        println!("(nothing matched; studying the whole deck)");
    }

    let Some(card) = &snapshot.current else {
        println!("No card.");
        return;
    };
    println!("== {} ==  {} · {}", card.name, card.category, card.importance.as_str());
    if !snapshot.memo.is_empty() {
        println!("memo: {}", snapshot.memo);
    }
    if snapshot.answer_shown {
        for section in &snapshot.answer_sections {
            println!("  {}: {}", section.label, section.text);
        }
        if let Some(extra) = &snapshot.extra {
            println!("  +α: {extra}");
        }
        println!("grade: 1 again  2 hard  3 good  4 easy");
    } else {
        println!("(show to reveal)");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = match Args::parse(&mut argv, |key| std::env::var(key).ok()) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    let clock = Clock::default();
    let services = match &parsed.db_url {
        Some(db_url) => {
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url, clock).await?
        }
        None => AppServices::in_memory(clock),
    };

    let mut builder = services
        .session_for_deck(&parsed.deck)
        .with_mode(parsed.mode)
        .with_speech(Arc::new(ConsoleSpeech));
    if let Some(seed) = parsed.seed {
        builder = builder.with_seed(seed);
    }
    let controller = builder.open().await;
    info!("studying {} cards", controller.cards().len());

    let mut study = StudyLoop::new(controller);
    study.start().await;
    let shared = study.controller();

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut announced_end = false;

    loop {
        {
            let ctl = shared.lock().await;
            let remaining = ctl.countdown().format_remaining(ctl.clock().now());
            render(&ctl.snapshot(), &remaining);
        }
        if study.is_session_over() && !announced_end {
            println!("Session time is up. Keep going or `quit`.");
            announced_end = true;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Show => {
                study.reveal().await;
            }
            Command::Answer(difficulty) => match study.answer_and_advance(difficulty).await {
                Some(step) => {
                    let due = step.outcome.applied.next_review.format("%Y-%m-%d %H:%M");
                    println!(
                        "{} → {}, due {due} UTC (+{} xp{})",
                        step.outcome.applied.log.card_name,
                        difficulty,
                        step.outcome.credit.xp_gained,
                        if step.outcome.credit.leveled_up { ", level up!" } else { "" },
                    );
                }
                None => println!("No card to grade."),
            },
            Command::Skip => {
                study.skip().await;
            }
            Command::Undo => {
                if !study.undo().await {
                    println!("Nothing to undo.");
                }
            }
            Command::Mode(mode) => {
                let mut ctl = shared.lock().await;
                ctl.change_mode(mode);
                ctl.next_card().await;
            }
            Command::Filter(filter) => {
                let mut ctl = shared.lock().await;
                ctl.set_filter(filter);
                ctl.next_card().await;
            }
            Command::Memo(text) => shared.lock().await.save_memo(&text).await,
            Command::Review(name) => {
                if let Err(err) = shared.lock().await.mark_for_review(&name).await {
                    println!("{err}");
                }
            }
            Command::Forget(name) => {
                if !shared.lock().await.forget_recent_error(&name).await {
                    println!("{name} is not in recent errors.");
                }
            }
            Command::ClearErrors => shared.lock().await.clear_recent_errors().await,
            Command::Set(change) => {
                let restart = {
                    let mut ctl = shared.lock().await;
                    let mut draft = ctl.settings().to_draft();
                    change.apply(&mut draft);
                    let before = ctl.settings().session_minutes();
                    match ctl.update_settings(draft).await {
                        Ok(settings) => settings.session_minutes() != before,
                        Err(err) => {
                            println!("{err}");
                            false
                        }
                    }
                };
                if restart {
                    study.restart_countdown().await;
                    announced_end = false;
                }
            }
            Command::AddCard(card) => match services.card_service().add_custom_card(card).await {
                Ok(card) => println!("Added {}; it joins the deck next session.", card.name),
                Err(err) => println!("{err}"),
            },
            Command::Categories => {
                let ctl = shared.lock().await;
                println!("{}", ctl.categories().join(", "));
            }
            Command::Weak => {
                let ctl = shared.lock().await;
                let weak = ctl.weak_categories();
                if weak.is_empty() {
                    println!("No weak categories.");
                }
                for category in weak {
                    println!(
                        "  {:<24} {:>5.1}% over {} cards",
                        category.category, category.accuracy, category.attempted_cards
                    );
                }
            }
            Command::Stats => {
                let ctl = shared.lock().await;
                let stats = ctl.session_stats();
                println!(
                    "answers {} (correct {}) | today {} / goal {} | recent errors: {}",
                    stats.total_answers,
                    stats.correct_answers,
                    stats.today_studied,
                    ctl.settings().daily_goal(),
                    ctl.recent_errors().iter().collect::<Vec<_>>().join(", "),
                );
            }
        }
    }

    study.stop();
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run().await {
        warn!("exiting with error");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
