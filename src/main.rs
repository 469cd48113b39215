//! Entry point for the reader shell.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml` and user preferences from
//!   the settings store.
//! - Drive a `ReaderSession` through a small line-based command loop, the
//!   stand-in for a GUI front end.

use anyhow::{Context, Result, anyhow};
use epub_swift::config::{AppConfig, load_config};
use epub_swift::i18n::Translator;
use epub_swift::loader::BookLoader;
use epub_swift::session::ReaderSession;
use epub_swift::store::{LibraryStore, SettingsStore};
use epub_swift::text;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let initial_path = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        data_dir = %config.data_dir.display(),
        strategy = ?config.length_strategy,
        level = %config.log_level,
        "Starting reader"
    );

    let settings = SettingsStore::new(&config.data_dir);
    let library = LibraryStore::new(&config.data_dir);
    let translator = Translator::new(&config.locale_dir, &settings.get("language", "en"));

    let session = Arc::new(Mutex::new(ReaderSession::new(
        library.clone(),
        config.length_strategy,
    )));
    install_shutdown_flush(&session);

    let mut loader = BookLoader::new();
    if let Some(path) = initial_path {
        open_book(&session, &mut loader, &config, path);
    }

    command_loop(&session, &mut loader, &config, &translator, &library)?;

    session
        .lock()
        .map_err(|_| anyhow!("Session lock poisoned"))?
        .close();
    Ok(())
}

fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        return Ok(None);
    };
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    Ok(Some(path))
}

/// Request a load and block on it, discarding superseded results.
fn open_book(
    session: &Arc<Mutex<ReaderSession>>,
    loader: &mut BookLoader,
    config: &AppConfig,
    path: PathBuf,
) {
    loader.request(path, config.length_strategy);
    println!("Loading...");
    let Some(outcome) = loader.wait() else {
        return;
    };
    match outcome.result {
        Ok(book) => {
            let mut session = match session.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let summary = session.install(book);
            let by = summary
                .creator
                .as_deref()
                .map(|c| format!(" by {c}"))
                .unwrap_or_default();
            println!(
                "Opened \"{}\"{by} ({} chapters, {:.1}% read)",
                summary.title,
                summary.chapter_count,
                session.current_percentage()
            );
        }
        Err(err) => {
            warn!(path = %outcome.path.display(), "Load failed: {err:#}");
            println!("Could not load the book: {err:#}");
        }
    }
}

fn command_loop(
    session: &Arc<Mutex<ReaderSession>>,
    loader: &mut BookLoader,
    config: &AppConfig,
    translator: &Translator,
    library: &LibraryStore,
) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("stdin closed")? == 0 {
            return Ok(());
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };

        match command {
            "open" => match parts.next() {
                Some(path) => open_book(session, loader, config, PathBuf::from(path)),
                None => println!("usage: open <path>"),
            },
            "chapters" => with_session(session, |s| {
                let Some(book) = s.book() else {
                    println!("No book loaded");
                    return;
                };
                for (i, chapter) in book.chapters.iter().enumerate() {
                    println!("{:3}. {} ({})", i + 1, chapter.title, chapter.length);
                }
            }),
            "show" => {
                let index = parts.next().and_then(|n| n.parse::<usize>().ok());
                with_session(session, |s| match index {
                    Some(i) => match s.chapter_text(i) {
                        Some(content) => {
                            if text::is_rtl(&content) {
                                info!(chapter = i, "Chapter detected as right-to-left");
                            }
                            println!("{content}");
                            s.on_scroll(i, 0.0);
                        }
                        None => println!("{}", translator.text("chapter_unavailable")),
                    },
                    None => println!("usage: show <chapter>"),
                });
            }
            "jump" => {
                let pct = parts.next().and_then(|n| n.parse::<f64>().ok());
                with_session(session, |s| match pct {
                    Some(p) => match s.jump_to_percentage(p) {
                        Some(pos) => println!(
                            "-> chapter {} at {:.0}%",
                            pos.chapter + 1,
                            pos.ratio * 100.0
                        ),
                        None => println!("Jump unavailable"),
                    },
                    None => println!("usage: jump <percentage>"),
                });
            }
            "scroll" => {
                let chapter = parts.next().and_then(|n| n.parse::<usize>().ok());
                let fraction = parts.next().and_then(|n| n.parse::<f64>().ok());
                with_session(session, |s| match (chapter, fraction) {
                    (Some(c), Some(f)) => println!("{:.1}%", s.on_scroll(c, f)),
                    _ => println!("usage: scroll <chapter> <fraction>"),
                });
            }
            "percent" => with_session(session, |s| {
                println!("{:.1}%", s.current_percentage());
            }),
            "library" => {
                for entry in library.load_all() {
                    println!(
                        "{} — {} ({} chapters, offset {})",
                        entry.path.display(),
                        entry.title,
                        entry.chapter_count,
                        entry.last_read_offset
                    );
                }
            }
            "quit" | "exit" => return Ok(()),
            other => println!("Unknown command: {other}"),
        }
    }
}

fn with_session(session: &Arc<Mutex<ReaderSession>>, f: impl FnOnce(&mut ReaderSession)) {
    match session.lock() {
        Ok(mut guard) => f(&mut guard),
        Err(_) => warn!("Session lock poisoned"),
    }
}

/// Flush reading progress when the process is interrupted.
fn install_shutdown_flush(session: &Arc<Mutex<ReaderSession>>) {
    let session = Arc::clone(session);
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Interrupt received; flushing progress");
        if let Ok(mut guard) = session.lock() {
            guard.close();
        }
        std::process::exit(0);
    }) {
        warn!("Failed to install interrupt handler: {err}");
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
