use anyhow::Context;
use picker::config::PickerConfig;
use picker::export::build_export;
use picker::grid::{marker_at, spawn_time_marker};
use picker::import::{load_bundled, read_files};
use picker::rooms::RoomMapper;
use picker::schedule::SessionKey;
use picker::store::{KeyValueStore, SelectionStore, SqliteStore};
use picker::timetable::Timetable;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "picker.json";

enum Command {
    Show,
    Import(Vec<PathBuf>),
    Remove(String),
    Clear,
    Toggle(String),
    Filter(String),
    ShowUnused,
    Export,
    Room(String),
    Watch,
}

struct Options {
    config_path: PathBuf,
    command: Command,
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {program} [--config PATH] <command>\n\n\
         Commands:\n  \
           show                 print the weekly grid (default)\n  \
           import FILE...       import schedule JSON files\n  \
           remove TITLE         remove an imported subject\n  \
           clear                remove every imported subject\n  \
           toggle KEY           select or deselect a session\n  \
           filter ABBREV        toggle a subject in the filter\n  \
           show-unused          toggle showing blocked sessions\n  \
           export               print activity ids of the selection\n  \
           room CODE            print the map link for a room\n  \
           watch                print the current-time marker every tick"
    );
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Options, ()> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut rest = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = PathBuf::from(args.next().ok_or(())?),
            "-h" | "--help" => return Err(()),
            _ => rest.push(arg),
        }
    }

    let mut rest = rest.into_iter();
    let command = match rest.next().as_deref() {
        None | Some("show") => Command::Show,
        Some("import") => {
            let files: Vec<PathBuf> = rest.by_ref().map(PathBuf::from).collect();
            if files.is_empty() {
                return Err(());
            }
            Command::Import(files)
        }
        Some("remove") => Command::Remove(rest.next().ok_or(())?),
        Some("clear") => Command::Clear,
        Some("toggle") => Command::Toggle(rest.next().ok_or(())?),
        Some("filter") => Command::Filter(rest.next().ok_or(())?),
        Some("show-unused") => Command::ShowUnused,
        Some("export") => Command::Export,
        Some("room") => Command::Room(rest.next().ok_or(())?),
        Some("watch") => Command::Watch,
        Some(_) => return Err(()),
    };

    if rest.next().is_some() {
        return Err(());
    }

    Ok(Options {
        config_path,
        command,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "picker".to_owned());
    let Ok(options) = parse_options(args) else {
        print_usage(&program);
        std::process::exit(2);
    };

    let config = PickerConfig::load_from_path(&options.config_path)
        .with_context(|| format!("loading {}", options.config_path.display()))?;
    let kv = SqliteStore::open(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let mut store = SelectionStore::load(kv);

    // Persistence failures are reported but never abort a command
    match options.command {
        Command::Show => {}
        Command::Import(files) => {
            let batch = read_files(&files).await;
            for error in &batch.errors {
                eprintln!("rejected: {error}");
            }
            if batch.is_empty() {
                anyhow::bail!("nothing to import");
            }
            let count = batch.subjects.len();
            if let Err(e) = store.import_subjects(batch.subjects) {
                warn!(error = %e, "Import not persisted");
            }
            println!("Imported {count} subject(s)");
        }
        Command::Remove(title) => match store.remove_subject(&title) {
            Ok(false) => anyhow::bail!("no imported subject titled {title}"),
            Ok(true) => {}
            Err(e) => warn!(error = %e, "Removal not persisted"),
        },
        Command::Clear => {
            if let Err(e) = store.clear_subjects() {
                warn!(error = %e, "Clear not persisted");
            }
        }
        Command::Toggle(raw) => {
            let key = SessionKey::from_raw(raw);
            let timetable = load_timetable(&store, &config).await;
            timetable.check_toggle(&key, store.selected_sessions())?;
            if let Err(e) = store.toggle_session(&key) {
                warn!(error = %e, "Selection not persisted");
            }
        }
        Command::Filter(abbrev) => {
            if let Err(e) = store.toggle_subject_filter(&abbrev) {
                warn!(error = %e, "Filter not persisted");
            }
        }
        Command::ShowUnused => {
            if let Err(e) = store.toggle_show_unused() {
                warn!(error = %e, "Flag not persisted");
            }
        }
        Command::Export => {
            let timetable = load_timetable(&store, &config).await;
            let export = build_export(store.selected_sessions(), timetable.sessions());
            println!("{}", serde_json::to_string_pretty(&export)?);
            return Ok(());
        }
        Command::Room(code) => {
            let mapper = RoomMapper::with_config(config.room_mapper())?;
            match mapper.resolve(&code).await {
                Some(url) => println!("{url}"),
                None => anyhow::bail!("empty room code"),
            }
            return Ok(());
        }
        Command::Watch => {
            let (mut rx, handle) = spawn_time_marker(config.marker_tick());
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match *rx.borrow() {
                            Some(position) => println!("{} {:.0}px", position.day, position.offset_px),
                            None => println!("outside teaching hours"),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            drop(rx);
            handle.abort();
            return Ok(());
        }
    }

    let timetable = load_timetable(&store, &config).await;
    let view = timetable.view(&store, &config.palette);
    print!("{}", view.to_text());

    if let Some(position) = marker_at(chrono::Local::now().naive_local()) {
        println!("\nNow: {} at {:.0}px", position.day, position.offset_px);
    }

    info!(
        sessions = timetable.sessions().len(),
        selected = store.selected_sessions().len(),
        "Rendered timetable"
    );
    Ok(())
}

/// Builds the timetable, reading bundled data only while nothing is imported.
async fn load_timetable<S: KeyValueStore>(
    store: &SelectionStore<S>,
    config: &PickerConfig,
) -> Timetable {
    if !store.imported_subjects().is_empty() {
        return Timetable::from_store(store, &[]);
    }

    let bundled = match load_bundled(&config.bundled_dir).await {
        Ok(batch) => batch.subjects,
        Err(e) => {
            warn!(error = %e, "No bundled schedules");
            Vec::new()
        }
    };
    Timetable::from_store(store, &bundled)
}
