//! Command-line front end for the TaskPlus core.
//!
//! # Responsibility
//! - Map subcommands onto session, task, note and preference services.
//! - Turn provider error codes into user-facing messages.

use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::warn;
use std::path::PathBuf;
use taskplus_core::service::task_service::first_instant_of_local_day;
use taskplus_core::{
    core_version, init_logging_from_config, open_db, AuthError, AuthErrorCode, Category,
    CoreConfig, DateInput, DocumentId, Identity, NewNote, NewTask, NoteService, NotePatch,
    PhotoRef, PreferencesService, Priority, SessionManager, SqliteDocumentStore,
    SqliteIdentityProvider, StoreNoteRepository, StorePreferencesRepository, StoreTaskRepository,
    Task, TaskPatch, TaskService,
};

#[derive(Parser)]
#[command(name = "taskplus")]
#[command(about = "Tasks, notes and preferences from the terminal")]
struct Cli {
    /// JSON config file; takes precedence over `--data-dir`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory for the database and logs
    #[arg(long, global = true, default_value = ".taskplus")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register(Credentials),
    /// Sign in with an existing account
    Login(Credentials),
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage notes
    #[command(subcommand)]
    Note(NoteCommand),
    /// Show or change preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
    /// Print the core version
    Version,
}

#[derive(Args)]
struct Credentials {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

#[derive(Subcommand)]
enum TaskCommand {
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// `YYYY-MM-DD` (local day) or an RFC 3339 instant
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    List,
    /// Tasks due today
    Today,
    /// Open tasks due from today on
    Upcoming,
    /// Toggle the completed flag
    Done { id: String },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    Rm { id: String },
}

#[derive(Subcommand)]
enum NoteCommand {
    Add {
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long)]
        photo: Option<String>,
    },
    List,
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        photo: Option<String>,
    },
    Rm { id: String },
}

#[derive(Subcommand)]
enum PrefsCommand {
    Show,
    DarkMode { mode: Toggle },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
    Toggle,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Commands::Version = cli.command {
        println!("taskplus_core version={}", core_version());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => CoreConfig::for_data_dir(&cli.data_dir)?,
    };
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let conn = open_db(config.db_path())
        .with_context(|| format!("failed to open `{}`", config.db_path().display()))?;
    let provider = SqliteIdentityProvider::try_new(&conn).map_err(auth_failure)?;
    let session = SessionManager::new(provider);
    let store = SqliteDocumentStore::try_new(&conn)?;

    match cli.command {
        Commands::Register(creds) => {
            let identity = session
                .register(&creds.email, &creds.password)
                .map_err(auth_failure)?;
            println!("registered and signed in as {}", identity.email);
        }
        Commands::Login(creds) => {
            let identity = session
                .login(&creds.email, &creds.password)
                .map_err(auth_failure)?;
            println!("signed in as {}", identity.email);
        }
        Commands::Logout => {
            session.logout().map_err(auth_failure)?;
            println!("signed out");
        }
        Commands::Whoami => match session.current_identity().map_err(auth_failure)? {
            Some(identity) => println!(
                "{} uid={} created={}",
                identity.email,
                identity.uid,
                identity.metadata.creation_time.format("%Y-%m-%d")
            ),
            None => println!("not signed in"),
        },
        Commands::Task(command) => {
            let identity = require_identity(&session)?;
            let service = TaskService::new(StoreTaskRepository::new(&store));
            run_task(&service, &identity, command)?;
        }
        Commands::Note(command) => {
            let identity = require_identity(&session)?;
            let service = NoteService::new(StoreNoteRepository::new(&store));
            run_note(&service, &identity, command)?;
        }
        Commands::Prefs(command) => {
            let identity = require_identity(&session)?;
            let service = PreferencesService::new(StorePreferencesRepository::new(&store));
            let enabled = match command {
                PrefsCommand::Show => service.dark_mode_enabled(&identity.uid)?,
                PrefsCommand::DarkMode { mode } => {
                    let saved = match mode {
                        Toggle::On => service.set_dark_mode(&identity.uid, true)?,
                        Toggle::Off => service.set_dark_mode(&identity.uid, false)?,
                        Toggle::Toggle => service.toggle_dark_mode(&identity.uid)?,
                    };
                    saved.dark_mode
                }
            };
            println!("dark_mode={}", if enabled { "on" } else { "off" });
        }
        Commands::Version => {}
    }
    Ok(())
}

fn run_task(
    service: &TaskService<StoreTaskRepository<&SqliteDocumentStore<'_>>>,
    identity: &Identity,
    command: TaskCommand,
) -> anyhow::Result<()> {
    match command {
        TaskCommand::Add {
            title,
            description,
            due,
            category,
            priority,
        } => {
            let mut task = NewTask::new(title);
            task.description = description;
            task.due_date = due.as_deref().map(due_input);
            task.category = category;
            task.priority = priority;
            let created = service.create_task(&identity.uid, task)?;
            println!("created {}", created.id());
        }
        TaskCommand::List => {
            let mut tasks = service.list_tasks(&identity.uid)?;
            tasks.sort_by_key(|task| task.due_date);
            print_tasks(tasks.iter());
        }
        TaskCommand::Today => {
            let tasks = service.list_tasks(&identity.uid)?;
            print_tasks(service.due_on(&tasks, Local::now().date_naive()));
        }
        TaskCommand::Upcoming => {
            let tasks = service.list_tasks(&identity.uid)?;
            print_tasks(service.upcoming(&tasks));
        }
        TaskCommand::Done { id } => {
            let task = service.toggle_completed_owned(&identity.uid, &parse_id(&id)?)?;
            println!(
                "{} is now {}",
                task.id(),
                if task.completed { "done" } else { "open" }
            );
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            due,
            category,
            priority,
        } => {
            let patch = TaskPatch {
                title,
                description,
                due_date: due.as_deref().map(due_input),
                category,
                priority,
                completed: None,
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }
            let task = service.update_task_owned(&identity.uid, &parse_id(&id)?, &patch)?;
            println!("updated {}", task.id());
        }
        TaskCommand::Rm { id } => {
            service.delete_task_owned(&identity.uid, &parse_id(&id)?)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn run_note(
    service: &NoteService<StoreNoteRepository<&SqliteDocumentStore<'_>>>,
    identity: &Identity,
    command: NoteCommand,
) -> anyhow::Result<()> {
    match command {
        NoteCommand::Add {
            title,
            content,
            photo,
        } => {
            let mut note = NewNote::new(title, content);
            if let Some(uri) = photo {
                note = note.with_photo(PhotoRef::new(uri));
            }
            let created = service.create_note(&identity.uid, note)?;
            println!("created {}", created.id());
        }
        NoteCommand::List => {
            for note in service.list_notes(&identity.uid)? {
                let created = note
                    .created_at
                    .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let photo = if note.photo.is_some() { " [photo]" } else { "" };
                println!("{}  {}  {}{}", note.id(), created, note.title, photo);
            }
        }
        NoteCommand::Edit {
            id,
            title,
            content,
            photo,
        } => {
            let patch = NotePatch {
                title,
                content,
                photo: photo.map(PhotoRef::new),
            };
            let note = service.update_note_owned(&identity.uid, &parse_id(&id)?, patch)?;
            println!("updated {}", note.id());
        }
        NoteCommand::Rm { id } => {
            service.delete_note_owned(&identity.uid, &parse_id(&id)?)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn require_identity(
    session: &SessionManager<SqliteIdentityProvider<'_>>,
) -> anyhow::Result<Identity> {
    session
        .current_identity()
        .map_err(auth_failure)?
        .ok_or_else(|| anyhow!("not signed in; run `taskplus login` first"))
}

fn auth_failure(err: AuthError) -> anyhow::Error {
    let message = match err.code {
        AuthErrorCode::InvalidEmail => "invalid email address".to_string(),
        AuthErrorCode::UserNotFound
        | AuthErrorCode::WrongPassword
        | AuthErrorCode::InvalidCredential => "incorrect email or password".to_string(),
        AuthErrorCode::EmailAlreadyInUse => "account already exists".to_string(),
        AuthErrorCode::WeakPassword => "password is too weak".to_string(),
        AuthErrorCode::Internal => format!("authentication failed: {}", err.message),
    };
    anyhow!(message)
}

fn parse_id(raw: &str) -> anyhow::Result<DocumentId> {
    DocumentId::parse(raw).ok_or_else(|| anyhow!("invalid id `{raw}`"))
}

/// Bare dates mean the local calendar day; anything else is left to the
/// core normalizer.
fn due_input(raw: &str) -> DateInput {
    let day_start = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|day| first_instant_of_local_day(day, &Local));
    match day_start {
        Some(instant) => DateInput::Instant(instant),
        None => {
            warn!("event=cli_due_date module=cli status=passthrough");
            DateInput::from(raw)
        }
    }
}

fn parse_category(raw: &str) -> Result<Category, String> {
    Category::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category `{raw}`; expected one of {}", known.join("|"))
    })
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::parse(raw)
        .ok_or_else(|| format!("unknown priority `{raw}`; expected low|medium|high"))
}

fn print_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) {
    let mut any = false;
    for task in tasks {
        any = true;
        let due = task
            .due_date
            .map(|due| due.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  [{}] {}  due={}  {}  {}",
            task.id(),
            if task.completed { "x" } else { " " },
            task.title,
            due,
            task.category.as_str(),
            task.priority.as_str()
        );
    }
    if !any {
        println!("no tasks");
    }
}
