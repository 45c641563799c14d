use clap::{Arg, ArgMatches, Command};
use color_eyre::Result;
use std::str::FromStr;
use std::sync::Arc;

mod adapters;
mod application;
mod domain;
mod ports;

use adapters::{
    api::{ApiClient, HttpTaskRepository},
    config::FileConfigStore,
    console::ConsoleApp,
};
use application::{visible, AppError, MutationCoordinator, MutationOutcome};
use domain::{
    AdvancedFilters, Priority, Session, SortKey, SortOrder, StatusFilter, TaskDraft, TaskId,
    TaskPatch, TaskQuery, UserId,
};
use ports::ConfigStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize color-eyre for better error reporting
    color_eyre::install()?;

    // Initialize logging to file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("todo-cli.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let matches = Command::new("todo-cli")
        .version("0.1.0")
        .about("A terminal client for a remote task API")
        .long_about("A keyboard-driven client for managing tasks on a remote task API.\n\nRun without a subcommand for an interactive session with undo support;\nsubcommands print JSON for scripting.")
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("API bearer token (can also be set via TODO_TOKEN env var)")
                .global(true),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .value_name("USER_ID")
                .help("User id (UUID) owning the tasks")
                .global(true),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("Base URL of the task API")
                .global(true),
        )
        .subcommand(
            Command::new("list")
                .about("List tasks as JSON")
                .arg(Arg::new("status").long("status").value_name("all|pending|completed"))
                .arg(Arg::new("priority").long("priority").value_name("PRIORITY"))
                .arg(Arg::new("tag").long("tag").value_name("TAG"))
                .arg(Arg::new("due-from").long("due-from").value_name("YYYY-MM-DD"))
                .arg(Arg::new("due-to").long("due-to").value_name("YYYY-MM-DD"))
                .arg(Arg::new("sort").long("sort").value_name("created_at|due_date|priority|title"))
                .arg(Arg::new("order").long("order").value_name("asc|desc"))
                .arg(Arg::new("search").long("search").value_name("TERM")),
        )
        .subcommand(
            Command::new("add")
                .about("Create a task")
                .arg(Arg::new("title").help("Task title").required(true).index(1))
                .arg(Arg::new("description").long("description").value_name("TEXT"))
                .arg(Arg::new("priority").long("priority").value_name("PRIORITY"))
                .arg(Arg::new("due").long("due").value_name("YYYY-MM-DD"))
                .arg(Arg::new("tags").long("tags").value_name("a,b,c")),
        )
        .subcommand(
            Command::new("edit")
                .about("Update fields of a task")
                .arg(Arg::new("task_id").help("Task id").required(true).index(1))
                .arg(Arg::new("title").long("title").value_name("TEXT"))
                .arg(Arg::new("description").long("description").value_name("TEXT"))
                .arg(Arg::new("priority").long("priority").value_name("PRIORITY"))
                .arg(Arg::new("due").long("due").value_name("YYYY-MM-DD"))
                .arg(Arg::new("tags").long("tags").value_name("a,b,c")),
        )
        .subcommand(
            Command::new("done")
                .about("Toggle completion of a task")
                .arg(Arg::new("task_id").help("Task id").required(true).index(1)),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a task")
                .arg(Arg::new("task_id").help("Task id").required(true).index(1)),
        )
        .get_matches();

    // Load configuration
    let config_store = Arc::new(FileConfigStore::new()?);
    let mut config = config_store.load_config().await?;

    // Override with command line arguments or environment variables
    if let Some(token) = matches.get_one::<String>("token") {
        config.api_token = Some(token.clone());
    } else if let Ok(token) = std::env::var("TODO_TOKEN") {
        config.api_token = Some(token);
    }

    if let Some(user) = matches.get_one::<String>("user") {
        config.user_id = Some(
            UserId::from_str(user)
                .map_err(|e| AppError::Application(format!("user id must be a UUID: {e}")))?,
        );
    }

    if let Some(url) = matches.get_one::<String>("api-url") {
        config.api_base_url = url.clone();
    }

    let api_token = config.api_token.clone().ok_or_else(|| {
        eprintln!("No API token found!");
        eprintln!();
        eprintln!("To get started:");
        eprintln!("1. Run: export TODO_TOKEN=your_token_here");
        eprintln!("2. Or run: todo-cli --token your_token_here");
        eprintln!();
        AppError::AuthenticationRequired
    })?;

    let user_id = config.user_id.ok_or_else(|| {
        eprintln!("No user configured!");
        eprintln!();
        eprintln!("Run: todo-cli --user <USER_UUID>");
        eprintln!("The id is remembered for future runs.");
        eprintln!();
        AppError::UserNotConfigured
    })?;

    // Save config if we got new values
    config_store.save_config(&config).await?;

    // Create dependencies
    let api_client = ApiClient::new(config.api_base_url.clone());
    let repository = Arc::new(HttpTaskRepository::new(api_client));
    let session = Session::new(user_id, api_token);
    let mut coordinator = MutationCoordinator::new(repository);

    match matches.subcommand() {
        Some(("list", list_matches)) => {
            let query = build_query(list_matches)?;
            if !coordinator.refresh(&session, &query).await {
                fail(&mut coordinator);
            }
            let tasks = visible(
                coordinator.store().tasks(),
                query.status,
                query.search.as_deref().unwrap_or(""),
                &query.advanced,
            );
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        Some(("add", add_matches)) => {
            let draft = build_draft(add_matches)?;
            match coordinator.create(&session, draft).await {
                Ok(MutationOutcome::Confirmed) => {
                    let created = &coordinator.store().tasks()[0];
                    println!("{}", serde_json::to_string_pretty(created)?);
                }
                Ok(MutationOutcome::RolledBack) => fail(&mut coordinator),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        Some(("edit", edit_matches)) => {
            let id = parse_task_id(edit_matches)?;
            let patch = build_patch(edit_matches)?;
            if !coordinator.refresh(&session, &TaskQuery::default()).await {
                fail(&mut coordinator);
            }
            match coordinator.update(&session, &id, patch).await {
                Ok(MutationOutcome::Confirmed) => match coordinator.store().get(&id) {
                    Some(task) => println!("{}", serde_json::to_string_pretty(task)?),
                    None => {
                        eprintln!("Task {id} not found");
                        std::process::exit(1);
                    }
                },
                Ok(MutationOutcome::RolledBack) => fail(&mut coordinator),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        Some(("done", done_matches)) => {
            let id = parse_task_id(done_matches)?;
            if !coordinator.refresh(&session, &TaskQuery::default()).await {
                fail(&mut coordinator);
            }
            match coordinator.toggle_complete(&session, &id).await {
                MutationOutcome::Confirmed => match coordinator.store().get(&id) {
                    Some(task) => println!("{}", serde_json::to_string_pretty(task)?),
                    None => {
                        eprintln!("Task {id} not found");
                        std::process::exit(1);
                    }
                },
                MutationOutcome::RolledBack => fail(&mut coordinator),
            }
        }
        Some(("rm", rm_matches)) => {
            let id = parse_task_id(rm_matches)?;
            if !coordinator.refresh(&session, &TaskQuery::default()).await {
                fail(&mut coordinator);
            }
            match coordinator.delete(&session, &id).await {
                MutationOutcome::Confirmed => println!("Task {id} deleted."),
                MutationOutcome::RolledBack => fail(&mut coordinator),
            }
        }
        None => {
            // Default behavior - run the interactive console session
            let app = ConsoleApp::new(coordinator, session);
            if let Err(e) = app.run().await {
                eprintln!("Application error: {e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Unknown command");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Print the coordinator's error banner and exit non-zero.
fn fail(coordinator: &mut MutationCoordinator) -> ! {
    if let Some(message) = coordinator.take_error() {
        eprintln!("{message}");
    }
    std::process::exit(1);
}

fn parse_task_id(matches: &ArgMatches) -> Result<TaskId, AppError> {
    let raw = matches
        .get_one::<String>("task_id")
        .expect("task_id is a required argument");
    raw.parse::<i64>()
        .map(TaskId)
        .map_err(|_| AppError::Application(format!("invalid task id: {raw}")))
}

fn build_query(matches: &ArgMatches) -> Result<TaskQuery, AppError> {
    let mut advanced = AdvancedFilters::default();
    if let Some(raw) = matches.get_one::<String>("priority") {
        advanced.priority = Some(parse_flag::<Priority>(raw)?);
    }
    advanced.tag = matches.get_one::<String>("tag").cloned();
    if let Some(raw) = matches.get_one::<String>("due-from") {
        advanced.due_date_from = Some(parse_date_flag(raw)?);
    }
    if let Some(raw) = matches.get_one::<String>("due-to") {
        advanced.due_date_to = Some(parse_date_flag(raw)?);
    }
    if let Some(raw) = matches.get_one::<String>("sort") {
        advanced.sort_by = Some(parse_flag::<SortKey>(raw)?);
    }
    if let Some(raw) = matches.get_one::<String>("order") {
        advanced.sort_order = parse_flag::<SortOrder>(raw)?;
    }

    Ok(TaskQuery {
        status: match matches.get_one::<String>("status") {
            Some(raw) => parse_flag::<StatusFilter>(raw)?,
            None => StatusFilter::All,
        },
        search: matches.get_one::<String>("search").cloned(),
        advanced,
    })
}

fn build_draft(matches: &ArgMatches) -> Result<TaskDraft, AppError> {
    let mut draft = TaskDraft::new(
        matches
            .get_one::<String>("title")
            .expect("title is a required argument")
            .clone(),
    );
    draft.description = matches.get_one::<String>("description").cloned();
    if let Some(raw) = matches.get_one::<String>("priority") {
        draft.priority = Some(parse_flag::<Priority>(raw)?);
    }
    if let Some(raw) = matches.get_one::<String>("due") {
        draft.due_date = Some(parse_date_flag(raw)?.and_hms_opt(0, 0, 0).unwrap().and_utc());
    }
    draft.tags = matches.get_one::<String>("tags").cloned();
    Ok(draft)
}

fn build_patch(matches: &ArgMatches) -> Result<TaskPatch, AppError> {
    let mut patch = TaskPatch {
        title: matches.get_one::<String>("title").cloned(),
        description: matches.get_one::<String>("description").cloned(),
        tags: matches.get_one::<String>("tags").cloned(),
        ..Default::default()
    };
    if let Some(raw) = matches.get_one::<String>("priority") {
        patch.priority = Some(parse_flag::<Priority>(raw)?);
    }
    if let Some(raw) = matches.get_one::<String>("due") {
        patch.due_date = if raw.eq_ignore_ascii_case("none") {
            Some(None)
        } else {
            Some(Some(parse_date_flag(raw)?.and_hms_opt(0, 0, 0).unwrap().and_utc()))
        };
    }
    Ok(patch)
}

fn parse_flag<T: FromStr<Err = String>>(raw: &str) -> Result<T, AppError> {
    raw.parse::<T>().map_err(AppError::Application)
}

fn parse_date_flag(raw: &str) -> Result<chrono::NaiveDate, AppError> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Application(format!("invalid date (expected YYYY-MM-DD): {raw}")))
}
