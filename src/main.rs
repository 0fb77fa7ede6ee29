//! Crewtask CLI - a shared task tracker for small teams.

use clap::Parser;
use crewtask::action_log::{self, ActionLog};
use crewtask::cli::{
    Cli, Commands, ConfigCommands, GroupCommands, SuggestionCommands, SystemCommands,
    TaskCommands, UserCommands,
};
use crewtask::commands::{self, CreateTaskArgs, Output, Session};
use crewtask::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use crewtask::models::Context;
use crewtask::storage::{Storage, get_data_dir};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "CT_LOG";

fn main() {
    let cli = Cli::parse();
    let mut human = cli.human_readable;

    let (data_dir, config) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => fail(&e, human),
    };
    init_tracing(&config);
    human = human || config.output_format() == OutputFormat::Human;

    let today = match cli.today.as_deref().map(commands::parse_today).transpose() {
        Ok(today) => today,
        Err(e) => fail(&e, human),
    };
    let session = Session::new(data_dir.clone(), config.clone(), today);

    let cmd_name = cli.command.name();
    let args_json = cli.command.args();
    let start = Instant::now();

    let result = run_command(cli.command, &session, human);

    let duration = start.elapsed().as_millis() as u64;
    if config.action_log() && Storage::exists(&data_dir) {
        action_log::log_action(
            &data_dir,
            ActionLog {
                timestamp: chrono::Utc::now(),
                command: cmd_name,
                args: args_json,
                success: result.is_ok(),
                error: result.as_ref().err().map(|e| e.to_string()),
                duration_ms: duration,
                user: config.viewer().to_string(),
            },
        );
    }

    if let Err(e) = result {
        fail(&e, human);
    }
}

/// Resolve the data directory and configuration.
fn prepare(cli: &Cli) -> Result<(PathBuf, ResolvedConfig), crewtask::Error> {
    let data_dir = get_data_dir()?;
    let mut overrides = ConfigOverrides::new();
    if let Some(user) = &cli.as_user {
        overrides = overrides.with_viewer(user.trim());
    }
    if let Some(context) = &cli.context {
        let context = Context::parse(context).ok_or_else(|| {
            crewtask::Error::InvalidInput(format!(
                "context must be work or personal, got {}",
                context
            ))
        })?;
        overrides = overrides.with_context(context);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let config = resolve_config(&data_dir, &overrides)?;
    Ok((data_dir, config))
}

/// Log to stderr so stdout stays machine-readable.
///
/// Filter: `CT_LOG`, else the configured `log-level`, else `warn`.
fn init_tracing(config: &ResolvedConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(config.log_level().unwrap_or("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(error: &crewtask::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
    process::exit(1);
}

fn run_command(command: Commands, session: &Session, human: bool) -> Result<(), crewtask::Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => output(&commands::system_init(&session.data_dir)?, human),
            SystemCommands::Compact => output(&commands::system_compact(&session.data_dir)?, human),
            SystemCommands::Log { limit } => {
                output(&commands::system_log(&session.data_dir, limit)?, human)
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(session), human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(&session.data_dir, &key, &value)?, human)
            }
        },

        Commands::User { command } => match command {
            UserCommands::Add {
                id,
                name,
                avatar,
                email,
            } => output(&commands::user_add(session, &id, &name, avatar, email)?, human),
            UserCommands::List => output(&commands::user_list(session)?, human),
        },

        Commands::Group { command } => match command {
            GroupCommands::Create { name, kind } => {
                output(&commands::group_create(session, &name, &kind)?, human)
            }
            GroupCommands::List => output(&commands::group_list(session)?, human),
            GroupCommands::Join { code } => output(&commands::group_join(session, &code)?, human),
            GroupCommands::Leave { id } => output(&commands::group_leave(session, &id)?, human),
            GroupCommands::Delete { id } => output(&commands::group_delete(session, &id)?, human),
            GroupCommands::Leaderboard { id } => {
                output(&commands::group_leaderboard(session, &id)?, human)
            }
        },

        Commands::Task { command } => match command {
            TaskCommands::Create {
                title,
                group,
                assignee,
                category,
                due,
                time,
                priority,
            } => {
                let args = CreateTaskArgs {
                    title,
                    group,
                    assignees: assignee,
                    category,
                    due,
                    time,
                    priority,
                };
                output(&commands::task_create(session, args)?, human)
            }
            TaskCommands::List { group, status } => output(
                &commands::task_list(session, &group, status.as_deref())?,
                human,
            ),
            TaskCommands::Show { id } => output(&commands::task_show(session, &id)?, human),
            TaskCommands::Act { id } => output(&commands::task_act(session, &id)?, human),
            TaskCommands::Postpone { id, reason } => output(
                &commands::task_postpone(session, &id, reason.as_deref())?,
                human,
            ),
            TaskCommands::Block { id, reason } => {
                output(&commands::task_block(session, &id, &reason)?, human)
            }
            TaskCommands::Unblock { id } => output(&commands::task_unblock(session, &id)?, human),
            TaskCommands::Restore {
                id,
                assignee,
                due,
                time,
            } => output(
                &commands::task_restore(session, &id, assignee, &due, time)?,
                human,
            ),
            TaskCommands::Comment { id, text } => {
                output(&commands::task_comment(session, &id, &text)?, human)
            }
            TaskCommands::Read { id } => output(&commands::task_read(session, &id)?, human),
        },

        Commands::Summary { group } => output(&commands::summary(session, &group)?, human),

        Commands::Weekly { group, greeting } => {
            output(&commands::weekly(session, &group, greeting)?, human)
        }

        Commands::Feed { group } => output(&commands::feed(session, &group)?, human),

        Commands::Suggestion { command } => match command {
            SuggestionCommands::Dismiss { id } => {
                output(&commands::suggestion_dismiss(session, &id)?, human)
            }
        },

        Commands::DetectDate { text } => output(&commands::detect_date(session, &text), human),

        Commands::Push { event } => output(&commands::push(session, &event)?, human),
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
