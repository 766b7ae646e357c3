use clap::Parser;
mod app;
mod commands;
mod progress;
use commands::cli;
use taskflow_core::config::{self, LoggingConfig};
use taskflow_core::error::CliError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

/// Conventional exit code after a second interrupt.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = config::load_default(args.config.as_deref())?;
    init_tracing(&cfg.logging, args.quiet).map_err(CliError::Command)?;

    let presentation = app::Presentation {
        quiet: args.quiet,
        progress: !args.no_progress && atty::is(atty::Stream::Stderr),
    };
    let app = app::App::build(&cfg, presentation).await?;
    spawn_interrupt_handler(app.engine().clone());

    let exit = dispatch(args.command, &app).await;
    app.shutdown().await;
    exit
}

async fn dispatch(cmd: cli::Commands, app: &app::App) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Run(run_args) => app.run_workflow(&run_args).await,
        cli::Commands::Task(task_args) => app.run_task(&task_args).await,
        cli::Commands::Plan(plan_args) => app.plan(&plan_args),
        cli::Commands::List => app.list(),
        cli::Commands::Validate => app.validate(),
    }
}

/// First Ctrl-C stops every running task; a second one exits immediately.
fn spawn_interrupt_handler(engine: std::sync::Arc<taskflow_core::ExecutionEngine>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        let stopped = engine.stop_all_tasks();
        tracing::warn!(stopped, "interrupt received, stopping running tasks");

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
}

fn init_tracing(logging: &LoggingConfig, quiet: bool) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ if quiet => EnvFilter::try_new("warn").map_err(|e| e.to_string())?,
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("taskflow"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("taskflow.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
