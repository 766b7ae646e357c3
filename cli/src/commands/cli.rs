use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "taskflow", version, about = "Run build and verification tasks in dependency order")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ./taskflow.toml, then ~/.taskflow/config.toml.
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Do not stream task output.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a named workflow.
    Run(RunArgs),
    /// Run a single task by id.
    Task(TaskArgs),
    /// Print the order a workflow would run in.
    Plan(PlanArgs),
    /// List tasks and workflows.
    List,
    /// Check the task and workflow catalogue.
    Validate,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    pub workflow: String,

    /// Print the workflow report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TaskArgs {
    pub id: String,

    /// Print the task result as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    pub workflow: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_work_after_subcommand() {
        let args = Args::try_parse_from(["taskflow", "run", "ci", "--quiet", "--config", "x.toml"]).unwrap();
        assert!(args.quiet);
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("x.toml")));
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.workflow, "ci");
                assert!(!run.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn task_requires_an_id() {
        assert!(Args::try_parse_from(["taskflow", "task"]).is_err());
        let args = Args::try_parse_from(["taskflow", "task", "lint", "--json"]).unwrap();
        assert!(matches!(args.command, Commands::Task(TaskArgs { ref id, json: true }) if id == "lint"));
    }
}
