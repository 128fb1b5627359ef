use anyhow::{anyhow, Context, Result};
use chrono::Weekday;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::env;
use std::process;

use gitflow_release::config::{self, Config};
use gitflow_release::domain::{
    current_possible_versions_hotfix, next_possible_versions_develop,
    next_possible_versions_hotfix, SemanticVersion,
};
use gitflow_release::git::Git2Repository;
use gitflow_release::metadata::MetadataUpdater;
use gitflow_release::release::{self, ReleaseContext, Session};
use gitflow_release::tracker::{authenticate, Credentials, IssueTracker, JiraTracker, VersionSync};
use gitflow_release::ui::{ConsoleOutput, LinePrompter, Output, Prompter, TerminalPrompter};

#[derive(Parser)]
#[command(
    name = "gitflow-release",
    version,
    about = "Cut, continue and publish git-flow releases"
)]
struct Cli {
    #[arg(long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Read answers line by line from stdin instead of interactive prompts"
    )]
    non_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Release from the current branch (develop, release, or hotfix)
    #[command(alias = "Release-Version")]
    ReleaseVersion {
        #[arg(short = 'c', long, help = "Fork the release from this commit instead of develop")]
        commit_hash: Option<String>,

        #[arg(short, long, help = "Stop after the version commits")]
        pause_for_commit: bool,

        #[arg(short, long, help = "Do not push or update the issue tracker")]
        no_push: bool,
    },

    /// Finish the release or pre-release on the current branch
    #[command(alias = "Close-Version")]
    CloseVersion {
        #[arg(short, long, help = "Branch to merge a pre-release back into")]
        ancestor: Option<String>,

        #[arg(short, long, help = "Do not push or update the issue tracker")]
        no_push: bool,
    },

    /// Open the next release or hotfix branch without completing a release
    #[command(alias = "New-Release-Branch")]
    NewReleaseBranch {
        #[arg(short = 'c', long, help = "Fork the release from this commit instead of develop")]
        commit_hash: Option<String>,

        #[arg(short, long, help = "Stop after the version commits")]
        pause_for_commit: bool,

        #[arg(short, long, help = "Do not push the new branches")]
        no_push: bool,
    },

    /// Push the branches and tag belonging to the current branch
    #[command(alias = "Push-Remote-Repositories")]
    PushRemoteRepositories,

    /// Create the tracker version following the highest one matching a pattern
    #[command(alias = "Next-Tracker-Version")]
    NextTrackerVersion {
        #[arg(long, help = "Regex selecting the version series")]
        pattern: String,

        #[arg(long, default_value_t = 1, help = "Numeric component to increment (0-based)")]
        component: usize,

        #[arg(long, default_value = "Mon", help = "Weekday of the new release date")]
        weekday: String,
    },

    /// Print the candidate versions offered after a version
    Versions {
        version: String,

        #[arg(long, help = "Show the hotfix menus")]
        hotfix: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let output = ConsoleOutput::new();

    if let Err(e) = run(cli, &output) {
        output.error(&format!("{:#}", e));
        process::exit(1);
    }
}

fn run(cli: Cli, output: &ConsoleOutput) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let prompter: Box<dyn Prompter> = if cli.non_interactive {
        Box::new(LinePrompter::stdin())
    } else {
        Box::new(TerminalPrompter::new())
    };

    let syncs_tracker = !matches!(cli.command, Command::PushRemoteRepositories);
    let (context, action): (ReleaseContext, fn(&Session<'_>) -> gitflow_release::Result<()>) =
        match cli.command {
            Command::Versions { version, hotfix } => return print_versions(&version, hotfix),
            Command::NextTrackerVersion {
                pattern,
                component,
                weekday,
            } => {
                let weekday: Weekday = weekday
                    .parse()
                    .map_err(|_| anyhow!("'{}' is not a weekday", weekday))?;
                let tracker = connect_tracker(&config, prompter.as_ref(), output)?
                    .ok_or_else(|| anyhow!("No [tracker] section configured"))?;
                let created = VersionSync::new(&tracker, output)
                    .create_subsequent_version(&pattern, component, weekday)?;
                output.success(&format!("Created tracker version '{}'", created.name));
                return Ok(());
            }
            Command::ReleaseVersion {
                commit_hash,
                pause_for_commit,
                no_push,
            } => (
                ReleaseContext {
                    commit_hash,
                    pause_for_commit,
                    no_push,
                    ..ReleaseContext::default()
                },
                release::start_release,
            ),
            Command::NewReleaseBranch {
                commit_hash,
                pause_for_commit,
                no_push,
            } => (
                ReleaseContext {
                    commit_hash,
                    pause_for_commit,
                    no_push,
                    start_release_phase: true,
                    ..ReleaseContext::default()
                },
                release::start_release,
            ),
            Command::CloseVersion { ancestor, no_push } => (
                ReleaseContext {
                    ancestor,
                    no_push,
                    ..ReleaseContext::default()
                },
                release::continue_release,
            ),
            Command::PushRemoteRepositories => (
                ReleaseContext::default(),
                release::push_remote_repositories,
            ),
        };

    let repo = Git2Repository::open(".").context("Not inside a git repository")?;
    let metadata = MetadataUpdater::new(config.metadata.clone());
    let tracker = if syncs_tracker && !context.no_push && !context.start_release_phase {
        connect_tracker(&config, prompter.as_ref(), output)?
    } else {
        None
    };

    let session = Session {
        repo: &repo,
        prompter: prompter.as_ref(),
        output,
        config: &config,
        metadata: &metadata,
        tracker: tracker.as_ref().map(|t| t as &dyn IssueTracker),
        context,
    };
    action(&session)?;
    Ok(())
}

/// Log in to the configured tracker, if any
fn connect_tracker(
    config: &Config,
    prompter: &dyn Prompter,
    output: &dyn Output,
) -> Result<Option<JiraTracker>> {
    let Some(settings) = &config.tracker else {
        return Ok(None);
    };

    let initial = match (env::var(&settings.token_env).ok(), &settings.username) {
        (Some(token), Some(username)) => Some(Credentials {
            username: username.clone(),
            token: SecretString::from(token),
        }),
        _ => None,
    };

    let tracker = authenticate(
        prompter,
        output,
        settings.username.as_deref(),
        initial,
        |credentials| JiraTracker::new(&settings.url, &settings.project, credentials),
    )?;
    Ok(Some(tracker))
}

fn print_versions(version: &str, hotfix: bool) -> Result<()> {
    let version = SemanticVersion::from_tag(version)?;

    let menus: Vec<(&str, Vec<SemanticVersion>)> = if hotfix {
        vec![
            ("Current hotfix", current_possible_versions_hotfix(&version)),
            ("Next hotfix", next_possible_versions_hotfix(&version)),
        ]
    } else {
        vec![
            ("Release", next_possible_versions_develop(&version, false)),
            ("Next development", next_possible_versions_develop(&version, true)),
        ]
    };

    for (title, candidates) in menus {
        println!("{} versions after {}:", title, version);
        for (i, candidate) in candidates.iter().enumerate() {
            println!("  {}. {}", i + 1, candidate);
        }
    }
    Ok(())
}
