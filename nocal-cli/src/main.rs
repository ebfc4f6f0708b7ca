mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nocal_core::NocalConfig;
use tracing_subscriber::EnvFilter;

use crate::commands::Context;

#[derive(Parser)]
#[command(name = "nocal")]
#[command(about = "Create, share and maintain recurring calendar events")]
struct Cli {
    /// Act as this login
    #[arg(long = "as", global = true, env = "NOCAL_LOGIN")]
    login: Option<String>,

    /// Print JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an event and invite its members
    New {
        title: String,

        /// Start time (e.g. "2025-03-20T15:00", RFC 3339 or epoch seconds)
        #[arg(short, long)]
        start: String,

        /// Other participants (comma separated or repeated)
        #[arg(short, long, value_delimiter = ',')]
        members: Vec<String>,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Repeat every N days
        #[arg(long, value_name = "DAYS")]
        every: Option<i64>,
    },
    /// List occurrences you take part in
    Events {
        /// Show events from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Keep store order instead of sorting by time
        #[arg(long)]
        unsorted: bool,
    },
    /// Show one event or occurrence (`<id>` or `<id>#<k>`)
    Show { id: String },
    /// Edit an event, a series, or one occurrence of a series
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// New start time
        #[arg(long)]
        start: Option<String>,

        /// Replace the member list (comma separated)
        #[arg(long, value_delimiter = ',')]
        members: Option<Vec<String>>,

        /// Change the repeat interval, in days
        #[arg(long, value_name = "DAYS")]
        every: Option<i64>,

        /// Turn the targeted occurrence into its own event
        #[arg(long)]
        detach: bool,
    },
    /// Delete an event you authored
    Remove { id: String },
    /// List your pending invitations
    Invites,
    /// Accept an invitation
    Accept { id: String },
    /// Decline a pending invitation
    Reject { id: String },
    /// Batch jobs meant to run from cron
    Maintain {
        #[command(subcommand)]
        job: MaintainJob,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum MaintainJob {
    /// Move past series forward one step and drop past one-off events
    Advance {
        /// Treat this as the current time
        #[arg(long)]
        now: Option<String>,
    },
    /// Remove member index entries that point at nothing
    Prune,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = NocalConfig::load()?;
    if let Commands::Config = cli.command {
        return commands::config::run(&config, cli.json);
    }

    let ctx = Context::open(config, cli.login, cli.json)?;

    match cli.command {
        Commands::New {
            title,
            start,
            members,
            description,
            every,
        } => commands::new::run(&ctx, title, &start, members, description, every),
        Commands::Events { from, to, unsorted } => {
            commands::events::list(&ctx, from.as_deref(), to.as_deref(), !unsorted)
        }
        Commands::Show { id } => commands::events::show(&ctx, &id),
        Commands::Edit {
            id,
            title,
            description,
            start,
            members,
            every,
            detach,
        } => commands::edit::run(
            &ctx,
            commands::edit::EditArgs {
                id,
                title,
                description,
                start,
                members,
                every,
                detach,
            },
        ),
        Commands::Remove { id } => commands::edit::remove(&ctx, &id),
        Commands::Invites => commands::invites::list(&ctx),
        Commands::Accept { id } => commands::invites::accept(&ctx, &id),
        Commands::Reject { id } => commands::invites::reject(&ctx, &id),
        Commands::Maintain { job } => match job {
            MaintainJob::Advance { now } => commands::maintain::advance(&ctx, now.as_deref()),
            MaintainJob::Prune => commands::maintain::prune(&ctx),
        },
        Commands::Config => Ok(()),
    }
}
