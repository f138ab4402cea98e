use clap::{Parser, Subcommand};
use leadops_audit::AuditEventType;
use leadops_core::{IdentityKey, MemberRole};
use leadops_runtime::UserRef;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "leadops",
    version,
    about = "Workspace membership and WhatsApp binding consistency tool"
)]
struct Cli {
    /// Path to leadops.yaml. Defaults to ./leadops.yaml when present.
    #[arg(long, short = 'c', global = true, env = "LEADOPS_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins when set).
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert missing memberships for every profile with a current workspace.
    Reconcile {
        /// Report what would be inserted without writing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Profile column used as the member identity (user_id or profile_id).
        #[arg(long)]
        identity_key: Option<IdentityKey>,

        /// Role given to inserted memberships.
        #[arg(long)]
        role: Option<MemberRole>,

        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Verify (and optionally repair) one user's membership in a workspace.
    EnsureMember {
        /// User id (UUID) or profile email.
        #[arg(long)]
        user: UserRef,

        #[arg(long)]
        workspace: Uuid,

        #[arg(long)]
        role: Option<MemberRole>,

        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Change the role of an existing membership when it differs.
        #[arg(long, default_value_t = false)]
        update_role: bool,

        /// Identity used when --user is an email.
        #[arg(long)]
        identity_key: Option<IdentityKey>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compare gateway instances with workspace claims.
    AuditBindings {
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Exit with an error when anything is unbound or conflicting.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Read-only views of tenant data.
    Inspect {
        #[command(subcommand)]
        cmd: InspectCommand,
    },

    /// Show recent audit events from the audit file.
    History {
        #[arg(long)]
        workspace: Option<Uuid>,

        /// Event type, e.g. membership_inserted.
        #[arg(long = "type")]
        event_type: Option<AuditEventType>,

        #[arg(long)]
        run: Option<Uuid>,

        #[arg(long, default_value_t = 50)]
        limit: usize,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Validate configuration and print resolved settings.
    Check {
        /// Also connect to the database and verify the expected tables.
        #[arg(long, default_value_t = false)]
        connect: bool,
    },
}

#[derive(Subcommand, Debug)]
enum InspectCommand {
    /// List workspaces with their claimed gateway instance.
    Workspaces {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Members, connections, leads and billing state for one workspace.
    Workspace {
        id: Uuid,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Reconcile {
            dry_run,
            identity_key,
            role,
            json,
        } => {
            commands::reconcile::run(
                &config,
                commands::reconcile::ReconcileArgs {
                    dry_run,
                    identity_key,
                    role,
                    json,
                },
            )
            .await?
        }

        Command::EnsureMember {
            user,
            workspace,
            role,
            dry_run,
            update_role,
            identity_key,
            json,
        } => {
            let request = leadops_runtime::EnsureRequest {
                workspace_id: workspace,
                user,
                role: role.unwrap_or(config.reconcile.default_role),
                update_role,
                dry_run,
                identity_key: identity_key.unwrap_or(config.reconcile.identity_key),
            };
            commands::ensure::run(&config, &request, json).await?
        }

        Command::AuditBindings { json, strict } => {
            commands::bindings::run(&config, json, strict).await?
        }

        Command::Inspect { cmd } => match cmd {
            InspectCommand::Workspaces { json } => {
                commands::inspect::run_workspaces(&config, json).await?
            }
            InspectCommand::Workspace { id, json } => {
                commands::inspect::run_workspace(&config, id, json).await?
            }
        },

        Command::History {
            workspace,
            event_type,
            run,
            limit,
            json,
        } => {
            let filter = leadops_audit::AuditFilter {
                workspace_id: workspace,
                event_type,
                run_id: run,
                limit: Some(limit),
            };
            commands::history::run(&config, filter, json).await?
        }

        Command::Check { connect } => commands::check::run(&config, connect).await?,
    }

    Ok(())
}
