use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use roost_core::presence::now_epoch;
use roost_core::session::{self, SessionTokens};
use roost_core::{CoreConfig, CoreEvent, CoreRuntime};

#[derive(Parser)]
#[command(name = "roost-cli")]
#[command(about = "Inspection CLI for the roost client core")]
struct Cli {
    /// Base URL of the hosted backend
    #[arg(long, env = "ROOST_BACKEND_URL")]
    backend_url: String,

    /// Anon API key
    #[arg(long, env = "ROOST_ANON_KEY")]
    anon_key: String,

    /// User id the session is scoped to
    #[arg(long, env = "ROOST_USER_ID")]
    user_id: String,

    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current notification window
    Notifications,

    /// Resolve the presence roster once
    Presence,

    /// Mark one notification read
    MarkRead {
        /// Notification id
        id: String,
    },

    /// Mark every notification read
    MarkAllRead,

    /// Block a follower and attempt to remove their follow row
    RemoveFollower {
        /// User id of the follower
        follower_id: String,
    },

    /// Subscribe to the change feed and print events as they arrive
    Watch,

    /// Store backend-issued session tokens in the OS keyring
    Login {
        /// Access token from the backend auth endpoint
        #[arg(long)]
        access_token: String,

        /// Refresh token, when the backend issued one
        #[arg(long)]
        refresh_token: Option<String>,
    },

    /// Drop the stored session tokens
    Logout,
}

fn print_json(cli: &Cli, value: &serde_json::Value) -> Result<()> {
    let text = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    roost_core::tracing_setup::init_tracing();

    let cli = Cli::parse();

    // Session commands only touch the keyring, never the backend.
    match &cli.command {
        Commands::Login {
            access_token,
            refresh_token,
        } => {
            session::store(&SessionTokens {
                access_token: access_token.clone(),
                refresh_token: refresh_token.clone(),
            })
            .context("storing session")?;
            return print_json(&cli, &json!({ "session": "stored" }));
        }
        Commands::Logout => {
            session::clear().context("clearing session")?;
            return print_json(&cli, &json!({ "session": "cleared" }));
        }
        _ => {}
    }

    let config = CoreConfig::new(&cli.backend_url, &cli.anon_key, &cli.user_id);
    let mut runtime = CoreRuntime::new(config).context("building runtime")?;

    match &cli.command {
        Commands::Notifications => {
            let reconciler = runtime.reconciler();
            reconciler.load_initial().await?;
            let items: Vec<_> = reconciler
                .notifications()
                .into_iter()
                .map(|e| {
                    json!({
                        "id": e.id,
                        "kind": format!("{:?}", e.kind),
                        "title": e.title,
                        "is_read": e.is_read,
                        "created_at": e.created_at,
                        "actor": e.actor.map(|a| a.display_name),
                    })
                })
                .collect();
            print_json(
                &cli,
                &json!({
                    "unread": reconciler.unread_count(),
                    "notifications": items,
                }),
            )?;
        }
        Commands::Presence => {
            let presence = runtime.presence();
            presence.refresh().await?;
            let now = now_epoch();
            let roster: Vec<_> = presence
                .roster()
                .into_iter()
                .map(|r| {
                    json!({
                        "user_id": r.user_id,
                        "display_name": r.display_name,
                        "online": r.is_online(now),
                        "last_seen_at": r.last_seen_at,
                    })
                })
                .collect();
            print_json(&cli, &json!({ "roster": roster }))?;
        }
        Commands::MarkRead { id } => {
            let reconciler = runtime.reconciler();
            reconciler.load_initial().await?;
            reconciler.mark_read(id).await?;
            print_json(&cli, &json!({ "unread": reconciler.unread_count() }))?;
        }
        Commands::MarkAllRead => {
            let reconciler = runtime.reconciler();
            reconciler.load_initial().await?;
            reconciler.mark_all_read().await?;
            print_json(&cli, &json!({ "unread": reconciler.unread_count() }))?;
        }
        Commands::RemoveFollower { follower_id } => {
            let outcome = runtime.social().remove_follower(follower_id).await?;
            print_json(&cli, &json!({ "outcome": outcome.to_string() }))?;
        }
        Commands::Watch => {
            runtime.start().await?;
            let mut events = runtime
                .take_event_rx()
                .context("event channel already taken")?;
            eprintln!("watching change feed, ctrl-c to stop");
            loop {
                tokio::select! {
                    event = events.recv() => {
                        match event {
                            Some(CoreEvent::NotificationInserted(e)) => {
                                print_json(&cli, &json!({
                                    "event": "inserted",
                                    "id": e.id,
                                    "title": e.title,
                                }))?;
                            }
                            Some(CoreEvent::NotificationUpdated { id }) => {
                                print_json(&cli, &json!({ "event": "updated", "id": id }))?;
                            }
                            None => break,
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            runtime.shutdown().await;
        }
        // Handled before the runtime was built.
        Commands::Login { .. } | Commands::Logout => {}
    }

    Ok(())
}
