//! Gatekeep CLI — `gatectl` command.
//!
//! Administers a file-backed access controller: register and edit
//! identities, read or clear the access log, and push simulated reader
//! scans through the authentication pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use gatekeep::time::{now_secs, secs_to_rfc3339};
use gatekeep::token::parse_uid;
use gatekeep::{
    AccessController, AccessEvent, ControllerConfig, Decision, FileStore, Identity, IdentityId,
    IdentityUpdate, ScanEvent, Tier,
};

type Controller = AccessController<FileStore>;

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".gatekeep"),
        None => PathBuf::from(".gatekeep"),
    }
}

fn open_controller(data_dir: &Path) -> Result<Controller> {
    log::debug!("using data directory {}", data_dir.display());
    let config = ControllerConfig::load(&data_dir.join("config.json"))
        .with_context(|| format!("failed to load config from {}", data_dir.display()))?;
    let store = FileStore::open(data_dir)
        .with_context(|| format!("failed to open store in {}", data_dir.display()))?;
    AccessController::open(store, config).context("failed to open controller")
}

// ── Output helpers ────────────────────────────────────────────────────────────

fn format_time(secs: u64) -> String {
    if secs == 0 {
        "never".to_string()
    } else {
        secs_to_rfc3339(secs)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn print_identity(identity: &Identity) {
    println!("Identity {}", identity.id);
    println!("  Name:      {}", identity.name);
    println!("  Token:     {}", identity.token);
    println!("  Tier:      {}", identity.tier);
    println!("  Active:    {}", identity.active);
    println!("  Created:   {}", format_time(identity.created_at));
    println!("  Last seen: {}", format_time(identity.last_seen));
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Gatekeep CLI — administer an RFID access controller's identities and log.
#[derive(Parser, Debug)]
#[command(
    name = "gatectl",
    about = "Gatekeep access controller CLI",
    version,
    long_about = "gatectl — Gatekeep access controller CLI\n\nManage registered card holders, inspect or clear the access log,\nand simulate reader scans against a file-backed store."
)]
struct Cli {
    /// Directory holding namespace.json and config.json (default: ~/.gatekeep)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage registered identities
    User {
        #[command(subcommand)]
        subcommand: UserCommands,
    },

    /// Inspect or clear the access log
    Log {
        #[command(subcommand)]
        subcommand: LogCommands,
    },

    /// Simulate one reader scan
    Scan {
        /// Card UID as hex, with or without colons (e.g. 04:A3:1F or 04a31f)
        uid: String,
    },

    /// Show counters and configuration
    Status,
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// Register a new identity
    Add {
        #[arg(long)]
        name: String,

        /// Card token (e.g. AA:BB:CC)
        #[arg(long)]
        token: String,

        /// member, trainer or admin (or 1-3)
        #[arg(long, default_value = "member")]
        tier: Tier,
    },

    /// Change fields of an identity
    Update {
        id: IdentityId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        token: Option<String>,

        #[arg(long)]
        tier: Option<Tier>,
    },

    /// Deactivate an identity (its token becomes reusable)
    Delete { id: IdentityId },

    /// Show one identity, active or not
    Show { id: IdentityId },

    /// List active identities
    List {
        /// Maximum number to display (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommands {
    /// Show the most recent access events, oldest first
    List {
        /// Maximum number to display (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Erase every access event
    Clear,
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let json = cli.json;

    let result = match cli.command {
        Commands::User { subcommand } => match subcommand {
            UserCommands::Add { name, token, tier } => {
                cmd_user_add(&data_dir, &name, &token, tier, json)
            }
            UserCommands::Update {
                id,
                name,
                token,
                tier,
            } => cmd_user_update(&data_dir, id, IdentityUpdate { name, token, tier }, json),
            UserCommands::Delete { id } => cmd_user_delete(&data_dir, id, json),
            UserCommands::Show { id } => cmd_user_show(&data_dir, id, json),
            UserCommands::List { limit } => cmd_user_list(&data_dir, limit, json),
        },
        Commands::Log { subcommand } => match subcommand {
            LogCommands::List { limit } => cmd_log_list(&data_dir, limit, json),
            LogCommands::Clear => cmd_log_clear(&data_dir, json),
        },
        Commands::Scan { uid } => cmd_scan(&data_dir, &uid, json),
        Commands::Status => cmd_status(&data_dir, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── User commands ─────────────────────────────────────────────────────────────

/// `gatectl user add --name NAME --token TOKEN [--tier TIER]`
fn cmd_user_add(data_dir: &Path, name: &str, token: &str, tier: Tier, json: bool) -> Result<()> {
    let mut ctl = open_controller(data_dir)?;
    let id = ctl
        .create_identity(name, token, tier)
        .context("failed to create identity")?;
    let identity = ctl.get_identity(id)?;

    if json {
        return print_json(&identity);
    }
    println!("Created identity {id}");
    println!("  Name:  {}", identity.name);
    println!("  Token: {}", identity.token);
    println!("  Tier:  {}", identity.tier);
    Ok(())
}

/// `gatectl user update ID [--name NAME] [--token TOKEN] [--tier TIER]`
fn cmd_user_update(
    data_dir: &Path,
    id: IdentityId,
    changes: IdentityUpdate,
    json: bool,
) -> Result<()> {
    if changes.is_empty() {
        anyhow::bail!("nothing to update (pass --name, --token or --tier)");
    }
    let mut ctl = open_controller(data_dir)?;
    ctl.update_identity(id, changes)
        .with_context(|| format!("failed to update identity {id}"))?;
    let identity = ctl.get_identity(id)?;

    if json {
        return print_json(&identity);
    }
    println!("Updated identity {id}");
    print_identity(&identity);
    Ok(())
}

/// `gatectl user delete ID`
fn cmd_user_delete(data_dir: &Path, id: IdentityId, json: bool) -> Result<()> {
    let mut ctl = open_controller(data_dir)?;
    ctl.delete_identity(id)
        .with_context(|| format!("failed to delete identity {id}"))?;

    if json {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("Deactivated identity {id}");
    Ok(())
}

/// `gatectl user show ID`
fn cmd_user_show(data_dir: &Path, id: IdentityId, json: bool) -> Result<()> {
    let ctl = open_controller(data_dir)?;
    let identity = ctl
        .get_identity(id)
        .with_context(|| format!("failed to read identity {id}"))?;

    if json {
        return print_json(&identity);
    }
    print_identity(&identity);
    Ok(())
}

/// `gatectl user list [--limit N]`
fn cmd_user_list(data_dir: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let ctl = open_controller(data_dir)?;
    let identities = ctl
        .list_identities(limit)
        .context("failed to list identities")?;

    if json {
        return print_json(&identities);
    }
    if identities.is_empty() {
        println!("No active identities.");
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<20} {:<8} LAST SEEN",
        "ID", "NAME", "TOKEN", "TIER"
    );
    println!("{}", "-".repeat(84));
    for identity in &identities {
        println!(
            "{:<6} {:<24} {:<20} {:<8} {}",
            identity.id,
            identity.name,
            identity.token,
            identity.tier.name(),
            format_time(identity.last_seen)
        );
    }
    Ok(())
}

// ── Log commands ──────────────────────────────────────────────────────────────

/// `gatectl log list [--limit N]`
fn cmd_log_list(data_dir: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let ctl = open_controller(data_dir)?;
    let events = ctl.list_recent_events(limit);

    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("Access log is empty.");
        return Ok(());
    }

    println!(
        "{:<6} {:<26} {:<20} {:<8} {:<9} LOCATION",
        "SEQ", "TIME", "TOKEN", "RESULT", "IDENTITY"
    );
    println!("{}", "-".repeat(90));
    for event in &events {
        print_event_row(event);
    }
    Ok(())
}

fn print_event_row(event: &AccessEvent) {
    let (result, identity) = if event.granted {
        ("granted", event.identity_id.to_string())
    } else {
        ("denied", "-".to_string())
    };
    println!(
        "{:<6} {:<26} {:<20} {:<8} {:<9} {}",
        event.seq,
        format_time(event.timestamp),
        event.token,
        result,
        identity,
        event.location
    );
}

/// `gatectl log clear`
fn cmd_log_clear(data_dir: &Path, json: bool) -> Result<()> {
    let mut ctl = open_controller(data_dir)?;
    let cleared = ctl.stats()?.event_count;
    ctl.clear_events().context("failed to clear access log")?;

    if json {
        return print_json(&serde_json::json!({ "cleared": cleared }));
    }
    println!("Cleared {cleared} access events");
    Ok(())
}

// ── Reader simulation ─────────────────────────────────────────────────────────

/// `gatectl scan UID`
fn cmd_scan(data_dir: &Path, uid: &str, json: bool) -> Result<()> {
    let bytes = parse_uid(uid).context("invalid UID")?;
    let scan = ScanEvent::new(&bytes, now_secs())?;

    let mut ctl = open_controller(data_dir)?;
    let outcome = ctl.handle_scan(&scan).context("scan failed")?;

    if json {
        return print_json(&outcome);
    }
    match (&outcome.decision, &outcome.identity) {
        (Decision::Granted { identity_id }, Some(identity)) => {
            println!(
                "GRANTED  {} -> {} ({}, {})",
                outcome.card.token, identity_id, identity.name, identity.tier
            );
        }
        _ => println!("DENIED   {}", outcome.card.token),
    }
    println!("  Logged as event {} at {}", outcome.event.seq, outcome.event.location);
    Ok(())
}

// ── Status ────────────────────────────────────────────────────────────────────

/// `gatectl status`
fn cmd_status(data_dir: &Path, json: bool) -> Result<()> {
    let ctl = open_controller(data_dir)?;
    let stats = ctl.stats().context("failed to read status")?;

    if json {
        return print_json(&stats);
    }
    println!("Data directory:    {}", data_dir.display());
    println!("Location:          {}", stats.location);
    println!("Identities total:  {}", stats.identity_count);
    println!("Identities active: {}", stats.active_identities);
    println!("Events logged:     {}", stats.event_count);
    Ok(())
}
