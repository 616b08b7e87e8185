mod init;
pub use init::cmd_init;

use std::path::PathBuf;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::deletion_journal::{self, DeletionJournal};
use crate::io::lock::FileLock;
use crate::io::workspace_io::{self, BULK_DIR, WorkspaceError};
use crate::model::config::WorkspaceConfig;
use crate::model::item::{CollectionId, ItemId};
use crate::model::workspace::Workspace;
use crate::ops::BatchEngine;
use crate::ops::check;
use crate::ops::decode::Action;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Per-invocation settings shared by every handler
pub struct Context {
    pub json: bool,
    /// Directory the workspace search starts from
    start: PathBuf,
}

impl Context {
    pub fn new(json: bool, workspace_dir: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let start = match workspace_dir {
            Some(dir) => std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
            None => std::env::current_dir()?,
        };
        Ok(Context { json, start })
    }

    fn root(&self) -> Result<PathBuf, WorkspaceError> {
        workspace_io::discover_workspace(&self.start)
    }

    fn load(&self) -> Result<Workspace, WorkspaceError> {
        workspace_io::load_workspace(&self.root()?)
    }

    /// Take the workspace lock, then load. The lock is held until the
    /// returned guard drops.
    fn load_locked(&self) -> Result<(Workspace, FileLock), Box<dyn std::error::Error>> {
        let root = self.root()?;
        let lock = FileLock::acquire_default(&root.join(BULK_DIR))?;
        let workspace = workspace_io::load_workspace(&root)?;
        Ok((workspace, lock))
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let ctx = Context::new(cli.json, cli.workspace_dir.as_deref())?;

    match cli.command {
        // Init is handled in main.rs before workspace discovery
        Commands::Init(args) => cmd_init(args),

        // Read commands
        Commands::Collections => cmd_collections(&ctx),
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Check => cmd_check(&ctx),

        // Batch commands
        Commands::Apply(args) => cmd_apply(&ctx, args),
        Commands::Mv(args) => {
            let mut payload = batch_payload(Action::MoveTo, &args.ids);
            payload.insert("target".into(), json!(args.to));
            run_batch(&ctx, args.collection, payload)
        }
        Commands::Indent(args) => simple_batch(&ctx, Action::MoveRight, args),
        Commands::Outdent(args) => simple_batch(&ctx, Action::MoveLeft, args),
        Commands::Show(args) => {
            let mut payload = batch_payload(Action::Show, &args.ids);
            payload.insert("visibleOnPage".into(), json!(!args.stealth));
            run_batch(&ctx, args.collection, payload)
        }
        Commands::Hide(args) => simple_batch(&ctx, Action::Hide, args),
        Commands::Dup(args) => cmd_dup(&ctx, args),
        Commands::Rm(args) => simple_batch(&ctx, Action::Delete, args),

        // Maintenance
        Commands::Purge => cmd_purge(&ctx),
        Commands::Gate(cmd) => cmd_gate(&ctx, cmd),
    }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_collections(ctx: &Context) -> CmdResult {
    let workspace = ctx.load()?;
    let infos: Vec<CollectionInfoJson> = workspace
        .config
        .collections
        .iter()
        .filter_map(|entry| {
            workspace
                .catalog
                .get(entry.id)
                .map(|c| collection_info(entry, c))
        })
        .collect();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else if infos.is_empty() {
        println!("No collections. Add [[collections]] entries to bulkmod/workspace.toml.");
    } else {
        for info in &infos {
            println!("{}", format_collection_info(info));
        }
    }
    Ok(())
}

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let workspace = ctx.load()?;
    let collection = workspace
        .catalog
        .get(args.collection)
        .ok_or_else(|| format!("collection not found: {}", args.collection))?;
    let filter = args
        .name
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| format!("invalid --name pattern: {}", e))?;

    if ctx.json {
        let listing = collection_to_json(collection, filter.as_ref());
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for line in format_collection_listing(collection, filter.as_ref()) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_check(ctx: &Context) -> CmdResult {
    let workspace = ctx.load()?;
    let result = check::check_catalog(&workspace.catalog, workspace.config.engine.max_indent);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in format_check_result(&result) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch command handlers
// ---------------------------------------------------------------------------

/// Start a payload object with the action and item ids
fn batch_payload(action: Action, ids: &[ItemId]) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("action".into(), json!(action.as_str()));
    payload.insert("itemIds".into(), json!(ids));
    payload
}

fn simple_batch(ctx: &Context, action: Action, args: ItemsArgs) -> CmdResult {
    run_batch(ctx, args.collection, batch_payload(action, &args.ids))
}

fn cmd_dup(ctx: &Context, args: DupArgs) -> CmdResult {
    let payload = match (args.to, args.keep_original, args.into) {
        (None, false, None) => batch_payload(Action::Duplicate, &args.ids),
        (None, false, Some(_)) => {
            return Err("--into requires --to or --keep-original".into());
        }
        (to, _, into) => {
            let mut payload = batch_payload(Action::DuplicateTo, &args.ids);
            match to {
                Some(n) => payload.insert("target".into(), json!(n)),
                None => payload.insert("keepOriginal".into(), json!(true)),
            };
            if let Some(collection) = into {
                payload.insert("targetCollection".into(), json!(collection));
            }
            payload
        }
    };
    run_batch(ctx, args.collection, payload)
}

fn cmd_apply(ctx: &Context, args: ApplyArgs) -> CmdResult {
    let payload = if args.payload == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        args.payload
    };
    run_text_batch(ctx, args.collection, &payload)
}

fn run_batch(ctx: &Context, collection: CollectionId, payload: Map<String, Value>) -> CmdResult {
    let payload = serde_json::to_string(&Value::Object(payload))?;
    run_text_batch(ctx, collection, &payload)
}

fn run_text_batch(ctx: &Context, collection: CollectionId, payload: &str) -> CmdResult {
    let (mut workspace, _lock) = ctx.load_locked()?;
    let engine = BatchEngine::from_config(&workspace.config);
    let journal = DeletionJournal::new(&workspace.bulk_dir);

    let result = engine.run(&mut workspace.catalog, &journal, collection, payload);
    // Steps applied before a failure stay applied, so they are saved either way
    let saved = workspace_io::save_dirty(&mut workspace)?;
    tracing::debug!(saved, "collections written");
    let report = result?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_batch_summary(&report));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance handlers
// ---------------------------------------------------------------------------

fn cmd_purge(ctx: &Context) -> CmdResult {
    let (mut workspace, _lock) = ctx.load_locked()?;
    let journal = DeletionJournal::new(&workspace.bulk_dir);
    let commands = journal.read()?;

    let report = deletion_journal::purge(&mut workspace.catalog, &commands);
    workspace_io::save_dirty(&mut workspace)?;
    journal.clear()?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if commands.is_empty() && report.purged.is_empty() {
        println!("nothing to purge");
    } else {
        println!(
            "purged {} item(s), skipped {}",
            report.purged.len(),
            report.skipped
        );
        if report.unjournaled > 0 {
            println!("{} flagged item(s) had no journal entry", report.unjournaled);
        }
    }
    Ok(())
}

fn cmd_gate(ctx: &Context, cmd: GateCmd) -> CmdResult {
    let root = ctx.root()?;
    let bulk_dir = root.join(BULK_DIR);
    let _lock = FileLock::acquire_default(&bulk_dir)?;
    let (_, mut doc) = config_io::read_config(&bulk_dir)?;

    let (changed, message) = match cmd.action {
        GateAction::Veto(args) => {
            let changed = config_io::set_veto(&mut doc, args.number, true);
            let message = if changed {
                format!("container {} vetoed", args.number)
            } else {
                format!("container {} was already vetoed", args.number)
            };
            (changed, message)
        }
        GateAction::Allow(args) => {
            let changed = config_io::set_veto(&mut doc, args.number, false);
            let message = if changed {
                format!("container {} allowed", args.number)
            } else {
                format!("container {} was not vetoed", args.number)
            };
            (changed, message)
        }
        GateAction::Policy(args) => {
            let changed = args.keep_original.is_some() || args.create_new.is_some();
            config_io::set_gate_policy(&mut doc, args.keep_original, args.create_new);
            (changed, String::new())
        }
    };
    if changed {
        config_io::write_config(&bulk_dir, &doc)?;
    }

    let gate = toml::from_str::<WorkspaceConfig>(&doc.to_string())?.gate;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&gate)?);
    } else {
        if !message.is_empty() {
            println!("{}", message);
        }
        let veto = gate
            .veto
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "veto: [{}]  keep_original: {}  create_new: {}",
            veto, gate.keep_original, gate.create_new
        );
    }
    Ok(())
}
