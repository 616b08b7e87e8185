use clap::{Args, Parser, Subcommand};

use crate::model::item::{CollectionId, ItemId};

#[derive(Parser)]
#[command(name = "bm", about = concat!("bulkmod v", env!("CARGO_PKG_VERSION"), " - bulk edits for course sections"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bulkmod workspace in the current directory
    Init(InitArgs),
    /// List the collections of the workspace
    Collections,
    /// List the containers and items of a collection
    List(ListArgs),
    /// Run a raw JSON batch payload against a collection
    Apply(ApplyArgs),
    /// Move items to the end of another container
    Mv(MvArgs),
    /// Indent items one level
    Indent(ItemsArgs),
    /// Outdent items one level
    Outdent(ItemsArgs),
    /// Make items visible
    Show(ShowArgs),
    /// Hide items
    Hide(ItemsArgs),
    /// Duplicate items in place, or into another container or collection
    Dup(DupArgs),
    /// Mark items for deletion
    Rm(ItemsArgs),
    /// Remove every item whose deletion was requested
    Purge,
    /// Validate workspace integrity
    Check,
    /// Edit the target filter settings
    Gate(GateCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Create an initial collection: --collection <id> "title" (repeatable)
    #[arg(long, num_args = 2, value_names = ["ID", "TITLE"], action = clap::ArgAction::Append)]
    pub collection: Vec<String>,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Collection to list
    pub collection: CollectionId,
    /// Only list items whose name matches this regex
    #[arg(long)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Batch command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ApplyArgs {
    /// Collection the batch runs against
    pub collection: CollectionId,
    /// JSON payload, or "-" to read it from stdin
    pub payload: String,
}

#[derive(Args)]
pub struct ItemsArgs {
    /// Collection holding the items
    pub collection: CollectionId,
    /// Item ids
    #[arg(required = true)]
    pub ids: Vec<ItemId>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Collection holding the items
    pub collection: CollectionId,
    /// Item ids
    #[arg(required = true)]
    pub ids: Vec<ItemId>,
    /// Target container number
    #[arg(long)]
    pub to: u32,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Collection holding the items
    pub collection: CollectionId,
    /// Item ids
    #[arg(required = true)]
    pub ids: Vec<ItemId>,
    /// Make items available but keep them off the collection page
    #[arg(long)]
    pub stealth: bool,
}

#[derive(Args)]
pub struct DupArgs {
    /// Collection holding the items
    pub collection: CollectionId,
    /// Item ids
    #[arg(required = true)]
    pub ids: Vec<ItemId>,
    /// Target container number
    #[arg(long, conflicts_with = "keep_original")]
    pub to: Option<u32>,
    /// Place each copy in the container number of its source
    #[arg(long)]
    pub keep_original: bool,
    /// Target collection (default: the source collection)
    #[arg(long, value_name = "COLLECTION")]
    pub into: Option<CollectionId>,
}

// ---------------------------------------------------------------------------
// Gate subcommands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct GateCmd {
    #[command(subcommand)]
    pub action: GateAction,
}

#[derive(Subcommand)]
pub enum GateAction {
    /// Never allow a container number as a target
    Veto(GateNumberArgs),
    /// Remove a container number from the veto list
    Allow(GateNumberArgs),
    /// Set the cross-collection policy flags
    Policy(GatePolicyArgs),
}

#[derive(Args)]
pub struct GateNumberArgs {
    /// Container number
    pub number: u32,
}

#[derive(Args)]
pub struct GatePolicyArgs {
    /// Allow copies to keep their source container number
    #[arg(long, value_name = "BOOL")]
    pub keep_original: Option<bool>,
    /// Allow creating missing target containers
    #[arg(long, value_name = "BOOL")]
    pub create_new: Option<bool>,
}
