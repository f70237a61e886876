// tbx/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Args, Parser, Subcommand};
use tbx_common::error::Result;
use tbx_common::ResolutionScope;
use tbx_core::ToolboxResolver;

pub mod fetch;
pub mod newest;
pub mod plugins;
pub mod render;
pub mod repo;
pub mod resolve;
pub mod tree;

use crate::cli::fetch::Fetch;
use crate::cli::newest::Newest;
use crate::cli::plugins::Plugins;
use crate::cli::repo::Repo;
use crate::cli::resolve::Resolve;
use crate::cli::tree::Tree;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "tbx", bin_name = "tbx")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Remote repository as `url`, `id::url` or `id::type::url`; replaces
    /// the configured ones. Repeatable.
    #[arg(short = 'r', long = "repository", global = true)]
    pub repositories: Vec<String>,

    /// Only use the local repository and cached metadata
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Root artifact selection shared by `tree` and `resolve`.
#[derive(Args, Debug)]
pub struct RootArgs {
    /// `group:artifact[:extension[:classifier]]:version`, or `group:artifact`
    /// when a BOM manages the version
    pub gav: String,

    /// BOM whose dependency management applies; first listed wins. Repeatable.
    #[arg(long = "bom")]
    pub boms: Vec<String>,

    #[arg(short, long, default_value = "runtime")]
    pub scope: ResolutionScope,

    /// Print JSON instead of a tree
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Tree(Tree),
    Resolve(Resolve),
    Fetch(Fetch),
    Newest(Newest),
    Plugins(Plugins),
    Repo(Repo),
}

impl Command {
    pub async fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        match self {
            Self::Tree(command) => command.run(resolver).await,
            Self::Resolve(command) => command.run(resolver).await,
            Self::Fetch(command) => command.run(resolver).await,
            Self::Newest(command) => command.run(resolver).await,
            Self::Plugins(command) => command.run(resolver).await,
            Self::Repo(command) => command.run(resolver),
        }
    }
}
