use clap::Args;
use colored::Colorize;
use tbx_common::error::Result;
use tbx_core::ToolboxResolver;

use crate::cli::render::{print_json, print_tree};
use crate::cli::RootArgs;

/// Print the dependency graph of an artifact without downloading jars
#[derive(Args, Debug)]
pub struct Tree {
    #[command(flatten)]
    pub root: RootArgs,

    /// Keep conflict losers and duplicates in the output
    #[arg(long)]
    pub full: bool,
}

impl Tree {
    pub async fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        let prepared = resolver.load_gav(&self.root.gav, &self.root.boms).await?;
        let collected = resolver
            .collect_root(self.root.scope, &prepared, self.full)
            .await?;

        if self.root.json {
            return print_json(&collected);
        }
        print_tree(&collected.root);
        let count = collected.root.node_count() - 1;
        println!(
            "{}",
            format!("{count} dependencies in scope {}", self.root.scope).bold()
        );
        Ok(())
    }
}
