use clap::Args;
use colored::Colorize;
use tbx_common::error::{Result, TbxError};
use tbx_core::ToolboxResolver;

use crate::cli::render::{print_artifacts, print_json, print_tree};
use crate::cli::RootArgs;

/// Resolve an artifact and its dependencies into the local repository
#[derive(Args, Debug)]
pub struct Resolve {
    #[command(flatten)]
    pub root: RootArgs,

    /// Print the resolved tree instead of the artifact table
    #[arg(long)]
    pub tree: bool,
}

impl Resolve {
    pub async fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        let prepared = resolver.load_gav(&self.root.gav, &self.root.boms).await?;
        let result = match resolver.resolve_root(self.root.scope, &prepared).await {
            Ok(result) => result,
            Err(e) => {
                if let Some(partial) = e.partial_result() {
                    eprintln!("{}", "Partially resolved:".yellow().bold());
                    print_artifacts(&partial.artifact_results);
                }
                return Err(e);
            }
        };

        if self.root.json {
            return print_json(&result);
        }
        if self.tree {
            print_tree(&result.root);
        } else {
            print_artifacts(&result.artifact_results);
        }
        let failures = result.failures();
        if !failures.is_empty() {
            return Err(TbxError::resolution(format!(
                "{} artifacts could not be resolved",
                failures.len()
            )));
        }
        println!(
            "{}",
            format!("{} artifacts resolved", result.artifact_results.len()).bold()
        );
        Ok(())
    }
}
