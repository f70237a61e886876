use clap::Args;
use colored::Colorize;
use tbx_common::error::Result;
use tbx_common::model::Coordinate;
use tbx_core::ToolboxResolver;

use crate::cli::render::{print_artifacts, print_json};

/// Download single artifacts, without their dependencies
#[derive(Args, Debug)]
pub struct Fetch {
    #[arg(required = true)]
    pub coordinates: Vec<String>,

    #[arg(long)]
    pub json: bool,
}

impl Fetch {
    pub async fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        let coordinates = self
            .coordinates
            .iter()
            .map(|c| Coordinate::parse(c))
            .collect::<Result<Vec<_>>>()?;
        let results = resolver.resolve_artifacts(&coordinates).await?;
        if self.json {
            return print_json(&results);
        }
        print_artifacts(&results);
        println!("{}", format!("{} artifacts fetched", results.len()).bold());
        Ok(())
    }
}
