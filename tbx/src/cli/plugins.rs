use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use tbx_common::error::Result;
use tbx_core::ToolboxResolver;

use crate::cli::render::print_json;

const DEFAULT_PLUGIN_GROUPS: [&str; 2] = ["org.apache.maven.plugins", "org.codehaus.mojo"];

/// List plugins published under plugin groups, at their newest release
#[derive(Args, Debug)]
pub struct Plugins {
    /// Plugin group ids; defaults to the Apache Maven and MojoHaus groups
    pub groups: Vec<String>,

    #[arg(long)]
    pub json: bool,
}

impl Plugins {
    pub async fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        let groups: Vec<&str> = if self.groups.is_empty() {
            DEFAULT_PLUGIN_GROUPS.to_vec()
        } else {
            self.groups.iter().map(String::as_str).collect()
        };
        let plugins = resolver.list_available_plugins(groups).await?;
        if self.json {
            return print_json(&plugins);
        }
        if plugins.is_empty() {
            println!("{}", "No plugins found".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Group").style_spec("b"),
            Cell::new("Plugin").style_spec("b"),
            Cell::new("Version").style_spec("b"),
        ]));
        for plugin in &plugins {
            table.add_row(Row::new(vec![
                Cell::new(&plugin.group_id),
                Cell::new(&plugin.artifact_id).style_spec("Fb"),
                Cell::new(&plugin.version).style_spec("Fg"),
            ]));
        }
        table.printstd();
        println!("{}", format!("{} plugins", plugins.len()).bold());
        Ok(())
    }
}
