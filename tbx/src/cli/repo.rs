use clap::Args;
use prettytable::{format, Cell, Row, Table};
use tbx_common::error::Result;
use tbx_core::ToolboxResolver;

/// Check remote repository specs, or show the configured repositories
#[derive(Args, Debug)]
pub struct Repo {
    /// Specs as `url`, `id::url` or `id::type::url`
    pub specs: Vec<String>,
}

impl Repo {
    pub fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        let repositories = if self.specs.is_empty() {
            resolver.remote_repositories().to_vec()
        } else {
            self.specs
                .iter()
                .map(|s| resolver.parse_remote_repository(s))
                .collect::<Result<Vec<_>>>()?
        };

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Id").style_spec("b"),
            Cell::new("Type").style_spec("b"),
            Cell::new("Url").style_spec("b"),
        ]));
        for repository in &repositories {
            table.add_row(Row::new(vec![
                Cell::new(&repository.id).style_spec("Fb"),
                Cell::new(&repository.repository_type),
                Cell::new(&repository.url),
            ]));
        }
        table.printstd();
        Ok(())
    }
}
