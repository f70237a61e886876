use clap::Args;
use colored::Colorize;
use tbx_common::error::Result;
use tbx_common::model::Coordinate;
use tbx_core::ToolboxResolver;

/// Find the newest published version of an artifact
#[derive(Args, Debug)]
pub struct Newest {
    /// `group:artifact`, or any full coordinate (its version is ignored)
    pub artifact: String,

    /// Consider snapshot versions too
    #[arg(long)]
    pub snapshots: bool,
}

impl Newest {
    pub async fn run(&self, resolver: &ToolboxResolver) -> Result<()> {
        let coordinate = match self.artifact.split(':').collect::<Vec<_>>().as_slice() {
            [group_id, artifact_id] if !group_id.is_empty() && !artifact_id.is_empty() => {
                Coordinate::new(*group_id, *artifact_id, "0")
            }
            _ => Coordinate::parse(&self.artifact)?,
        };
        match resolver
            .find_newest_version(&coordinate, self.snapshots)
            .await?
        {
            Some(version) => println!("{}", coordinate.with_version(version.as_str())),
            None => println!(
                "{}",
                format!("No matching version of {}", coordinate.group_artifact()).yellow()
            ),
        }
        Ok(())
    }
}
