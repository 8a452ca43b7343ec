//! Duplicates command - entries sharing a content hash.

use crate::app::App;
use crate::commands::format_size;
use crate::OutputFormat;
use zipdex_core::Config;

/// Run the duplicates command.
pub fn run(config: Config, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let engine = app.require_engine()?;

    let groups = engine.duplicates()?;

    match output {
        OutputFormat::Text => {
            if groups.is_empty() {
                println!("No duplicates found.");
                println!("Entries are only hashed when indexing with --hash.");
                return Ok(());
            }

            let wasted: u64 = groups
                .iter()
                .map(|g| g.entry_size * (g.hits.len() as u64 - 1))
                .sum();

            for group in &groups {
                println!(
                    "{} copies of {} ({})",
                    group.hits.len(),
                    group.hits[0].entry_name,
                    format_size(group.entry_size)
                );
                for hit in &group.hits {
                    println!(
                        "    [{}] {} :: {}",
                        hit.volume_id, hit.container_path, hit.path_in_container
                    );
                }
            }

            println!();
            println!(
                "{} duplicate groups, {} in redundant copies",
                groups.len(),
                format_size(wasted)
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
    }

    Ok(())
}
