//! Archives command - list indexed archives.

use crate::app::App;
use crate::commands::format_size;
use crate::OutputFormat;
use zipdex_core::Config;

/// Run the archives command.
pub fn run(config: Config, limit: usize, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let engine = app.require_engine()?;

    let limit = (limit > 0).then_some(limit);
    let containers = engine.list_containers(limit)?;

    match output {
        OutputFormat::Text => {
            if containers.is_empty() {
                println!("No archives indexed.");
                return Ok(());
            }
            for summary in &containers {
                let c = &summary.container;
                println!("{}  [{}] {}", c.id, c.volume_id, c.path);
                println!(
                    "    {} entries, {}, discovered {}",
                    summary.entry_count,
                    format_size(c.size),
                    c.discovered_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&containers)?);
        }
    }

    Ok(())
}
