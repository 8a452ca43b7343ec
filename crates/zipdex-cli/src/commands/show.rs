//! Show command - one archive and its entries.

use crate::app::App;
use crate::commands::format_size;
use crate::OutputFormat;
use zipdex_core::Config;

/// Run the show command.
pub fn run(
    config: Config,
    id: &str,
    filter: Option<&str>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let engine = app.require_engine()?;

    let container = app.resolve_container(&engine, id)?;
    let entries = engine.container_entries(container.id, filter)?;

    match output {
        OutputFormat::Text => {
            println!("Archive:     {}", container.path);
            println!("ID:          {}", container.id);
            println!("Volume:      {}", container.volume_id);
            println!("Size:        {}", format_size(container.size));
            if let Some(ref modified) = container.modified_at {
                println!("Modified:    {}", modified.format("%Y-%m-%d %H:%M:%S"));
            }
            println!(
                "Discovered:  {}",
                container.discovered_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(ref hash) = container.hash {
                println!("Hash:        {}", hash);
            }

            println!();
            println!("Entries ({}):", entries.len());
            for entry in &entries {
                println!("  {} ({})", entry.path_in_container, format_size(entry.size));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "container": container,
                "entries": entries,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
