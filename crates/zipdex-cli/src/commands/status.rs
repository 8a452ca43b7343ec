//! Status command - show index status and statistics.

use crate::app::App;
use crate::commands::format_size;
use crate::OutputFormat;
use zipdex_core::Config;

/// Run the status command.
pub fn run(config: Config, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let Some(engine) = app.engine()? else {
        match output {
            OutputFormat::Text => {
                println!("Index is empty. Run 'zipdex index' to build the index.")
            }
            OutputFormat::Json => println!("{}", serde_json::json!({ "indexed": false })),
        }
        return Ok(());
    };

    let stats = engine.summary()?;
    let last_merge = engine.last_merge()?;
    let volumes = engine.volumes()?;

    match output {
        OutputFormat::Text => {
            println!("zipdex Index Status");
            println!("===================");
            println!();
            println!("Summary:");
            println!("  Volumes:     {}", stats.volumes);
            println!("  Archives:    {}", stats.containers);
            println!("  Entries:     {}", stats.entries);
            println!(
                "  Total size:  {} bytes ({})",
                stats.total_bytes,
                format_size(stats.total_bytes)
            );

            if let Some(merged) = last_merge
                .as_deref()
                .and_then(|m| chrono::DateTime::parse_from_rfc3339(m).ok())
            {
                println!(
                    "  Last merge:  {}",
                    merged
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                );
            }

            if !volumes.is_empty() {
                println!();
                println!("Volumes:");
                for volume in &volumes {
                    println!(
                        "  {:<12} {:>6} archives {:>9} entries {:>10}",
                        volume.volume_id.as_str(),
                        volume.containers,
                        volume.entries,
                        format_size(volume.total_bytes)
                    );
                }
            }

            println!();
            println!("Index file: {}", app.store_path.display());
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "indexed": true,
                "stats": stats,
                "volumes": volumes,
                "last_merge": last_merge,
                "index_path": app.store_path,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
