//! Validate command - check the index against the disk.

use crate::app::App;
use crate::OutputFormat;
use zipdex_core::Config;

/// Run the validate command. Fails when any problem is found.
pub fn run(config: Config, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let engine = app.require_engine()?;

    let report = engine.validate()?;

    match output {
        OutputFormat::Text => {
            for container in &report.missing_containers {
                println!("missing  [{}] {}", container.volume_id, container.path);
            }
            if report.orphaned_entries > 0 {
                println!("orphaned {} entries without an archive", report.orphaned_entries);
            }
            for message in &report.integrity_errors {
                println!("corrupt  {}", message);
            }

            if report.is_healthy() {
                println!("Index OK.");
            } else {
                println!();
                println!(
                    "{} missing archive(s), {} orphaned entries, {} integrity error(s)",
                    report.missing_containers.len(),
                    report.orphaned_entries,
                    report.integrity_errors.len()
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if !report.is_healthy() {
        anyhow::bail!("index has {} problem(s)", report.issue_count());
    }
    Ok(())
}
