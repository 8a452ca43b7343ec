//! Extract command - copy one entry out of an indexed archive.

use crate::app::App;
use crate::commands::format_size;
use std::io;
use std::path::Path;
use zipdex_core::{Config, Extractor, LineProgress};

/// Run the extract command.
pub fn run(
    config: Config,
    id: &str,
    path_in_container: &str,
    out_dir: &Path,
    verbose: bool,
) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let engine = app.require_engine()?;

    let container = app.resolve_container(&engine, id)?;
    let sink = LineProgress::new(io::stderr(), verbose);

    let extraction = Extractor::new(&app.config.scan).extract(
        Path::new(&container.path),
        path_in_container,
        out_dir,
        &sink,
    )?;

    println!(
        "Extracted {} ({}) to {}",
        extraction.path_in_container,
        format_size(extraction.bytes),
        extraction.target.display()
    );

    Ok(())
}
