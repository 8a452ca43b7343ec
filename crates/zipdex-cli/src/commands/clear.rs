//! Clear command - remove all index data.

use crate::app::App;
use std::io::{self, Write};
use zipdex_core::store::remove_store_files;
use zipdex_core::Config;

/// Run the clear command.
pub fn run(config: Config, skip_confirm: bool) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if !app.index_exists() {
        println!("No index found. Nothing to clear.");
        return Ok(());
    }

    if !skip_confirm {
        print!("This will delete all index data. Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    remove_store_files(&app.store_path)?;
    println!("Index cleared.");

    Ok(())
}
