//! Query command - search indexed entries.

use crate::app::App;
use crate::commands::format_size;
use crate::OutputFormat;
use std::time::Instant;
use zipdex_core::{Config, SearchFilter, SearchQuery};

/// Search parameters from the command line.
pub struct QueryOptions {
    pub pattern: String,
    pub regex: bool,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub extensions: Vec<String>,
    pub limit: Option<usize>,
}

impl QueryOptions {
    fn build(&self, default_limit: usize) -> anyhow::Result<SearchQuery> {
        let mut query = if self.regex {
            SearchQuery::regex(&self.pattern)?
        } else {
            SearchQuery::substring(&self.pattern)
        };

        if let Some(min) = self.min_size {
            query = query.with_filter(SearchFilter::MinSize(min));
        }
        if let Some(max) = self.max_size {
            query = query.with_filter(SearchFilter::MaxSize(max));
        }
        if !self.extensions.is_empty() {
            query = query.with_filter(SearchFilter::Extensions(self.extensions.clone()));
        }

        Ok(query.with_limit(self.limit.unwrap_or(default_limit)))
    }
}

/// Run the query command.
pub fn run(config: Config, options: QueryOptions, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let Some(engine) = app.engine()? else {
        eprintln!("Index is empty. Run 'zipdex index' first.");
        return Ok(());
    };

    let query = options.build(app.config.general.max_results)?;

    let start = Instant::now();
    let hits = engine.search(&query)?;
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => {
            for hit in &hits {
                println!("{} ({})", hit.path_in_container, format_size(hit.entry_size));
                println!("    in [{}] {}", hit.volume_id, hit.container_path);
            }

            eprintln!();
            eprintln!(
                "Found {} results in {:.3}ms",
                hits.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
    }

    Ok(())
}

/// Parse a size such as `1024`, `500K`, `10M` or `2G` (binary units).
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid size: {}", input))?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        "T" | "TB" => 1024 * 1024 * 1024 * 1024,
        other => return Err(format!("Unknown size unit: {}", other)),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: {}", input))
}
