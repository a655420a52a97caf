//! Generate a browser playlist of online videos.

use std::path::PathBuf;

use powerhour_common::config::AppConfig;
use powerhour_embed::{embed_items, generate, nominal_schedule};
use powerhour_selection::select;

use crate::args::{EmbedArgs, SourceArgs};

pub fn run(
    config: &AppConfig,
    source: SourceArgs,
    embed: EmbedArgs,
    output: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    let options = embed.options(config, source.clip)?;
    let manifest = source.manifest(config)?;
    let selection = select(
        &manifest,
        &source.selection_options(config, options.clip_seconds),
    )?;
    super::print_warnings(&selection.warnings);

    if dry_run {
        let items = embed_items(&selection, &options)?;
        println!(
            "{:>3}  {:>9}  {:<13} {:>7}  title",
            "#", "at", "video", "start"
        );
        for (entry, item) in nominal_schedule(&selection).iter().zip(&items) {
            println!(
                "{:>3}  {:>9}  {:<13} {:>7.1}  {}",
                entry.index + 1,
                super::format_duration(entry.offset_secs),
                item.id,
                item.start,
                item.title.as_deref().unwrap_or("")
            );
        }
        println!(
            "\n  {} video(s), {} at {:.0}s each",
            items.len(),
            super::format_duration(selection.nominal_duration()),
            options.clip_seconds
        );
        return Ok(());
    }

    let written = generate(&selection, &options, &output)?;
    println!("Embed page written: {}", written.display());
    println!(
        "  Serve it over HTTP (for example `python3 -m http.server 8000` in {}); \
         the video player does not run from a file:// URL.",
        written
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string())
    );
    Ok(())
}
