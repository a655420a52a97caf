//! Show what a render would do.

use powerhour_common::config::AppConfig;
use powerhour_render_engine::{plan, Ffprobe, PlanConfig};
use powerhour_selection::select;

use crate::args::{RenderArgs, SourceArgs};

pub fn run(
    config: &AppConfig,
    source: SourceArgs,
    render: RenderArgs,
    json: bool,
) -> anyhow::Result<()> {
    let config = render.apply(config, source.clip)?;
    let manifest = source.manifest(&config)?;
    let options = source.selection_options(&config, config.render.clip_seconds);

    let selection = select(&manifest, &options)?;
    let render_plan = plan(&selection, &PlanConfig::from_defaults(&config.render), &Ffprobe::new())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&render_plan)?);
        return Ok(());
    }

    println!("Plan for {}", manifest.location().display());
    super::print_warnings(&selection.warnings);
    super::print_warnings(&render_plan.warnings);
    super::print_plan(&render_plan);
    Ok(())
}
