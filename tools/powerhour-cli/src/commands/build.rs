//! Render the selection into one video file.

use std::io::Write;
use std::path::PathBuf;

use tokio::sync::watch;

use powerhour_common::config::AppConfig;
use powerhour_render_engine::{
    ensure_output_writable, plan, render, ExportProgress, ExportStage, Ffprobe, OutputSettings,
    PlanConfig, ProgressCallback, RenderJob,
};
use powerhour_selection::select;

use crate::args::{RenderArgs, SourceArgs};

pub async fn run(
    config: &AppConfig,
    source: SourceArgs,
    render_args: RenderArgs,
    output: PathBuf,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = render_args.apply(config, source.clip)?;
    let manifest = source.manifest(&config)?;
    let options = source.selection_options(&config, config.render.clip_seconds);

    // Fail on an unwritable destination before spending time on probing.
    if !dry_run {
        ensure_output_writable(&output)?;
    }

    let selection = select(&manifest, &options)?;
    let render_plan = plan(
        &selection,
        &PlanConfig::from_defaults(&config.render),
        &Ffprobe::new(),
    )?;
    super::print_warnings(&selection.warnings);
    super::print_warnings(&render_plan.warnings);

    let job = RenderJob {
        plan: render_plan,
        output_path: output,
        settings: OutputSettings::from_defaults(&config.render),
    };

    if dry_run {
        super::print_plan(&job.plan);
        let command = job.preview_command();
        println!("  Join: {}", command.strategy.as_str());
        if let Some(list) = &command.concat_list {
            println!("\nConcat list:\n{list}");
        }
        println!("\n{}", command.display_line("ffmpeg"));
        return Ok(());
    }

    println!("Rendering {} clip(s)", job.plan.len());
    println!("  Output: {}", job.output_path.display());
    println!(
        "  Resolution: {}x{} @ {}fps",
        job.settings.width, job.settings.height, job.settings.fps
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping ffmpeg");
            let _ = cancel_tx.send(true);
        }
    });

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        if p.stage == ExportStage::Rendering {
            print!(
                "\r  Progress: {:.1}% ({}, ETA: {:.0}s)  ",
                p.progress * 100.0,
                super::format_duration(p.out_time_secs),
                p.eta_secs,
            );
            let _ = std::io::stdout().flush();
        }
    });

    match render(job, Some(progress_cb), cancel_rx).await {
        Ok(path) => {
            println!("\nRender complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(e.into())
        }
    }
}
