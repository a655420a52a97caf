//! Render jobs and ffmpeg execution.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

use powerhour_common::error::{PowerHourError, PowerHourResult};

use crate::command::{FfmpegCommand, OutputSettings};
use crate::planner::{validate_segments, RenderPlan};

/// A planned render ready to execute.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub plan: RenderPlan,

    /// Final output path. Written only on success.
    pub output_path: PathBuf,

    pub settings: OutputSettings,
}

impl RenderJob {
    /// The command this job would run, writing to `output`.
    pub fn command_for(&self, output: &Path, concat_list_path: &Path) -> FfmpegCommand {
        FfmpegCommand::build(&self.plan, &self.settings, output, concat_list_path)
    }

    /// The command as a dry run would show it.
    pub fn preview_command(&self) -> FfmpegCommand {
        let list = self.output_path.with_extension("ffconcat");
        self.command_for(&self.output_path, &list)
    }
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Flips to `true` when the render should stop.
pub type CancelSignal = watch::Receiver<bool>;

/// Render progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output time reached so far.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: ExportStage,
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Something that can execute a [`RenderJob`].
#[async_trait::async_trait]
pub trait RenderBackend: Send + Sync {
    /// Run the job and return the written output path.
    async fn render(
        &self,
        job: &RenderJob,
        progress: Option<ProgressCallback>,
        cancel: CancelSignal,
    ) -> PowerHourResult<PathBuf>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Render a job with the ffmpeg backend.
pub async fn render(
    job: RenderJob,
    progress: Option<ProgressCallback>,
    cancel: CancelSignal,
) -> PowerHourResult<PathBuf> {
    let backend = FfmpegBackend::new();
    if !backend.is_available() {
        return Err(PowerHourError::unsupported(
            "No supported render backend found (expected ffmpeg in PATH)",
        ));
    }
    tracing::info!(backend = backend.name(), "Using render backend");
    backend.render(&job, progress, cancel).await
}

/// Fail fast when `output` cannot be written.
///
/// Creates missing parent directories and verifies a file can be created
/// next to the target.
pub fn ensure_output_writable(output: &Path) -> PowerHourResult<()> {
    if output.as_os_str().is_empty() {
        return Err(PowerHourError::output(output, "empty output path"));
    }
    if output.is_dir() {
        return Err(PowerHourError::output(output, "output path is a directory"));
    }
    let parent = output_dir(output);
    std::fs::create_dir_all(&parent)
        .map_err(|e| PowerHourError::output(output, format!("cannot create {}: {e}", parent.display())))?;
    tempfile::Builder::new()
        .prefix(".powerhour-check-")
        .tempfile_in(&parent)
        .map(drop)
        .map_err(|e| PowerHourError::output(output, format!("directory not writable: {e}")))
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Runs ffmpeg as a single child process per output.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RenderBackend for FfmpegBackend {
    async fn render(
        &self,
        job: &RenderJob,
        progress: Option<ProgressCallback>,
        mut cancel: CancelSignal,
    ) -> PowerHourResult<PathBuf> {
        let started = std::time::Instant::now();
        ensure_output_writable(&job.output_path)?;
        validate_segments(&job.plan.segments)?;
        if job.plan.is_empty() {
            return Err(PowerHourError::input("Nothing to render"));
        }

        report(&progress, 0.0, 0.0, 0.0, ExportStage::Preparing);

        // Dropping either temp path removes the file, so every early return
        // below leaves nothing behind.
        let temp_output = tempfile::Builder::new()
            .prefix(".powerhour-")
            .suffix(&format!(".{}", job.settings.extension()))
            .tempfile_in(output_dir(&job.output_path))
            .map_err(|e| PowerHourError::output(&job.output_path, e.to_string()))?
            .into_temp_path();
        let concat_file = tempfile::Builder::new()
            .prefix("powerhour-")
            .suffix(".ffconcat")
            .tempfile()?
            .into_temp_path();

        let command = job.command_for(&temp_output, &concat_file);
        if let Some(list) = &command.concat_list {
            std::fs::write(&concat_file, list)?;
        }
        tracing::info!(
            strategy = command.strategy.as_str(),
            segments = job.plan.len(),
            expected_secs = command.expected_duration_secs,
            "Starting render"
        );
        tracing::debug!(command = %command.display_line(&self.binary), "ffmpeg command");

        let result = self
            .run_ffmpeg(&command, &progress, &mut cancel, started)
            .await;
        if let Err(err) = result {
            report(&progress, 0.0, 0.0, 0.0, ExportStage::Failed);
            return Err(err);
        }

        let written = std::fs::metadata(&temp_output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            report(&progress, 0.0, 0.0, 0.0, ExportStage::Failed);
            return Err(PowerHourError::render(
                "ffmpeg exited successfully but produced no output",
            ));
        }

        temp_output
            .persist(&job.output_path)
            .map_err(|e| PowerHourError::output(&job.output_path, e.error.to_string()))?;

        report(
            &progress,
            1.0,
            command.expected_duration_secs,
            0.0,
            ExportStage::Complete,
        );
        tracing::info!(
            output = %job.output_path.display(),
            bytes = written,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Render finished"
        );
        Ok(job.output_path.clone())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl FfmpegBackend {
    async fn run_ffmpeg(
        &self,
        command: &FfmpegCommand,
        progress: &Option<ProgressCallback>,
        cancel: &mut CancelSignal,
        started: std::time::Instant,
    ) -> PowerHourResult<()> {
        let mut child = Command::new(&self.binary)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PowerHourError::render(format!("Failed to start {}: {e}", self.binary)))?;

        tracing::info!(pid = ?child.id(), args_len = command.args.len(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PowerHourError::render("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PowerHourError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        let mut last_advance_secs = 0.0f64;
        let mut last_advance_wall = std::time::Instant::now();
        loop {
            let next = tokio::select! {
                line = lines.next_line() => Some(line),
                _ = cancelled(cancel) => None,
            };
            let Some(next) = next else {
                return Err(abort(&mut child, "render interrupted").await);
            };
            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    return Err(PowerHourError::render(format!(
                        "Failed reading ffmpeg progress: {e}"
                    )))
                }
            };

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key != "progress" {
                continue;
            }
            if state.out_time_secs > last_advance_secs + 0.001 {
                last_advance_secs = state.out_time_secs;
                last_advance_wall = std::time::Instant::now();
            } else if last_advance_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = state.out_time_secs,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_advance_wall = std::time::Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(
                    &state,
                    command.expected_duration_secs,
                    started.elapsed().as_secs_f64(),
                ));
            }
        }

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancelled(cancel) => None,
        };
        let Some(status) = waited else {
            return Err(abort(&mut child, "render interrupted").await);
        };
        let status =
            status.map_err(|e| PowerHourError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(PowerHourError::render(format!(
                "ffmpeg failed ({status}):\n{stderr_output}"
            )));
        }
        Ok(())
    }
}

async fn abort(child: &mut tokio::process::Child, reason: &str) -> PowerHourError {
    if let Err(err) = child.kill().await {
        tracing::warn!(error = %err, "Failed to kill ffmpeg");
    }
    tracing::warn!(reason, "ffmpeg terminated");
    PowerHourError::cancelled(reason)
}

/// Resolves once the signal reads `true`. Never resolves if the sender is
/// gone without cancelling.
async fn cancelled(cancel: &mut CancelSignal) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn report(progress: &Option<ProgressCallback>, value: f64, out_time: f64, eta: f64, stage: ExportStage) {
    if let Some(cb) = progress {
        cb(ExportProgress {
            progress: value,
            out_time_secs: out_time,
            eta_secs: eta,
            stage,
        });
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value.trim() == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_duration_secs: f64, elapsed_secs: f64) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}
