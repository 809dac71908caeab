use std::fs::{self, OpenOptions};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use algoviz::build::registry_from_config;
use algoviz::chat::{HttpChatService, SyncOutcome};
use algoviz::{
    util, AiSyncLoop, BuildOrchestrator, Config, File, MemoryWorkspace, PlaybackController,
    PlaybackSpeed,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "algoviz")]
#[command(about = "Build, play back, and AI-edit algorithm visualization traces")]
#[command(version)]
struct Args {
    /// Data directory (config and logs), defaults to ~/.algoviz
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a file and print its playback steps
    Build { file: PathBuf },
    /// Trace a file and auto-play it to the end
    Play {
        file: PathBuf,
        /// Playback speed, 0.0 to 4.0
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Run one AI chat session against a file
    Chat {
        file: PathBuf,
        /// Write resulting files here instead of printing them
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    util::init_data_dir(args.data_dir);

    // Initialize logging to file (<data_dir>/logs/algoviz.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load();

    match args.command {
        Commands::Build { file } => {
            let (workspace, _) = build_file(&config, &file, None).await?;
            print_steps(&workspace);
        }
        Commands::Play { file, speed } => {
            let (_, player) = build_file(&config, &file, speed).await?;
            play(&player).await;
        }
        Commands::Chat { file, out } => chat(&config, &file, out.as_deref()).await?,
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<File> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid file path: {}", path.display()))?;
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(File::user(name, content))
}

async fn build_file(
    config: &Config,
    path: &Path,
    speed: Option<f64>,
) -> Result<(Arc<MemoryWorkspace>, PlaybackController)> {
    let file = read_source(path)?;
    let workspace = Arc::new(MemoryWorkspace::with_files(vec![file.clone()]));
    let speed = speed
        .map(PlaybackSpeed::new)
        .unwrap_or(config.playback.default_speed);
    let player = PlaybackController::with_speed(workspace.clone(), speed);
    let registry = registry_from_config(&config.tracer)?;
    let orchestrator = BuildOrchestrator::new(player.clone(), registry, workspace.clone());

    if let Some(handle) = orchestrator.build(Some(&file)) {
        handle.wait().await;
    }

    if let Some(error) = workspace.errors().into_iter().next() {
        bail!(error);
    }
    Ok((workspace, player))
}

fn print_steps(workspace: &MemoryWorkspace) {
    let chunks = workspace.chunks();
    println!("{} chunk(s)", chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let commands = chunk.commands.len();
        match chunk.line_number {
            Some(line) => println!("  {:>4}: {commands} command(s), line {line}", index + 1),
            None => println!("  {:>4}: {commands} command(s)", index + 1),
        }
    }
}

async fn play(player: &PlaybackController) {
    let total = player.len();
    let mut last = player.cursor();
    println!("step {last}/{total}");

    if !player.resume(false) {
        return;
    }
    while player.is_playing() || player.cursor() != last {
        let cursor = player.cursor();
        if cursor != last {
            let line = player
                .current_chunk()
                .and_then(|c| c.line_number)
                .map(|l| format!(" (line {l})"))
                .unwrap_or_default();
            println!("step {cursor}/{total}{line}");
            last = cursor;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn chat(config: &Config, path: &Path, out: Option<&Path>) -> Result<()> {
    let file = read_source(path)?;
    let workspace = Arc::new(MemoryWorkspace::with_files(vec![file.clone()]));
    let service = HttpChatService::new(&config.chat.base_url, config.chat.timeout)?;
    let sync = AiSyncLoop::new(
        Arc::new(service),
        workspace.clone(),
        workspace.clone(),
        config.chat.sync_config(),
    );

    let report = sync.call_ai(&file)?.wait().await;
    tracing::info!(
        polls = report.polls,
        actions = report.actions_applied,
        "Chat session complete"
    );

    match &report.outcome {
        SyncOutcome::Failed(error) => bail!(error.clone()),
        SyncOutcome::Errored(msg) => eprintln!("chat ended with error: {msg}"),
        SyncOutcome::Finished | SyncOutcome::Cancelled => {}
    }

    for file in workspace.files() {
        match out {
            Some(dir) => {
                let Some(target) = output_path(dir, &file.name) else {
                    tracing::warn!(file = %file.name, "Refusing to write file outside the output directory");
                    eprintln!("skipped {}: not a relative path inside --out", file.name);
                    continue;
                };
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, &file.content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                println!("wrote {}", target.display());
            }
            None => println!("== {} ==\n{}", file.name, file.content),
        }
    }
    Ok(())
}

/// Where a chat-provided file name lands under `dir`, or `None` when the
/// name is empty, absolute, or steps outside with `..`
fn output_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let mut components = relative.components().peekable();
    components.peek()?;
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(dir.join(relative))
    } else {
        None
    }
}
