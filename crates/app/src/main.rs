use std::{io, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use moire_core::{
    AnimationSession, AppConfig, InputHandle, MoireError, SceneComposer, Terminal, TextBuffer,
    TokioClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod display;

use display::WriterDisplay;

fn main() -> moire_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    // A stdin read still blocked on the terminal must not hold up exit.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> moire_core::Result<()> {
    let config = cli.overrides.apply(load_config(cli.overrides.config.as_ref())?)?;

    match cli.command {
        Commands::Animate { frames } => run_animate(config, frames).await,
        Commands::Interactive => run_interactive(config).await,
        Commands::PrintConfig => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

async fn run_animate(config: AppConfig, frames: Option<u64>) -> moire_core::Result<()> {
    tracing::info!(width = config.terminal.width, frames, "starting animation");

    let buffer = TextBuffer::with_display(WriterDisplay::new(io::stdout()), config.terminal.row_cap);
    let composer = SceneComposer::new(config.animation, config.terminal.width);
    let mut session = AnimationSession::new(composer, Terminal::new(buffer));
    if let Some(frames) = frames {
        session = session.with_frame_limit(frames);
    }

    let stop = session.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let summary = session.run(&TokioClock).await?;
    tracing::info!(frames = summary.frames, circles = summary.circles, "done");
    Ok(())
}

async fn run_interactive(config: AppConfig) -> moire_core::Result<()> {
    tracing::info!(width = config.terminal.width, "starting interactive mode");

    let (terminal, keys) = Terminal::with_input(WriterDisplay::new(io::stdout()), config.terminal.row_cap)?;
    let composer = SceneComposer::new(config.animation, config.terminal.width);
    let mut session = AnimationSession::new(composer, terminal.clone());
    let stop = session.handle();
    let animation = tokio::spawn(async move { session.run(&TokioClock).await });

    spawn_stdin_reader(keys);

    loop {
        tokio::select! {
            line = terminal.request_line() => match line {
                Ok(line) if line.trim() == "quit" => break,
                Ok(line) => tracing::debug!(%line, "command received"),
                Err(MoireError::InputClosed) => break,
                Err(err) => return Err(err),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    stop.stop();
    let summary = animation
        .await
        .map_err(|err| MoireError::msg(format!("animation task failed: {err}")))??;
    tracing::info!(frames = summary.frames, circles = summary.circles, "done");
    Ok(())
}

/// Feeds stdin lines into the input field, one per line request. Closes
/// the field on EOF or a read error.
fn spawn_stdin_reader(keys: InputHandle) {
    tokio::spawn(async move {
        if let Err(err) = forward_lines(BufReader::new(tokio::io::stdin()), &keys).await {
            tracing::warn!(%err, "stopped reading stdin");
        }
        if let Err(err) = keys.close() {
            tracing::warn!(%err, "failed to close input field");
        }
    });
}

/// Submits each line of `reader` once the field is unlocked for it.
async fn forward_lines<R>(reader: R, keys: &InputHandle) -> moire_core::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        loop {
            keys.wait_unlocked().await?;
            if keys.set_value(line.as_str())? {
                break;
            }
        }
        if keys.submit()?.is_none() {
            tracing::debug!(%line, "line dropped, request went away");
        }
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> moire_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrolling moire patterns in the terminal", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Paint the moire animation to stdout until interrupted.
    Animate {
        /// Stop after this many frames.
        #[arg(short, long)]
        frames: Option<u64>,
    },
    /// Run the animation and echo stdin lines into the same buffer. Type
    /// `quit` to exit.
    Interactive,
    /// Print the effective configuration as JSON.
    PrintConfig,
}

/// Settings that take precedence over the configuration file.
#[derive(Args, Debug)]
struct Overrides {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Characters per emitted column.
    #[arg(short, long, global = true)]
    width: Option<usize>,
    /// Seed for circle placement.
    #[arg(short, long, global = true)]
    seed: Option<u64>,
    /// Delay between frames in milliseconds.
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
    /// Maximum number of rows kept in the buffer.
    #[arg(long, global = true)]
    rows: Option<usize>,
}

impl Overrides {
    fn apply(&self, mut config: AppConfig) -> moire_core::Result<AppConfig> {
        if let Some(width) = self.width {
            config.terminal.width = width;
        }
        if let Some(rows) = self.rows {
            config.terminal.row_cap = Some(rows);
        }
        if let Some(seed) = self.seed {
            config.animation.seed = Some(seed);
        }
        if let Some(delay_ms) = self.delay_ms {
            config.animation.frame_delay_ms = delay_ms;
        }
        config.validate()?;
        Ok(config)
    }
}
