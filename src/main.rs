//! belld - a bell daemon
//!
//! Plays a beep whenever the bell rings:
//! - a synthesized sine, square or complex tone
//! - a WAVE file, streamed or cached in memory
//! - an arbitrary shell command

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser};
use tracing::{info_span, Instrument};

use belld::cli::{BeepArgs, Cli, Commands, Display, IpcClient, RenderArgs};
use belld::daemon::{self, default_socket_path};
use belld::sound::{synth, wave};
use belld::{Beep, BeepError, DefaultBackend};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).instrument(info_span!("belld")).await {
        Display::show_error(&format!("{:#}", e));
        if let Some(hint) = e.downcast_ref::<BeepError>().and_then(BeepError::suggestion) {
            Display::show_hint(hint);
        }
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Daemon(args)) => {
            let socket_path = socket_or_default(args.socket.clone())?;
            daemon::run(args.to_config(), &socket_path).await?;
        }
        Some(Commands::Ring { socket }) => {
            let client = IpcClient::from_option(socket)?;
            let response = client.ring().await?;
            Display::show_ring_success(&response);
        }
        Some(Commands::Status { socket }) => {
            let client = IpcClient::from_option(socket)?;
            let response = client.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Play(args)) => {
            play_once(args).await?;
        }
        Some(Commands::Render(args)) => {
            render(&args)?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

fn socket_or_default(socket: Option<PathBuf>) -> Result<PathBuf> {
    match socket {
        Some(path) => Ok(path),
        None => default_socket_path(),
    }
}

/// Prepares the beep, performs it once and frees it.
async fn play_once(args: BeepArgs) -> Result<()> {
    let mode = args.to_mode();
    let label = mode.label();

    tokio::task::spawn_blocking(move || -> Result<(), BeepError> {
        let mut beep = Beep::prepare(&mode)?;
        let result = beep.perform(&DefaultBackend::new());
        beep.free();
        result
    })
    .await
    .map_err(|e| anyhow!("The beep thread failed: {}", e))??;

    Display::show_play_success(&label);
    Ok(())
}

/// Synthesizes a beep and stores it as a WAVE file.
fn render(args: &RenderArgs) -> Result<()> {
    let tone = args.tone.to_tone();
    tone.validate().map_err(|e| anyhow!(e))?;

    let buffer = synth::generate(&tone)?;
    let file = File::create(&args.output)
        .with_context(|| format!("Cannot create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    wave::write_wave(&mut writer, &buffer)?;
    writer
        .flush()
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    Display::show_render_success(&args.output, buffer.frames());
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
