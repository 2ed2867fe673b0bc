use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use praxis_core::{
    ExecutionHost, HostSnapshot, NoopReporter, PythonSandbox, RunnerConfig, SessionContext,
    SubmitOutcome, WorkerState,
};

#[derive(Parser, Debug)]
#[clap(
    name = "Praxis",
    author,
    version = "0.1.0",
    about = "Sandboxed code execution runtime for interactive lessons"
)]
struct Cli {
    /// Source file to execute in the sandbox
    file: PathBuf,

    #[clap(
        long,
        short,
        default_value = "praxis.yaml",
        help = "Runner configuration file (defaults apply when absent)"
    )]
    config: String,

    #[clap(long, help = "Override the execution timeout in milliseconds")]
    timeout_ms: Option<u64>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter_level(level).init();

    let mut config = if Path::new(&cli.config).exists() {
        RunnerConfig::from_path(&cli.config)
            .with_context(|| format!("failed to load config from {}", cli.config))?
    } else {
        log::debug!("no config file at {}, using defaults", cli.config);
        RunnerConfig::default()
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let lesson_id = cli
        .file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "adhoc".to_string());

    let sandbox = Arc::new(PythonSandbox::new(&config));
    let host = ExecutionHost::spawn(
        sandbox,
        Arc::new(NoopReporter::new()),
        SessionContext::new("local", lesson_id),
        config,
    );

    let mut updates = host.subscribe();
    let mut printed = 0;

    // Wait for the sandbox to come up before submitting.
    loop {
        let snapshot = updates.borrow().clone();
        printed = print_new_lines(&snapshot, printed);
        match snapshot.state {
            WorkerState::Ready => break,
            WorkerState::Terminated => bail!("sandbox failed to start; see log above"),
            _ => {}
        }
        updates
            .changed()
            .await
            .context("execution host shut down")?;
    }

    match host.submit(source).await? {
        SubmitOutcome::Accepted { request_id } => {
            log::debug!("submission accepted as request {}", request_id);
        }
        SubmitOutcome::NotReady { state } => bail!("sandbox not ready ({:?})", state),
    }

    // Stream transcript lines until the run settles.
    let success = loop {
        updates
            .changed()
            .await
            .context("execution host shut down")?;
        let snapshot = updates.borrow().clone();
        printed = print_new_lines(&snapshot, printed);
        if let Some(result) = &snapshot.last_result {
            if snapshot.state == WorkerState::Ready {
                break result.success;
            }
        }
        if snapshot.state == WorkerState::Terminated {
            bail!("sandbox became unusable during the run");
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_new_lines(snapshot: &HostSnapshot, printed: usize) -> usize {
    for line in &snapshot.lines[printed..] {
        println!("{}", line.text);
    }
    snapshot.lines.len()
}
