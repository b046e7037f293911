use std::future::Future;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tokio::signal;

use lantros::cli::commands::{
    handle_config, handle_query, handle_serve, handle_status, handle_train,
};
use lantros::cli::{Cli, Commands};
use lantros::logging;
use lantros::models::Config;

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH")
        .map(|p| Path::new(&p).exists())
        .unwrap_or(false)
    {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let found = if cfg!(target_os = "macos") {
        [
            format!("{home}/.local/lib/lantros/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else if cfg!(target_os = "linux") {
        [
            format!("{home}/.local/lib/lantros/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
            "/usr/lib/aarch64-linux-gnu/libonnxruntime.so".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else {
        None
    };

    if let Some(path) = found {
        // SAFETY: Called at program start before any threads are spawned.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

fn main() -> Result<()> {
    // Both env mutations must happen before the runtime starts its worker threads.
    dotenvy::dotenv().ok();
    detect_and_set_ort_path();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    logging::init_with_config(&config.logging, cli.verbose);

    let format = cli.format.unwrap_or_default();

    match cli.command {
        Commands::Serve(args) => handle_serve(args, &config, shutdown_signal()).await,
        Commands::Train(args) => interruptible(handle_train(args, &config, format)).await,
        Commands::Query(args) => {
            interruptible(handle_query(args, &config, format, cli.verbose)).await
        }
        Commands::Status => interruptible(handle_status(&config, format)).await,
        Commands::Config(cmd) => handle_config(cmd, &config, format),
    }
}

/// Run a one-shot command, abandoning it on Ctrl-C or SIGTERM.
async fn interruptible<F>(command: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::select! {
        result = command => result,
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, cleaning up...");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
