//! Release publisher CLI entrypoint.
//!
//! Resolves the configuration, takes the run lock and drives the publish
//! pipeline against the real `git`, `gh`, `gpg` and packager binaries.

use clap::Parser;
use release_publisher::checksum::Sha256Checksummer;
use release_publisher::cli::Cli;
use release_publisher::command::SystemCommandExecutor;
use release_publisher::config::PublishConfig;
use release_publisher::error::{PublisherError, Result};
use release_publisher::hosting::GhReleaseHost;
use release_publisher::lock::{RunLock, default_lock_dir, lock_path};
use release_publisher::output::{DryRunInfo, write_stderr_line};
use release_publisher::packager::GoreleaserPackager;
use release_publisher::pipeline::{Collaborators, run_publish};
use release_publisher::signing::GpgCli;
use release_publisher::vcs::GitCli;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Log level for `-v` counts; `RUST_LOG` wins when set.
fn default_log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn init_logging(verbosity: u8) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(verbosity)),
    )
    .format_timestamp(None)
    .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = PublishConfig::from_process_env(cli)?;
    let lock_dir = match &cli.lock_dir {
        Some(dir) => dir.clone(),
        None => default_lock_dir()?,
    };

    if cli.dry_run {
        let info = DryRunInfo {
            config: &config,
            lock_path: &lock_path(&lock_dir, &cli.lock_group),
        };
        return writeln!(stderr, "{}", info.display_text())
            .map_err(|source| PublisherError::WriteFailed { source });
    }

    let _lock = RunLock::acquire(&lock_dir, &cli.lock_group)?;

    let executor = SystemCommandExecutor;
    let vcs = GitCli::new(&executor);
    let host = GhReleaseHost::new(&executor, config.repository.as_str());
    let signer = GpgCli::new(&executor);
    let packager = GoreleaserPackager::new(&executor, config.packager.as_str());
    let tools = Collaborators {
        vcs: &vcs,
        host: &host,
        signer: &signer,
        packager: &packager,
        checksummer: &Sha256Checksummer,
    };

    run_publish(&config, &tools, stderr, cli.quiet)?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error ({}): {err}", err.category()));
            1
        }
    }
}
