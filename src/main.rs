//! Forking Worker Supervisor
//!
//! Keeps a fixed pool of worker processes alive, respawning any that exit,
//! and tears all of them down on SIGINT/SIGTERM.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                        SUPERVISOR                            │
//!   │                                                              │
//!   │  config ──▶ daemon ──▶ spawn 0..jobs ──▶ install signals     │
//!   │                              │                 │             │
//!   │                              ▼                 ▼             │
//!   │                        ┌───────────┐    ┌─────────────┐      │
//!   │                        │ slot table│◀───│ event loop  │      │
//!   │                        └───────────┘    └──────┬──────┘      │
//!   │                              ▲                 │             │
//!   │              SIGCHLD ────────┼──▶ reap + respawn             │
//!   │       SIGINT / SIGTERM ──────┴──▶ shutdown: TERM, reap, exit │
//!   └──────────────────────────────────────────────────────────────┘
//!          │ fork                    │ fork
//!          ▼                         ▼
//!     ┌──────────┐              ┌──────────┐
//!     │ worker 0 │     ...      │ worker N │   default signal dispositions
//!     └──────────┘              └──────────┘
//! ```

use std::process;

use clap::Parser;

use worker_supervisor::config::{usage_exit_code, Cli, SupervisorConfig};
use worker_supervisor::error::EXIT_STARTUP_FAILURE;
use worker_supervisor::lifecycle::{detach, Detached};
use worker_supervisor::observability::{logging, metrics};
use worker_supervisor::Supervisor;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(usage_exit_code(&e));
        }
    };

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("worker-supervisor: {}", e);
            process::exit(EXIT_STARTUP_FAILURE);
        }
    };

    logging::init_logging(&config.observability.log_level);
    process::exit(run(config));
}

/// Daemonize if asked, then drive the supervisor on a single-threaded runtime.
fn run(config: SupervisorConfig) -> i32 {
    if config.daemonize {
        match detach(&config.log_path) {
            Ok(Detached::Parent(pid)) => {
                tracing::info!(pid = %pid, "Forked master process");
                return 0;
            }
            Ok(Detached::Child) => {}
            Err(e) => {
                tracing::error!(error = %e, "Daemonization failed");
                return e.exit_code();
            }
        }
    }

    // Workers are forked from this runtime, so it must stay on one thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build runtime");
            return EXIT_STARTUP_FAILURE;
        }
    };

    runtime.block_on(supervise(config))
}

async fn supervise(config: SupervisorConfig) -> i32 {
    tracing::info!(
        jobs = config.jobs,
        daemonize = config.daemonize,
        log_path = %config.log_path,
        grace_secs = ?config.shutdown.grace_secs,
        "worker-supervisor v0.1.0 starting"
    );

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let mut supervisor = match Supervisor::new(config) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return e.exit_code();
        }
    };

    let triggers = match supervisor.start() {
        Ok(triggers) => triggers,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return e.exit_code();
        }
    };

    match supervisor.run(triggers).await {
        Ok(report) => {
            tracing::info!(
                signaled = report.signaled,
                reaped = report.reaped.len(),
                "Shutdown complete"
            );
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "Supervisor failed");
            e.exit_code()
        }
    }
}
