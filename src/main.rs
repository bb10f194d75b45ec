// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use georoute::{
    config::{config_path, load},
    constants::{HEALTH_EVENT_CHANNEL_CAPACITY, TOKIO_WORKER_THREADS},
    controller::Controller,
    health::HttpProber,
    outputs::OutputPublisher,
    provider::{DnsProvider, HttpDnsProvider, MemoryProvider},
    reconcilers::Reconciler,
    server::{router, serve},
    supervisor::HealthSupervisor,
    zone::{ensure_health_checks, resolve_hosted_zone},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("georoute-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing() {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Respects RUST_LOG_FORMAT (json|text) for output format
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_tracing();
    info!("Starting georoute controller");

    let path = config_path();
    let settings =
        load(&path).with_context(|| format!("loading configuration from {}", path.display()))?;
    debug!(?settings, "Configuration loaded");

    let provider: Arc<dyn DnsProvider> = match &settings.provider.endpoint {
        Some(endpoint) => Arc::new(HttpDnsProvider::new(
            endpoint,
            settings.provider.token.clone(),
            settings.provider.atomic_batches,
        )?),
        None => {
            warn!("No provider endpoint configured; using the in-memory provider (dry run)");
            Arc::new(MemoryProvider::atomic())
        }
    };

    // Startup failures below are fatal; nothing has been mutated except a newly created zone
    let zone = resolve_hosted_zone(provider.as_ref(), &settings.zone).await?;
    let checks =
        ensure_health_checks(provider.as_ref(), &settings.registry, settings.max_attempts).await?;
    info!(
        zone_id = %zone.id,
        domain = %zone.domain_name,
        managed = zone.managed,
        health_checks = checks.len(),
        "Hosted zone ready"
    );

    let registry = Arc::new(settings.registry);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (events_tx, events_rx) = mpsc::channel(HEALTH_EVENT_CHANNEL_CAPACITY);

    let prober = Arc::new(HttpProber::new(settings.probe_timeout)?);
    let supervisor = Arc::new(HealthSupervisor::start(&registry, prober, events_tx));

    let publisher = Arc::new(OutputPublisher::new(
        registry.clone(),
        settings.naming.clone(),
        settings.outputs_file.clone(),
    ));

    let listener = TcpListener::bind(settings.bind_address)
        .await
        .with_context(|| format!("binding HTTP server to {}", settings.bind_address))?;
    let server = tokio::spawn(serve(
        listener,
        router(publisher.subscribe()),
        shutdown_rx.clone(),
    ));

    let controller = Controller::new(
        zone,
        registry,
        settings.naming,
        settings.fallback,
        supervisor.clone(),
        Reconciler::new(provider, settings.max_attempts),
        publisher,
        settings.controller,
    );
    let mut controller_task = tokio::spawn(controller.run(events_rx, shutdown_rx));

    let controller_exited = tokio::select! {
        () = shutdown_signal() => {
            info!("Shutdown signal received");
            false
        }
        result = &mut controller_task => {
            error!("CRITICAL: controller loop exited unexpectedly: {:?}", result);
            true
        }
    };

    // Probes stop now; the controller finishes its in-flight batch
    supervisor.stop();
    let _ = shutdown_tx.send(true);
    if !controller_exited {
        if let Err(e) = controller_task.await {
            error!(error = %e, "Controller task failed during shutdown");
        }
    }

    match Arc::try_unwrap(supervisor) {
        Ok(supervisor) => supervisor.shutdown().await,
        Err(_) => warn!("Health supervisor still shared at shutdown; probe tasks already signalled"),
    }

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
    }

    if controller_exited {
        anyhow::bail!("controller loop exited unexpectedly");
    }
    info!("georoute controller stopped");
    Ok(())
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
