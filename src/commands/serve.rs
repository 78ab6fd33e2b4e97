// ABOUTME: Serve command: the delivery daemon.
// ABOUTME: Accepts packages and installs them one at a time from a bounded queue.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use dropship::config::Config;
use dropship::error::{Error, Result};
use dropship::install::PackageInstaller;
use dropship::outcome::FailureKind;
use dropship::output::Output;
use dropship::transport::{PackageServer, SessionRegistry, TransportEvent, UpdatePackage};
use dropship::types::SessionId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub async fn serve(config: Config, output: Output) -> Result<()> {
    let endpoint = config.listen_endpoint()?.clone();
    let installer = PackageInstaller::new(config.integrity_key.resolve()?, &config.base_update_path);
    let grace = config.transport.shutdown_grace;

    let (events, queue) = mpsc::channel(config.transport.queue_depth);
    let cancel = CancellationToken::new();
    let registry = Arc::new(SessionRegistry::default());
    let server = PackageServer::new(
        Arc::clone(&registry),
        config.transport.framing(),
        events,
        cancel.clone(),
    );

    let listener = PackageServer::bind(&endpoint.address, endpoint.port).await?;
    output.progress(&format!("Listening on {}", listener.local_addr()?));

    let accept = tokio::spawn({
        let server = server.clone();
        async move { server.serve(listener).await }
    });
    let mut consumer = tokio::spawn(consume(queue, cancel.clone(), move |id, payload| {
        install_package(installer.clone(), id, payload)
    }));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        stopped = &mut consumer => {
            tracing::error!(result = ?stopped, "package consumer stopped unexpectedly");
            cancel.cancel();
            server.shutdown();
            return Err(Error::Failed {
                kind: FailureKind::HostOperation,
                message: "package consumer stopped; the daemon can no longer install packages"
                    .to_string(),
            });
        }
    }
    tracing::info!("shutdown requested");
    cancel.cancel();

    match accept.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "accept loop panicked"),
    }
    let drained = tokio::time::timeout(grace, async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(sessions = registry.len(), "sessions still open after shutdown grace");
    }
    server.shutdown();

    if let Err(e) = consumer.await {
        tracing::error!(error = %e, "package consumer panicked");
    }
    output.success("Stopped");
    Ok(())
}

/// Hand received packages to `handle` in arrival order.
///
/// Each package is handled in its own task, so a panic while installing one
/// package is logged and the next package is still taken. Cancellation is
/// only observed between packages; an install in progress runs to completion.
async fn consume<F, Fut>(
    mut queue: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
    handle: F,
) where
    F: Fn(SessionId, Bytes) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = queue.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            TransportEvent::Received { id, payload } => {
                if let Err(e) = tokio::spawn(handle(id, payload)).await {
                    tracing::error!(session = %id, error = %e, "package handler panicked");
                }
            }
            TransportEvent::Connected { id, peer } => {
                tracing::debug!(session = %id, %peer, "peer connected")
            }
            TransportEvent::Submitted { id, closed } => {
                tracing::debug!(session = %id, closed, "reply sent")
            }
            TransportEvent::Disconnected { id } => tracing::debug!(session = %id, "peer left"),
        }
    }
    tracing::debug!("package consumer stopped");
}

async fn install_package(installer: PackageInstaller, id: SessionId, payload: Bytes) {
    let package = match UpdatePackage::decode(&payload) {
        Ok(package) => package,
        Err(e) => {
            tracing::error!(session = %id, error = %e, "discarding undecodable package");
            return;
        }
    };
    match installer.install(&package).await {
        Ok(installed) => tracing::info!(
            session = %id,
            dir = %installed.release_dir.display(),
            "release installed"
        ),
        Err(e) => tracing::error!(
            session = %id,
            error = %e,
            kind = %e.failure_kind(),
            rolled_back = e.rolled_back(),
            "install failed"
        ),
    }
}
