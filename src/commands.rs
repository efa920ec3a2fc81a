use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use sharebox::config::Config;
use sharebox::content::ContentReference;
use sharebox::event::ReceivedFiles;
use sharebox::intake::ShareIntake;
use sharebox::relay::{AppGroup, PendingSlot};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Store a URL-form slot, as a share extension would
pub async fn share(config: &Config, uri: &str) -> Result<(), AnyError> {
    let reference = ContentReference::from_uri(uri);
    ShareIntake::new(config)
        .deliver(PendingSlot::Url(reference.uri.clone()))
        .await?;
    info!(uri = %reference.uri, "Shared URL stored for the host");
    Ok(())
}

/// Store a content-form slot
pub async fn share_text(config: &Config, content: String, content_type: String) -> Result<(), AnyError> {
    ShareIntake::new(config)
        .deliver(PendingSlot::Content {
            content,
            content_type,
        })
        .await?;
    info!("Shared content stored for the host");
    Ok(())
}

/// Act as the host: print every `receivedFiles` emission as a JSON line.
///
/// With `follow`, keep running until Ctrl+C: each stdin line is a new
/// notification, and the relay is re-checked every `poll_interval_ms` for
/// slots left by other processes.
pub async fn receive(config: &Config, follow: bool) -> Result<(), AnyError> {
    let intake = Arc::new(ShareIntake::new(config));
    let mut events = intake.subscribe();

    intake.initialize().await?;
    intake.add_handler().await?;

    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }

    if !follow {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel(64);
    let port = intake.attach(rx);
    tokio::spawn(read_notifications(tx));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut poll = tokio::time::interval(Duration::from_millis(config.relay.poll_interval_ms));
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Waiting for shared content, Ctrl+C to stop");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event)?,
                None => break,
            },
            _ = poll.tick() => {
                if let Err(e) = intake.check_pending().await {
                    warn!(error = %e, "Failed to re-check pending content");
                }
            }
            _ = &mut shutdown => break,
        }
    }

    intake.exit();
    let _ = port.await;
    info!(metrics = ?intake.metrics(), "Receiver stopped");
    Ok(())
}

pub fn group(config: &Config) -> Result<(), AnyError> {
    let status = ShareIntake::new(config).app_group();
    println!("{}", serde_json::to_string(&status)?);
    Ok(())
}

pub fn provision(config: &Config) -> Result<(), AnyError> {
    let group = AppGroup::resolve(&config.app.bundle_id, &config.relay.groups_root);
    group.provision()?;
    info!(group = %group.identifier(), path = %group.path().display(), "App group provisioned");
    Ok(())
}

fn print_event(event: &ReceivedFiles) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

async fn read_notifications(tx: mpsc::Sender<ContentReference>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(ContentReference::from_uri(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read notification from stdin");
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
