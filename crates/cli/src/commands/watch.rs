//! Long-running change follower and manual deploys.

use tokio::signal;
use tracing::{info, warn};

use coconut_catalog::config::build_hook_url_from_env;
use coconut_catalog::{BuildHookNotifier, SyncOptions};
use coconut_catalog_core::StoreStatus;

use super::{CommandError, Session};

/// Log every reconciled snapshot until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened.
pub async fn watch(demo: bool) -> Result<(), CommandError> {
    let session = Session::open(demo, false).await?;
    let mut status = session.catalog().store().watch_status();

    let snapshot = session.catalog().snapshot();
    info!(
        generation = snapshot.generation,
        collections = snapshot.collections.len(),
        products = snapshot.products.len(),
        "Watching for catalog changes (Ctrl+C to stop)"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                match current {
                    StoreStatus::Ready => {
                        let snapshot = session.catalog().snapshot();
                        let stats = session.catalog().reconciler_stats();
                        info!(
                            generation = snapshot.generation,
                            collections = snapshot.collections.len(),
                            products = snapshot.products.len(),
                            notifications = stats.notifications(),
                            reloads = stats.reloads(),
                            "Catalog updated"
                        );
                    }
                    StoreStatus::Error(message) => {
                        warn!(error = %message, "Catalog reload failed");
                    }
                    StoreStatus::Uninitialized | StoreStatus::Loading => {}
                }
            }
            () = &mut shutdown => break,
        }
    }

    session.close().await;
    Ok(())
}

/// Trigger the build hook once.
///
/// # Errors
///
/// Returns [`CommandError::NotConfigured`] without a hook URL, or an error
/// if the hook rejects the request.
pub async fn deploy() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let options = SyncOptions::from_env()?;
    let notifier = BuildHookNotifier::configured(build_hook_url_from_env()?, &options)
        .ok_or(CommandError::NotConfigured("CATALOG_BUILD_HOOK_URL"))?;

    notifier.trigger().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
