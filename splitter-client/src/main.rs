//! Splitter sync entry point.
//!
//! Headless client: restores the saved session, keeps the realtime channel
//! open, and refetches whatever the server says has changed.

use splitter_client::client::{RefreshOutcome, SplitterClient};
use splitter_client::config::ClientConfig;
use splitter_client::error::ClientResult;
use splitter_client::events::SyncEvent;
use splitter_client::realtime::SyncChannel;
use splitter_client::session::{SessionEvent, SessionStore};
use splitter_client::socket::TungsteniteConnector;
use splitter_client::telemetry::init_tracing;
use splitter_core::Resource;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

const EMAIL_ENV: &str = "SPLITTER_EMAIL";
const PASSWORD_ENV: &str = "SPLITTER_PASSWORD";

#[tokio::main]
async fn main() -> ClientResult<()> {
    let config = ClientConfig::load()?;
    init_tracing(&config)?;

    let session = SessionStore::restore(&config.session_path);
    if session
        .current()
        .is_some_and(|saved| saved.is_expired_at(chrono::Utc::now()))
    {
        tracing::info!("Saved access token has expired, it will be refreshed on first use");
    }
    let client = SplitterClient::new(&config, session.clone())?;

    if !session.is_authenticated() {
        login_from_env(&client).await?;
    }
    warm_cache(&client).await;

    let (event_tx, mut event_rx) = mpsc::channel::<SyncEvent>(256);
    let handle = SyncChannel::new(
        Arc::new(TungsteniteConnector),
        session.clone(),
        client.cache().clone(),
        event_tx,
        &config,
    )
    .spawn();

    let mut session_events = session.events();
    let mut refetches: JoinSet<RefreshOutcome> = JoinSet::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            Some(event) = event_rx.recv() => handle_sync_event(&client, &mut refetches, event),
            Some(joined) = refetches.join_next() => match joined {
                Ok((_, Ok(()))) => {}
                Ok((resource, Err(err))) => {
                    tracing::warn!(resource = %resource, error = %err.user_message(), "Refetch failed");
                }
                Err(err) => tracing::warn!(error = %err, "Refetch task ended abnormally"),
            },
            event = session_events.recv() => match event {
                Ok(SessionEvent::RedirectToLogin { route }) => {
                    tracing::warn!(route = %route, "Session expired, sign in again to resume syncing");
                    break;
                }
                Ok(event) => tracing::debug!(event = ?event, "Session event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Session events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    refetches.shutdown().await;
    handle.shutdown().await;
    Ok(())
}

async fn login_from_env(client: &SplitterClient) -> ClientResult<()> {
    let (Ok(email), Ok(password)) = (std::env::var(EMAIL_ENV), std::env::var(PASSWORD_ENV)) else {
        tracing::info!("No saved session; realtime sync will start once signed in");
        return Ok(());
    };
    client.login(&email, &password).await?;
    Ok(())
}

async fn warm_cache(client: &SplitterClient) {
    if !client.session().is_authenticated() {
        return;
    }
    for resource in [Resource::Groups, Resource::Balances] {
        if let Err(err) = client.refresh(resource).await {
            tracing::warn!(resource = %resource, error = %err.user_message(), "Initial fetch failed");
        }
    }
}

fn handle_sync_event(
    client: &SplitterClient,
    refetches: &mut JoinSet<RefreshOutcome>,
    event: SyncEvent,
) {
    match event {
        SyncEvent::Connected => tracing::info!("Realtime sync connected"),
        SyncEvent::Disconnected { reason } => {
            tracing::info!(reason = %reason, "Realtime sync disconnected")
        }
        SyncEvent::Notice(notice) => tracing::info!(level = ?notice.level, "{}", notice.text()),
        SyncEvent::Invalidated(resources) => {
            for resource in resources {
                client.spawn_refresh(resource, refetches);
            }
        }
    }
}
