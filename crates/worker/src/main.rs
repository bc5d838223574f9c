//! Eventos Locais Background Worker
//!
//! Scheduled jobs:
//! - Monthly usage counter reset (midnight UTC on the 1st)

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use eventos_billing::SubscriptionService;
use eventos_shared::{collections, DocumentStore, MemoryStore};

/// Zero every user's monthly counters. Errors on individual users are
/// logged and do not stop the sweep.
async fn reset_all_monthly_counters(
    store: &dyn DocumentStore,
    subscriptions: &SubscriptionService,
) {
    let users = match store.list(collections::USERS).await {
        Ok(users) => users,
        Err(e) => {
            error!(error = %e, "Failed to list users for monthly reset");
            return;
        }
    };

    let mut reset = 0usize;
    let mut errors = 0usize;
    for (user_id, _) in &users {
        match subscriptions.reset_monthly_counters(user_id).await {
            Ok(()) => reset += 1,
            Err(e) => {
                errors += 1;
                error!(user_id = %user_id, error = %e, "Failed to reset monthly counters");
            }
        }
    }

    info!(reset = reset, errors = errors, "Monthly counter reset complete");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();

    info!("Starting Eventos Locais Worker");

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let subscriptions = SubscriptionService::new(store.clone());

    let scheduler = JobScheduler::new().await?;

    // Midnight UTC on the first day of every month
    let job_store = store.clone();
    scheduler
        .add(Job::new_async("0 0 0 1 * *", move |_uuid, _l| {
            let store = job_store.clone();
            let subscriptions = subscriptions.clone();
            Box::pin(async move {
                info!("Running scheduled monthly counter reset");
                reset_all_monthly_counters(store.as_ref(), &subscriptions).await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    info!("Worker scheduler started");

    // Keep the process alive; jobs run on the scheduler's tasks.
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        info!("Worker heartbeat");
    }
}
