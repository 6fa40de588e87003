// src/cache.rs
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub taken_at: DateTime<Utc>,
    pub value: T,
}

/// Caller-owned cache holding the latest snapshot and the time it was taken.
///
/// Refreshes are single-flight: the lock is held while a refresh runs, so
/// overlapping callers wait for it instead of starting a second pass.
/// `None` results are never stored.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Snapshot<T>>>,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    fn is_fresh(&self, snapshot: &Snapshot<T>, now: DateTime<Utc>) -> bool {
        match (now - snapshot.taken_at).to_std() {
            Ok(age) => age < self.ttl,
            // taken "in the future" (clock skew): still fresh
            Err(_) => true,
        }
    }

    pub async fn get_fresh_at(&self, now: DateTime<Utc>) -> Option<T> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|snapshot| self.is_fresh(snapshot, now))
            .map(|snapshot| snapshot.value.clone())
    }

    pub async fn get_fresh(&self) -> Option<T> {
        self.get_fresh_at(Utc::now()).await
    }

    pub async fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().await.as_ref().map(|snapshot| snapshot.taken_at)
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    pub async fn get_or_refresh_at<F, Fut>(&self, now: DateTime<Utc>, refresh: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(snapshot) = slot.as_ref() {
            if self.is_fresh(snapshot, now) {
                debug!("Snapshot cache hit (taken {})", snapshot.taken_at);
                return Some(snapshot.value.clone());
            }
        }

        let value = refresh().await?;
        *slot = Some(Snapshot {
            taken_at: now,
            value: value.clone(),
        });
        info!("Snapshot cache refreshed (ttl {:?})", self.ttl);
        Some(value)
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        self.get_or_refresh_at(Utc::now(), refresh).await
    }
}
