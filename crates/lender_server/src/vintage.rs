//! Vintage sync. Pushes eligible loans to the collections partner.
//!
//! One GET per record against `{endpoint}/api/customer`, all in flight at
//! once unless a concurrency cap is configured. A record fails alone: a
//! transport error, a timeout or any status other than 200 is logged and
//! counted, never retried, and never stops its siblings.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use lender_core::models::vintage::VintageRecord;
use lender_core::ports::VintageSource;
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Process-local outcome of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub processed: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct VintageSyncJob {
    source: Arc<dyn VintageSource>,
    client: reqwest::Client,
    url: String,
    max_concurrency: Option<usize>,
}

impl VintageSyncJob {
    pub fn new(source: Arc<dyn VintageSource>, endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("building collections client: {e}"))?;
        Ok(Self {
            source,
            client,
            url: format!("{}/api/customer", endpoint.trim_end_matches('/')),
            max_concurrency: None,
        })
    }

    /// Cap the number of calls in flight. Zero means no cap.
    pub fn with_max_concurrency(mut self, cap: Option<usize>) -> Self {
        self.max_concurrency = cap.filter(|n| *n > 0);
        self
    }

    pub async fn run_once(&self) -> SyncReport {
        let run_id = Uuid::new_v4();
        let records = match self.source.eligible_vintages().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(%run_id, error = %e, "vintage query failed; nothing sent");
                return SyncReport::default();
            }
        };

        let calls: Vec<_> = records.iter().map(|r| self.deliver_logged(run_id, r)).collect();
        let outcomes: Vec<bool> = match self.max_concurrency {
            Some(cap) => stream::iter(calls).buffer_unordered(cap).collect().await,
            None => join_all(calls).await,
        };

        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let report = SyncReport {
            processed: outcomes.len(),
            delivered,
            failed: outcomes.len() - delivered,
        };
        tracing::info!(
            %run_id,
            processed = report.processed,
            delivered = report.delivered,
            failed = report.failed,
            "vintage sync finished"
        );
        report
    }

    async fn deliver_logged(&self, run_id: Uuid, record: &VintageRecord) -> bool {
        match self.deliver(record).await {
            Ok(()) => {
                tracing::debug!(%run_id, loan_id = record.loan_id, "vintage delivered");
                true
            }
            Err(e) => {
                tracing::warn!(%run_id, loan_id = record.loan_id, error = %e, "vintage delivery failed");
                false
            }
        }
    }

    async fn deliver(&self, record: &VintageRecord) -> Result<()> {
        let resp = self
            .client
            .get(&self.url)
            .query(&record.query_pairs())
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(anyhow!("collections API answered {}", resp.status()));
        }
        Ok(())
    }
}

/// Background loop running the job on a fixed period. The first run happens
/// one interval after start.
pub struct VintageScheduler {
    job: Arc<VintageSyncJob>,
    interval: Duration,
}

impl VintageScheduler {
    pub fn new(job: Arc<VintageSyncJob>, interval: Duration) -> Self {
        Self { job, interval }
    }

    /// Never returns. Spawn it via [`VintageScheduler::spawn`].
    pub async fn run(&self) {
        tracing::info!("VintageScheduler started (interval={:?})", self.interval);
        loop {
            tokio::time::sleep(self.interval).await;
            let report = self.job.run_once().await;
            tracing::debug!(?report, "scheduled vintage sync done");
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
