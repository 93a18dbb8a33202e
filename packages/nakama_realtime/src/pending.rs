//! Correlation ids and the table of calls awaiting a reply.
//!
//! Only the dispatch task mutates the table. The lock exists so diagnostics
//! (`Conn::pending_calls`) can read it from other tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, oneshot};

use crate::error::Result;
use crate::proto::envelope::Message;

/// Completion handed back to a waiting caller.
pub type Completion = oneshot::Sender<Result<Option<Message>>>;

/// Per-connection correlation counter. Ids start at `1` and are never reused.
#[derive(Debug, Default)]
pub struct CorrelationIds {
    last: AtomicU64,
}

impl CorrelationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        (self.last.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

pub(crate) struct PendingCall {
    pub kind: &'static str,
    pub tx: Completion,
    pub since: Instant,
}

impl PendingCall {
    pub fn new(kind: &'static str, tx: Completion) -> Self {
        Self {
            kind,
            tx,
            since: Instant::now(),
        }
    }
}

/// Read-only view of one in-flight call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInfo {
    pub cid: String,
    pub kind: &'static str,
    pub age: Duration,
}

#[derive(Clone, Default)]
pub(crate) struct PendingTable {
    calls: Arc<RwLock<HashMap<String, PendingCall>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, cid: String, call: PendingCall) {
        self.calls.write().await.insert(cid, call);
    }

    /// Remove and return the call for `cid`. A second take for the same id
    /// yields `None`.
    pub async fn take(&self, cid: &str) -> Option<PendingCall> {
        self.calls.write().await.remove(cid)
    }

    pub async fn len(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Drop entries whose caller has gone away. Returns how many were removed.
    pub async fn sweep_abandoned(&self) -> usize {
        let mut calls = self.calls.write().await;
        let before = calls.len();
        calls.retain(|_, call| !call.tx.is_closed());
        before - calls.len()
    }

    /// Drop every entry. Waiting callers see their sender vanish.
    pub async fn clear(&self) -> usize {
        let mut calls = self.calls.write().await;
        let n = calls.len();
        calls.clear();
        n
    }

    pub async fn snapshot(&self) -> Vec<PendingInfo> {
        let now = Instant::now();
        let mut out: Vec<PendingInfo> = self
            .calls
            .read()
            .await
            .iter()
            .map(|(cid, call)| PendingInfo {
                cid: cid.clone(),
                kind: call.kind,
                age: now.saturating_duration_since(call.since),
            })
            .collect();
        out.sort_by_key(|p| p.cid.parse::<u64>().unwrap_or(u64::MAX));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = CorrelationIds::new();
        let got: Vec<String> = (0..5).map(|_| ids.next()).collect();
        assert_eq!(got, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn ids_are_per_connection() {
        let a = CorrelationIds::new();
        let b = CorrelationIds::new();
        assert_eq!(a.next(), "1");
        assert_eq!(a.next(), "2");
        assert_eq!(b.next(), "1");
    }

    #[tokio::test]
    async fn take_removes_exactly_once() {
        let table = PendingTable::new();
        let (tx, _rx) = oneshot::channel();
        table.insert("1".into(), PendingCall::new("rpc", tx)).await;
        assert_eq!(table.len().await, 1);

        let call = table.take("1").await.unwrap();
        assert_eq!(call.kind, "rpc");
        assert!(table.take("1").await.is_none());
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_id_leaves_table_untouched() {
        let table = PendingTable::new();
        let (tx, _rx) = oneshot::channel();
        table.insert("1".into(), PendingCall::new("ping", tx)).await;
        assert!(table.take("99").await.is_none());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_drops_only_abandoned_entries() {
        let table = PendingTable::new();
        let (live_tx, _live_rx) = oneshot::channel();
        let (gone_tx, gone_rx) = oneshot::channel();
        table.insert("1".into(), PendingCall::new("rpc", live_tx)).await;
        table.insert("2".into(), PendingCall::new("rpc", gone_tx)).await;
        drop(gone_rx);

        assert_eq!(table.sweep_abandoned().await, 1);
        let left = table.snapshot().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].cid, "1");
    }

    #[tokio::test]
    async fn clear_closes_waiting_receivers() {
        let table = PendingTable::new();
        let (tx, rx) = oneshot::channel();
        table.insert("1".into(), PendingCall::new("channel_join", tx)).await;
        assert_eq!(table.clear().await, 1);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_numeric_id() {
        let table = PendingTable::new();
        let mut keep = Vec::new();
        for cid in ["10", "2", "1"] {
            let (tx, rx) = oneshot::channel();
            keep.push(rx);
            table.insert(cid.into(), PendingCall::new("ping", tx)).await;
        }
        let cids: Vec<String> = table.snapshot().await.into_iter().map(|p| p.cid).collect();
        assert_eq!(cids, vec!["1", "2", "10"]);
    }
}
