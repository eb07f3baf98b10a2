use crate::adapters::{RetrievalLogRecord, RetrievalLogSink};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const FINGERPRINT_HEX_LEN: usize = 16;

/// Stable, non-reversible identifier for a query: SHA-256 of the trimmed,
/// lower-cased text, truncated to 16 hex chars.
#[must_use]
pub fn query_fingerprint(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_HEX_LEN);
    for byte in digest.iter().take(FINGERPRINT_HEX_LEN / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Fire-and-forget writer for retrieval log records.
#[derive(Clone, Default)]
pub struct RetrievalLogger {
    sink: Option<Arc<dyn RetrievalLogSink>>,
}

impl RetrievalLogger {
    pub fn new(sink: Arc<dyn RetrievalLogSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Schedule the write on a detached task and return immediately.
    ///
    /// Sink errors are logged and dropped. Without a tokio runtime the record
    /// is skipped.
    pub fn dispatch(&self, record: RetrievalLogRecord) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!("No async runtime; retrieval log record skipped");
            return;
        };

        handle.spawn(async move {
            if let Err(err) = sink.insert(record).await {
                log::debug!("Retrieval log write failed: {err:#}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    #[test]
    fn fingerprint_normalizes_case_and_whitespace() {
        let a = query_fingerprint("  Password Reset ");
        let b = query_fingerprint("password reset");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_HEX_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, query_fingerprint("password change"));
    }

    struct ChannelSink(mpsc::UnboundedSender<RetrievalLogRecord>);

    #[async_trait]
    impl RetrievalLogSink for ChannelSink {
        async fn insert(&self, record: RetrievalLogRecord) -> anyhow::Result<()> {
            self.0.send(record)?;
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl RetrievalLogSink for FailingSink {
        async fn insert(&self, _record: RetrievalLogRecord) -> anyhow::Result<()> {
            anyhow::bail!("log table unavailable")
        }
    }

    fn record() -> RetrievalLogRecord {
        RetrievalLogRecord {
            workspace_id: Some("ws".to_string()),
            user_id: None,
            query_fingerprint: query_fingerprint("q"),
            result_ids: vec!["p1".to_string()],
            scores: vec![0.5],
            strategy: "hybrid".to_string(),
            threshold: 0.7,
            result_count: 1,
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = RetrievalLogger::new(Arc::new(ChannelSink(tx)));

        logger.dispatch(record());

        let delivered = rx.recv().await.expect("record delivered");
        assert_eq!(delivered.result_count, 1);
    }

    #[tokio::test]
    async fn dispatch_swallows_sink_errors() {
        let logger = RetrievalLogger::new(Arc::new(FailingSink));
        logger.dispatch(record());
        tokio::task::yield_now().await;
    }

    #[test]
    fn dispatch_without_runtime_is_a_no_op() {
        let logger = RetrievalLogger::new(Arc::new(FailingSink));
        logger.dispatch(record());
        assert!(RetrievalLogger::disabled().sink.is_none());
    }
}
