use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Hub-wide gate allowing one capture request write in flight at a time.
///
/// Independent of room: the recognition pipeline behind every worker is shared.
#[derive(Debug, Clone, Default)]
pub struct CaptureGate {
    lock: Arc<Mutex<()>>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write` while holding the gate
    pub async fn pass<F, T>(&self, write: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self.lock.lock().await;
        write.await
    }
}

#[cfg(test)]
impl CaptureGate {
    /// Whether a capture request is currently being written
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
