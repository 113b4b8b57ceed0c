//! Seam for external text-to-vector providers.
//!
//! The engine consumes finished vectors; how they are produced (local
//! model, remote API) is opaque. Implementations may suspend; this is the
//! only asynchrony that reaches the engine, and it always happens before
//! any collection lock is taken. Failures should be wrapped with
//! [`Error::embedding`](crate::error::Error::embedding) so they propagate
//! to the caller unchanged; release resources in `Drop` when needed.

use crate::error::Result;
use async_trait::async_trait;

/// Turns text into fixed-length embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single string.
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch; same semantics per element. The default loops over
    /// [`encode`](Self::encode); providers with real batch endpoints
    /// should override it.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.encode(text).await?);
        }
        Ok(vectors)
    }
}
