//! Delivery adapter seam
//!
//! The pipeline never talks to a chat service itself. A transport implements
//! [`DeliveryAdapter`] and hands it to [`Pipeline::serve`](crate::Pipeline::serve),
//! which calls exactly one of its methods per request and never retries.

use crate::error::Result;
use crate::types::{ErrorKind, Payload};
use async_trait::async_trait;

/// Transport-side capability that sends results back to the requester
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use media_relay::delivery::DeliveryAdapter;
/// use media_relay::{ErrorKind, Payload};
///
/// struct StdoutAdapter;
///
/// #[async_trait]
/// impl DeliveryAdapter for StdoutAdapter {
///     async fn deliver(&self, payload: &Payload, caption: &str) -> media_relay::Result<()> {
///         println!("{caption}: {} ({} bytes)", payload.file_name, payload.len());
///         Ok(())
///     }
///
///     async fn report_failure(&self, _kind: ErrorKind, message: &str) -> media_relay::Result<()> {
///         println!("{message}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    /// Push a produced artifact to the requester
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::Delivery`](crate::Error::Delivery) (or
    /// any other variant) when the upload fails; the pipeline logs and
    /// returns it without retrying.
    async fn deliver(&self, payload: &Payload, caption: &str) -> Result<()>;

    /// Tell the requester their request failed
    ///
    /// `message` is the short user-facing text for `kind`; raw diagnostics
    /// are never passed here.
    async fn report_failure(&self, kind: ErrorKind, message: &str) -> Result<()>;
}
