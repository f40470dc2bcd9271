//! The delivery seam between the pipeline and virtual-device posting.

use retap_core::Entry;

/// Accepts finalized entries for delivery to a virtual device.
///
/// The post stage calls this in queue drain order and the implementation
/// must deliver in the order received. Production implementations write to
/// synthetic devices; test implementations record calls.
pub trait EventSink: Send + Sync {
    /// Delivers one finalized entry.
    ///
    /// # Errors
    ///
    /// A sink that cannot deliver returns a description of why; the post
    /// stage logs the failure and continues draining – a broken sink must
    /// not wedge the pipeline.
    fn post(&self, entry: &Entry) -> Result<(), String>;
}
