//! Custom test assertions for integration tests

use media_relay::{Event, RequestId};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Assert that nothing is left under the workspace root
///
/// A missing root counts as empty.
pub fn assert_no_residue(root: &Path) {
    if !root.exists() {
        return;
    }
    let leftovers: Vec<_> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().to_path_buf())
        .collect();
    assert!(
        leftovers.is_empty(),
        "workspace root should be empty, found: {leftovers:?}"
    );
}

/// Collect events for `id` until its `Cleaned` event arrives
///
/// Returns whatever was collected if `timeout` elapses first.
pub async fn collect_events_for(
    events: &mut broadcast::Receiver<Event>,
    id: RequestId,
    timeout: Duration,
) -> Vec<Event> {
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if event.request_id() == id => {
                    let done = matches!(event, Event::Cleaned { .. });
                    collected.push(event);
                    if done {
                        break;
                    }
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await;
    collected
}
