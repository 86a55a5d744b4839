//! Latest-snapshot cell shared between the pilot and displays.

use drone_core::models::TelemetrySnapshot;
use tokio::sync::watch;

/// Create the cell. The feed is the only writer; views can be cloned freely.
pub fn telemetry_feed() -> (TelemetryFeed, TelemetryView) {
    let (tx, rx) = watch::channel(None);
    (TelemetryFeed { tx }, TelemetryView { rx })
}

/// Write side, owned by the pilot.
pub struct TelemetryFeed {
    tx: watch::Sender<Option<TelemetrySnapshot>>,
}

impl TelemetryFeed {
    /// Replace the published snapshot as a whole.
    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        self.tx.send_replace(Some(snapshot));
    }

    pub fn view(&self) -> TelemetryView {
        TelemetryView {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side, polled by displays once per frame.
#[derive(Clone)]
pub struct TelemetryView {
    rx: watch::Receiver<Option<TelemetrySnapshot>>,
}

impl TelemetryView {
    /// Most recent snapshot, or `None` before the first decode.
    pub fn current(&self) -> Option<TelemetrySnapshot> {
        *self.rx.borrow()
    }

    /// Most recent snapshot, or the default one before the first decode.
    pub fn latest(&self) -> TelemetrySnapshot {
        self.current().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_starts_empty() {
        let (_feed, view) = telemetry_feed();
        assert!(view.current().is_none());
        assert_eq!(view.latest(), TelemetrySnapshot::default());
    }

    #[test]
    fn views_see_latest_publish() {
        let (feed, view) = telemetry_feed();
        let other = feed.view();

        feed.publish(TelemetrySnapshot {
            x: 1.0,
            ..TelemetrySnapshot::default()
        });
        feed.publish(TelemetrySnapshot {
            x: 2.0,
            ..TelemetrySnapshot::default()
        });

        assert_eq!(view.latest().x, 2.0);
        assert_eq!(other.clone().latest().x, 2.0);
    }
}
