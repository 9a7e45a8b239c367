use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;

use super::model::{DashboardModel, PanelId, PanelUpdate};
use crate::api::ReportSource;

/// Hands out load generations. Starting a new load makes every earlier
/// generation stale.
#[derive(Debug, Default)]
pub struct EpochCounter {
    current: AtomicU64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new load and return its epoch.
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }
}

/// Fetch every panel concurrently and fold results in as they arrive.
///
/// A failed fetch only marks its own panel unavailable. If another load
/// starts on `epochs` while this one is in flight, the remaining results
/// are dropped and the returned model is left partially filled.
pub fn load_dashboard(source: &dyn ReportSource, epochs: &EpochCounter) -> DashboardModel {
    let epoch = epochs.next();
    let mut model = DashboardModel::new(epoch);
    let (tx, rx) = mpsc::channel::<PanelUpdate>();

    thread::scope(|scope| {
        for panel in PanelId::ALL {
            let tx = tx.clone();
            scope.spawn(move || {
                let data = source
                    .fetch_data(panel.endpoint(), &[])
                    .map_err(|e| e.to_string());
                // The receiver only goes away once every sender is done.
                let _ = tx.send(PanelUpdate { epoch, panel, data });
            });
        }
        drop(tx);

        for update in rx {
            if !epochs.is_current(update.epoch) {
                tracing::debug!(panel = %update.panel, epoch = update.epoch, "discarding stale result");
                continue;
            }
            if let Err(reason) = &update.data {
                tracing::debug!(panel = %update.panel, %reason, "dashboard panel unavailable");
            }
            model.apply(update);
        }
    });

    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Envelope;
    use crate::dashboard::model::Panel;
    use crate::error::{ReportError, Result};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves canned stats; `fail` endpoints error, `slow` ones sleep first.
    struct FakeBackend {
        fail: Vec<&'static str>,
        slow: Vec<&'static str>,
    }

    impl ReportSource for FakeBackend {
        fn fetch(&self, endpoint: &str, _query: &[(&str, String)]) -> Result<Envelope> {
            if self.slow.iter().any(|e| *e == endpoint) {
                thread::sleep(Duration::from_millis(50));
            }
            if self.fail.iter().any(|e| *e == endpoint) {
                return Err(ReportError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            let body = if endpoint.ends_with("license-summary") {
                r#"{"success":true,"data":{"expired":1,"expiringSoon":2,"active":3}}"#
            } else {
                r#"{"success":true,"data":{"total":10,"currentMonth":6,"previousMonth":4,"trend":[1,2,3]}}"#
            };
            Envelope::parse(endpoint, body)
        }
    }

    #[test]
    fn test_epochs_increase() {
        let epochs = EpochCounter::new();
        assert_eq!(epochs.current(), 0);
        let first = epochs.next();
        let second = epochs.next();
        assert!(second > first);
        assert!(!epochs.is_current(first));
        assert!(epochs.is_current(second));
    }

    #[test]
    fn test_all_panels_load() {
        let backend = FakeBackend { fail: vec![], slow: vec!["dashboard/leads-stats"] };
        let epochs = EpochCounter::new();
        let model = load_dashboard(&backend, &epochs);

        assert_eq!(model.epoch, 1);
        assert_eq!(model.leads.ready().unwrap().growth(), Some(50.0));
        assert_eq!(model.licenses.ready().unwrap().active, 3);
        assert!(model.failures().is_empty());
    }

    #[test]
    fn test_leads_failure_is_isolated() {
        let backend = FakeBackend { fail: vec!["dashboard/leads-stats"], slow: vec![] };
        let model = load_dashboard(&backend, &EpochCounter::new());

        assert!(matches!(model.leads, Panel::Unavailable(_)));
        assert_eq!(model.leads.show(|s| s.total.to_string()), "--");
        assert_eq!(model.quotations.ready().unwrap().total, 10.0);
        assert_eq!(model.purchase_orders.ready().unwrap().trend, vec![1.0, 2.0, 3.0]);
    }

    /// Holds the leads fetch until the test releases it.
    struct GatedBackend {
        inner: FakeBackend,
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ReportSource for GatedBackend {
        fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Envelope> {
            if endpoint == PanelId::Leads.endpoint() {
                self.started.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            self.inner.fetch(endpoint, query)
        }
    }

    #[test]
    fn test_newer_load_discards_in_flight_results() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let backend = GatedBackend {
            inner: FakeBackend { fail: vec![], slow: vec![] },
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        let epochs = EpochCounter::new();

        thread::scope(|scope| {
            let load = scope.spawn(|| load_dashboard(&backend, &epochs));

            started_rx.recv().unwrap();
            let newer = epochs.next();
            release_tx.send(()).unwrap();
            let model = load.join().unwrap();

            assert_eq!(model.epoch, 1);
            assert_eq!(newer, 2);
            // The leads result arrived after the newer load began.
            assert!(matches!(model.leads, Panel::Loading));
            assert!(model.failures().is_empty());
        });
    }

    #[test]
    fn test_everything_failing_still_returns_model() {
        let backend = FakeBackend {
            fail: PanelId::ALL.iter().map(|p| p.endpoint()).collect(),
            slow: vec![],
        };
        let model = load_dashboard(&backend, &EpochCounter::new());
        assert_eq!(model.failures().len(), 4);
    }
}
