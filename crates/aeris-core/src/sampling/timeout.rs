//! Deadline wrapper for blocking sample sources.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;

use super::{BackscatterSample, CancelFlag, SampleSource};
use crate::error::AnalysisError;
use crate::geometry::ValidPolygon;
use crate::request::{DateRange, Polarization};

/// Runs the inner source on a worker thread and gives up after `timeout`.
/// On expiry the cancel flag is raised so a cooperative source can stop; the
/// caller gets `Timeout`, never a partial sample.
pub struct TimedSource<S: ?Sized> {
    inner: Arc<S>,
    timeout: Duration,
}

impl<S: SampleSource + ?Sized + 'static> TimedSource<S> {
    pub fn new(inner: Arc<S>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<S: SampleSource + ?Sized + 'static> SampleSource for TimedSource<S> {
    fn sample(
        &self,
        polygon: &ValidPolygon,
        date_range: &DateRange,
        polarization: Polarization,
        cancel: &CancelFlag,
    ) -> Result<BackscatterSample, AnalysisError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let worker_polygon = polygon.clone();
        let worker_range = *date_range;
        let worker_cancel = cancel.clone();

        let spawned = thread::Builder::new()
            .name("aeris-sampler".into())
            .spawn(move || {
                let result = inner.sample(&worker_polygon, &worker_range, polarization, &worker_cancel);
                // The receiver is gone once the deadline passed.
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            // No threads (e.g. wasm32): run inline without a deadline.
            warn!("could not spawn sampler thread ({e}), sampling inline");
            return self.inner.sample(polygon, date_range, polarization, cancel);
        }

        let after_ms = self.timeout.as_millis() as u64;
        match rx.recv_timeout(self.timeout) {
            Ok(Err(AnalysisError::Timeout { .. })) => Err(AnalysisError::Timeout { after_ms }),
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!("sampler {} exceeded {after_ms} ms, cancelled", self.inner.version());
                Err(AnalysisError::Timeout { after_ms })
            }
            Err(RecvTimeoutError::Disconnected) => Err(AnalysisError::NoDataAvailable(
                "sampler worker terminated without a result".into(),
            )),
        }
    }

    fn version(&self) -> String {
        self.inner.version()
    }
}
