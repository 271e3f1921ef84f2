// Shared test helpers: scripted transports, probes and worker pools.
//
// Every helper counts its calls so tests can assert on network activity
// without opening sockets.
#![allow(dead_code)] // Each test binary uses a different subset

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

use scan_dispatch::{
    HttpRequest, HttpResponse, ReachabilityProbe, Transport, TransportError, TransportErrorKind,
    WorkerPool,
};

/// One scripted transport answer.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// 200 OK after the given RTT
    Ok(Duration),
    /// A failure of the given kind (timeouts wait for the full timeout first)
    Fail(TransportErrorKind),
    /// An HTTP error status reported as a failure
    Status(u16),
}

/// Transport answering from a script, then from a fallback step.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl ScriptedTransport {
    pub fn scripted(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(ScriptedTransport {
            script: Mutex::new(steps.into()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::scripted(Vec::new(), Step::Ok(Duration::from_millis(50)))
    }

    pub fn always_failing(kind: TransportErrorKind) -> Arc<Self> {
        Self::scripted(Vec::new(), Step::Fail(kind))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Timeouts passed to each call, in call order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn do_request(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().unwrap().push(timeout);
        self.requests.lock().unwrap().push(request.clone());

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        match step {
            Step::Ok(rtt) => {
                tokio::time::sleep(rtt).await;
                Ok(HttpResponse::new(
                    StatusCode::OK,
                    HeaderMap::new(),
                    b"<html>ok</html>".to_vec(),
                    request.url().clone(),
                    rtt,
                ))
            }
            Step::Fail(kind) => {
                if kind == TransportErrorKind::Timeout {
                    tokio::time::sleep(timeout).await;
                }
                Err(TransportError::new(
                    kind,
                    format!("{} while fetching {}", kind, request.url()),
                ))
            }
            Step::Status(status) => Err(TransportError::http_status(
                status,
                format!("{} for {}", status, request.url()),
            )),
        }
    }
}

/// Probe with a fixed answer that counts calls.
pub struct CountingProbe {
    reachable: bool,
    calls: AtomicUsize,
    timeouts: Mutex<Vec<Duration>>,
}

impl CountingProbe {
    pub fn new(reachable: bool) -> Arc<Self> {
        Arc::new(CountingProbe {
            reachable,
            calls: AtomicUsize::new(0),
            timeouts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReachabilityProbe for CountingProbe {
    async fn is_root_reachable(&self, base_url: &Url, timeout: Duration) -> bool {
        assert_eq!(base_url.path(), "/", "probe must target the site root");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().unwrap().push(timeout);
        self.reachable
    }
}

/// Worker pool that only records the requested sizes.
pub struct RecordingPool {
    size: AtomicUsize,
    history: Mutex<Vec<usize>>,
}

impl RecordingPool {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(RecordingPool {
            size: AtomicUsize::new(size),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn resizes(&self) -> Vec<usize> {
        self.history.lock().unwrap().clone()
    }
}

impl WorkerPool for RecordingPool {
    fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    fn set_size(&self, size: usize) {
        self.history.lock().unwrap().push(size);
        self.size.store(size, Ordering::SeqCst);
    }
}
