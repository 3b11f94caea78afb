//! Test harness for the client crate.
//!
//! Provides claim fixtures, a scripted in-memory [`ClaimSource`] with
//! per-query gates for ordering tests, and an in-process axum server standing
//! in for the records API.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use fra_atlas_client::{AtlasHandle, ClaimSource};
use fra_atlas_core::{AtlasError, ClaimId, ClaimRecord, Result, SearchParams};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn claim(id: ClaimId, holder: &str, village: &str, district: &str, coordinates: &str, status: &str) -> ClaimRecord {
    let mut record = ClaimRecord::new(id, holder);
    record.village_name = village.into();
    record.district = district.into();
    record.state = "Odisha".into();
    record.coordinates = coordinates.into();
    record.total_area_claimed = "2.5 hectare".into();
    record.claim_id = format!("FRA/OD/{id:04}");
    record.status = status.into();
    record
}

/// Three claims; the Kandhamal one has no usable coordinates.
pub fn three_claims() -> Vec<ClaimRecord> {
    vec![
        claim(1, "Sita Majhi", "Lamtaput", "Koraput", "18.81,82.71", "Verified"),
        claim(2, "Ramesh Gond", "Bissam Cuttack", "Rayagada", "19.17,83.41", "pending"),
        claim(3, "Laxmi Kanhar", "Daringbadi", "Kandhamal", "unknown", "rejected"),
    ]
}

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Script {
    full_set: Vec<ClaimRecord>,
    full_set_fails: bool,
    full_set_delay: Option<Duration>,
    responses: HashMap<String, Vec<ClaimRecord>>,
    failures: HashSet<String>,
    gates: HashMap<String, oneshot::Receiver<()>>,
    calls: Vec<SearchParams>,
}

/// In-memory source keyed by query text. Unscripted queries return no records.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

fn key(params: &SearchParams) -> String {
    params.q.clone().unwrap_or_default()
}

impl ScriptedSource {
    pub fn with_full_set(records: Vec<ClaimRecord>) -> Self {
        let source = Self::default();
        source.set_full_set(records);
        source
    }

    pub fn set_full_set(&self, records: Vec<ClaimRecord>) {
        let mut script = self.script.lock().unwrap();
        script.full_set = records;
        script.full_set_fails = false;
    }

    pub fn fail_full_set(&self) {
        self.script.lock().unwrap().full_set_fails = true;
    }

    /// Make the next full-set fetch answer only after `delay`, with the set
    /// as it stood when the fetch started.
    pub fn delay_next_full_set(&self, delay: Duration) {
        self.script.lock().unwrap().full_set_delay = Some(delay);
    }

    pub fn respond(&self, q: &str, records: Vec<ClaimRecord>) {
        self.script.lock().unwrap().responses.insert(q.to_string(), records);
    }

    pub fn fail(&self, q: &str) {
        self.script.lock().unwrap().failures.insert(q.to_string());
    }

    /// Hold the next search for `q` until the returned sender fires.
    pub fn gate(&self, q: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().gates.insert(q.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> Vec<SearchParams> {
        self.script.lock().unwrap().calls.clone()
    }
}

impl ClaimSource for ScriptedSource {
    async fn fetch_all(&self) -> Result<Vec<ClaimRecord>> {
        let (outcome, delay) = {
            let mut script = self.script.lock().unwrap();
            let outcome = if script.full_set_fails {
                Err(AtlasError::transport("connection refused"))
            } else {
                Ok(script.full_set.clone())
            };
            (outcome, script.full_set_delay.take())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<ClaimRecord>> {
        let key = key(params);
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(params.clone());
            script.gates.remove(&key)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let script = self.script.lock().unwrap();
        if script.failures.contains(&key) {
            return Err(AtlasError::transport("connection refused"));
        }
        Ok(script.responses.get(&key).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Session helpers
// ---------------------------------------------------------------------------

/// Wait until the initial full-set load has been applied.
pub async fn wait_loaded(handle: &AtlasHandle) {
    let mut rx = handle.subscribe();
    rx.wait_for(|view| view.full_set_loaded).await.expect("session stopped before loading");
}

/// Let every ready task run. Under a paused clock this also fires any timer
/// due within the next millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ---------------------------------------------------------------------------
// Fake records API
// ---------------------------------------------------------------------------

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Fake backend crashed");
    });
    format!("http://{addr}")
}
