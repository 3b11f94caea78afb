//! Search session state machine: query control, result projection, and
//! feature selection for the atlas view.
//!
//! The session is synchronous and owns no timers or connections. Operations
//! that need the outside world hand back a value describing it: a
//! [`DebounceTicket`] to wait on, or a [`SearchRequest`] to send. The caller
//! feeds outcomes back through [`AtlasSession::debounce_elapsed`] and
//! [`AtlasSession::apply_results`].
//!
//! Three counters keep late work from clobbering newer state:
//!
//! - the debounce generation, bumped by every keystroke and by anything that
//!   makes a pending keystroke search moot (filter change, view, reset);
//! - the request sequence, bumped by every search issued and by anything that
//!   should make an in-flight response irrelevant. Only the response carrying
//!   the latest sequence is applied;
//! - the full-set load tag, bumped by every fetch of the unfiltered set, so an
//!   overlapping reload always wins over the fetch it replaced.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AtlasConfig;
use crate::error::Result;
use crate::geo::{project_markers, MapMarker};
use crate::types::{dedupe_by_id, ClaimId, ClaimRecord, QueryState, SearchParams, SearchResultSet};

/// A debounced search waiting to fire. Hand the generation back to
/// [`AtlasSession::debounce_elapsed`] once `delay` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket {
    pub generation: u64,
    pub delay: Duration,
}

/// One search to send to the records API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub params: SearchParams,
}

/// What the map currently shows.
#[derive(Debug, Clone, PartialEq)]
enum DisplaySet {
    Full,
    Single(ClaimRecord),
    Subset(Vec<ClaimRecord>),
}

/// Snapshot of everything a presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AtlasView {
    pub query: QueryState,
    pub loading: bool,
    pub dropdown_visible: bool,
    /// Dropdown entries, each offering a "View" action.
    pub dropdown: Vec<ClaimRecord>,
    /// Records on the map, including those without a usable position.
    pub display: Vec<ClaimRecord>,
    /// Renderable subset of `display`.
    pub markers: Vec<MapMarker>,
    pub selected: Option<ClaimRecord>,
    pub full_set_loaded: bool,
    pub full_set_len: usize,
}

pub struct AtlasSession {
    full_set: Vec<ClaimRecord>,
    full_set_loaded: bool,
    query: QueryState,
    results: SearchResultSet,
    display: DisplaySet,
    selected: Option<ClaimRecord>,
    debounce: Duration,
    narrow_map_on_results: bool,
    debounce_generation: u64,
    latest_seq: u64,
    latest_load: u64,
}

impl AtlasSession {
    pub fn new(config: &AtlasConfig) -> Self {
        Self {
            full_set: Vec::new(),
            full_set_loaded: false,
            query: QueryState::default(),
            results: SearchResultSet::default(),
            display: DisplaySet::Full,
            selected: None,
            debounce: config.debounce,
            narrow_map_on_results: config.narrow_map_on_results,
            debounce_generation: 0,
            latest_seq: 0,
            latest_load: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn results(&self) -> &SearchResultSet {
        &self.results
    }

    pub fn selected(&self) -> Option<&ClaimRecord> {
        self.selected.as_ref()
    }

    pub fn full_set(&self) -> &[ClaimRecord] {
        &self.full_set
    }

    /// Records currently on the map.
    pub fn display_records(&self) -> &[ClaimRecord] {
        match &self.display {
            DisplaySet::Full => &self.full_set,
            DisplaySet::Single(record) => std::slice::from_ref(record),
            DisplaySet::Subset(records) => records,
        }
    }

    /// Sequence number of the most recently issued search.
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Look up a dropdown entry by id.
    pub fn find_result(&self, id: ClaimId) -> Option<&ClaimRecord> {
        self.results.records.iter().find(|r| r.id == id)
    }

    /// Look up a record on the map by id.
    pub fn find_displayed(&self, id: ClaimId) -> Option<&ClaimRecord> {
        self.display_records().iter().find(|r| r.id == id)
    }

    pub fn view(&self) -> AtlasView {
        let display = self.display_records().to_vec();
        AtlasView {
            query: self.query.clone(),
            loading: self.results.loading,
            dropdown_visible: self.results.visible,
            dropdown: self.results.records.clone(),
            markers: project_markers(&display),
            display,
            selected: self.selected.clone(),
            full_set_loaded: self.full_set_loaded,
            full_set_len: self.full_set.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Full set
    // -----------------------------------------------------------------------

    /// Tag a full-set fetch about to start. Only the latest tag is applied.
    pub fn begin_full_set_load(&mut self) -> u64 {
        self.latest_load += 1;
        self.latest_load
    }

    /// Install the unfiltered claim set for a fetch started by
    /// [`begin_full_set_load`](Self::begin_full_set_load). A failed load keeps
    /// whatever set was loaded before (empty on first load). Returns `false`
    /// when a newer fetch has started since and the outcome was discarded.
    pub fn apply_full_set(&mut self, load: u64, outcome: Result<Vec<ClaimRecord>>) -> bool {
        if load != self.latest_load {
            debug!(load, latest = self.latest_load, "Discarding stale claim set");
            return false;
        }
        match outcome {
            Ok(records) => {
                self.full_set = dedupe_by_id(records);
                info!(count = self.full_set.len(), "Loaded claim set");
            }
            Err(e) => {
                warn!(error = %e, kept = self.full_set.len(), "Failed to load claim set");
            }
        }
        self.full_set_loaded = true;
        true
    }

    /// Begin and apply in one step, for callers that fetched synchronously.
    pub fn load_full_set(&mut self, outcome: Result<Vec<ClaimRecord>>) {
        let load = self.begin_full_set_load();
        self.apply_full_set(load, outcome);
    }

    // -----------------------------------------------------------------------
    // Query controller
    // -----------------------------------------------------------------------

    /// Store the text right away and schedule a trailing-edge debounced
    /// search. Any earlier pending schedule is superseded.
    pub fn set_query_text(&mut self, text: impl Into<String>) -> DebounceTicket {
        self.query.query = text.into();
        self.debounce_generation += 1;
        DebounceTicket { generation: self.debounce_generation, delay: self.debounce }
    }

    /// Fire the debounced search if `generation` is still the latest one.
    pub fn debounce_elapsed(&mut self, generation: u64) -> Option<SearchRequest> {
        if generation != self.debounce_generation {
            return None;
        }
        self.search(self.query.params())
    }

    pub fn set_status_filter(&mut self, value: impl Into<String>) -> Option<SearchRequest> {
        self.query.status_filter = value.into();
        self.search_now()
    }

    pub fn set_state_filter(&mut self, value: impl Into<String>) -> Option<SearchRequest> {
        self.query.state_filter = value.into();
        self.search_now()
    }

    pub fn set_district_filter(&mut self, value: impl Into<String>) -> Option<SearchRequest> {
        self.query.district_filter = value.into();
        self.search_now()
    }

    /// Filter changes search immediately with the current text, which also
    /// makes any pending keystroke search redundant.
    fn search_now(&mut self) -> Option<SearchRequest> {
        self.debounce_generation += 1;
        self.search(self.query.params())
    }

    /// Start a search. Blank parameters mean "no active search": the dropdown
    /// closes, nothing is sent, and any in-flight response is dropped.
    pub fn search(&mut self, params: SearchParams) -> Option<SearchRequest> {
        self.latest_seq += 1;
        if params.is_empty() {
            self.results = SearchResultSet::default();
            return None;
        }
        // Results belong to one request; nothing is current until it answers.
        self.results.records.clear();
        self.results.loading = true;
        self.results.visible = true;
        Some(SearchRequest { seq: self.latest_seq, params })
    }

    /// Apply a search outcome. Returns `false` when the response belongs to a
    /// superseded request and was discarded.
    pub fn apply_results(&mut self, seq: u64, outcome: Result<Vec<ClaimRecord>>) -> bool {
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, "Discarding stale search response");
            return false;
        }
        self.results.loading = false;

        match outcome {
            Ok(records) => {
                let records = dedupe_by_id(records);
                debug!(seq, count = records.len(), "Search results");
                if records.is_empty() {
                    // Nothing matched: the map shows everything rather than nothing.
                    self.display = DisplaySet::Full;
                } else if self.narrow_map_on_results {
                    self.display = DisplaySet::Subset(records.clone());
                }
                self.results.records = records;
            }
            Err(e) => {
                warn!(seq, error = %e, "Search failed, showing full claim set");
                self.results.records.clear();
                self.results.visible = false;
                self.display = DisplaySet::Full;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Result projector
    // -----------------------------------------------------------------------

    /// Show exactly one record and select it. Filters stay; the text clears.
    pub fn view_one(&mut self, record: ClaimRecord) {
        self.display = DisplaySet::Single(record.clone());
        self.selected = Some(record);
        self.close_dropdown();
    }

    /// Show every current result on the map. No-op without results.
    pub fn view_all(&mut self) -> bool {
        if self.results.records.is_empty() {
            return false;
        }
        self.display = DisplaySet::Subset(self.results.records.clone());
        self.selected = None;
        self.close_dropdown();
        true
    }

    /// Back to the unfiltered full set with nothing selected.
    pub fn reset(&mut self) {
        self.query = QueryState::default();
        self.results = SearchResultSet::default();
        self.selected = None;
        self.display = DisplaySet::Full;
        self.debounce_generation += 1;
        self.latest_seq += 1;
    }

    fn close_dropdown(&mut self) {
        self.results.visible = false;
        self.results.loading = false;
        self.query.query.clear();
        self.debounce_generation += 1;
        self.latest_seq += 1;
    }

    // -----------------------------------------------------------------------
    // Feature selector
    // -----------------------------------------------------------------------

    /// Marker or footprint click. The map contents don't change.
    pub fn select(&mut self, record: ClaimRecord) {
        self.selected = Some(record);
    }

    /// Select a record currently on the map. Returns `false` if it isn't there.
    pub fn select_displayed(&mut self, id: ClaimId) -> bool {
        match self.find_displayed(id).cloned() {
            Some(record) => {
                self.select(record);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AtlasError;

    fn claim(id: ClaimId, village: &str, coordinates: &str) -> ClaimRecord {
        let mut record = ClaimRecord::new(id, format!("Holder {id}"));
        record.village_name = village.into();
        record.district = village.into();
        record.coordinates = coordinates.into();
        record.total_area_claimed = "1.5 hectare".into();
        record.status = "pending".into();
        record
    }

    fn loaded_session() -> AtlasSession {
        let mut session = AtlasSession::new(&AtlasConfig::default());
        session.load_full_set(Ok(vec![
            claim(1, "Koraput", "18.81,82.71"),
            claim(2, "Rayagada", "19.17,83.41"),
            claim(3, "Kandhamal", "not-a-point"),
        ]));
        session
    }

    #[test]
    fn keystrokes_supersede_pending_debounce() {
        let mut session = loaded_session();
        let first = session.set_query_text("K");
        let second = session.set_query_text("Ko");
        let last = session.set_query_text("Koraput");
        assert_eq!(last.delay, Duration::from_millis(350));
        assert!(session.debounce_elapsed(first.generation).is_none());
        assert!(session.debounce_elapsed(second.generation).is_none());
        let request = session.debounce_elapsed(last.generation).expect("latest ticket fires");
        assert_eq!(request.params.q.as_deref(), Some("Koraput"));
        assert!(session.results().loading);
        assert!(session.results().visible);
    }

    #[test]
    fn blank_search_short_circuits() {
        let mut session = loaded_session();
        let ticket = session.set_query_text("   ");
        assert!(session.debounce_elapsed(ticket.generation).is_none());
        assert!(!session.results().loading);
        assert!(!session.results().visible);
    }

    #[test]
    fn filters_search_immediately_with_current_text() {
        let mut session = loaded_session();
        let ticket = session.set_query_text("Kor");
        let request = session.set_status_filter("pending").expect("filter searches");
        assert_eq!(request.params, SearchParams::new("Kor", "pending", "", ""));
        // The keystroke search is now redundant
        assert!(session.debounce_elapsed(ticket.generation).is_none());

        let request = session.set_state_filter("Odisha").unwrap();
        assert_eq!(request.params.state.as_deref(), Some("Odisha"));
        assert_eq!(request.params.status.as_deref(), Some("pending"));
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut session = loaded_session();
        let a = session.search(SearchParams::text("A")).unwrap();
        let b = session.search(SearchParams::text("B")).unwrap();
        assert!(session.apply_results(b.seq, Ok(vec![claim(2, "B", "1,1")])));
        assert!(!session.apply_results(a.seq, Ok(vec![claim(1, "A", "1,1")])));
        assert_eq!(session.results().records.len(), 1);
        assert_eq!(session.results().records[0].id, 2);
    }

    #[test]
    fn empty_results_show_full_set() {
        let mut session = loaded_session();
        let request = session.search(SearchParams::text("Nowhere")).unwrap();
        assert!(session.apply_results(request.seq, Ok(vec![])));
        assert_eq!(session.display_records().len(), 3);
        assert!(session.results().records.is_empty());
        assert!(!session.results().loading);
    }

    #[test]
    fn failed_search_falls_back_to_full_set() {
        let mut session = loaded_session();
        session.view_one(claim(1, "Koraput", "18.81,82.71"));
        let request = session.search(SearchParams::text("Koraput")).unwrap();
        session.apply_results(request.seq, Err(AtlasError::transport("connection refused")));
        assert_eq!(session.display_records().len(), 3);
        assert!(session.results().records.is_empty());
        assert!(!session.results().visible);
        assert!(!session.results().loading);
    }

    #[test]
    fn view_one_keeps_filters_and_clears_text() {
        let mut session = loaded_session();
        session.set_query_text("Kor");
        let request = session.set_status_filter("pending").unwrap();
        session.apply_results(request.seq, Ok(vec![claim(1, "Koraput", "18.81,82.71")]));

        let record = session.find_result(1).cloned().unwrap();
        session.view_one(record.clone());
        assert_eq!(session.display_records(), std::slice::from_ref(&record));
        assert_eq!(session.selected(), Some(&record));
        assert!(!session.results().visible);
        assert_eq!(session.query().query, "");
        assert_eq!(session.query().status_filter, "pending");
    }

    #[test]
    fn view_all_needs_results() {
        let mut session = loaded_session();
        assert!(!session.view_all());

        let request = session.search(SearchParams::text("a")).unwrap();
        session.apply_results(
            request.seq,
            Ok(vec![claim(1, "Koraput", "18.81,82.71"), claim(2, "Rayagada", "19.17,83.41")]),
        );
        session.select_displayed(3);
        assert!(session.view_all());
        assert_eq!(session.display_records().len(), 2);
        assert!(session.selected().is_none());
        assert!(!session.results().visible);
    }

    #[test]
    fn view_all_while_next_search_pending_does_nothing() {
        let mut session = loaded_session();
        let a = session.search(SearchParams::text("a")).unwrap();
        session.apply_results(
            a.seq,
            Ok(vec![claim(1, "Koraput", "18.81,82.71"), claim(2, "Rayagada", "19.17,83.41")]),
        );

        let ticket = session.set_query_text("B");
        let b = session.debounce_elapsed(ticket.generation).unwrap();
        assert!(session.results().loading);
        assert!(session.results().records.is_empty());
        assert!(session.view().dropdown.is_empty());

        assert!(!session.view_all());
        assert_eq!(session.display_records().len(), 3);
        assert!(session.apply_results(b.seq, Ok(vec![claim(2, "Rayagada", "19.17,83.41")])));
        assert_eq!(session.results().records.len(), 1);
    }

    #[test]
    fn late_response_after_view_is_ignored() {
        let mut session = loaded_session();
        let request = session.search(SearchParams::text("Koraput")).unwrap();
        session.view_one(claim(2, "Rayagada", "19.17,83.41"));
        assert!(!session.apply_results(request.seq, Ok(vec![])));
        assert_eq!(session.display_records().len(), 1);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut session = loaded_session();
        session.set_query_text("Kor");
        session.set_district_filter("Koraput");
        session.view_one(claim(1, "Koraput", "18.81,82.71"));

        session.reset();
        let once = session.view();
        session.reset();
        assert_eq!(session.view(), once);
        assert_eq!(once.display.len(), 3);
        assert!(once.selected.is_none());
        assert_eq!(once.query, QueryState::default());
    }

    #[test]
    fn view_one_then_reset_restores_full_set() {
        let mut session = loaded_session();
        session.view_one(claim(2, "Rayagada", "19.17,83.41"));
        assert_eq!(session.display_records().len(), 1);
        session.reset();
        assert_eq!(session.display_records(), session.full_set());
        assert!(session.selected().is_none());
    }

    #[test]
    fn unplaceable_records_are_listed_but_not_mapped() {
        let mut session = loaded_session();
        let request = session.search(SearchParams::text("K")).unwrap();
        session.apply_results(
            request.seq,
            Ok(vec![claim(1, "Koraput", "18.81,82.71"), claim(3, "Kandhamal", "not-a-point")]),
        );
        let view = session.view();
        assert_eq!(view.dropdown.len(), 2);
        assert_eq!(view.display.len(), 3);
        assert_eq!(view.markers.len(), 2);
        assert!(view.markers.iter().all(|m| m.id != 3));
    }

    #[test]
    fn narrowing_flag_moves_map_with_results() {
        let config = AtlasConfig { narrow_map_on_results: true, ..AtlasConfig::default() };
        let mut session = AtlasSession::new(&config);
        session.load_full_set(Ok(vec![claim(1, "A", "1,1"), claim(2, "B", "2,2")]));
        let request = session.search(SearchParams::text("A")).unwrap();
        session.apply_results(request.seq, Ok(vec![claim(1, "A", "1,1")]));
        assert_eq!(session.display_records().len(), 1);
    }

    #[test]
    fn select_does_not_change_display() {
        let mut session = loaded_session();
        assert!(session.select_displayed(2));
        assert_eq!(session.selected().map(|r| r.id), Some(2));
        assert_eq!(session.display_records().len(), 3);
        assert!(!session.select_displayed(42));
    }

    #[test]
    fn older_full_set_fetch_cannot_replace_newer() {
        let mut session = AtlasSession::new(&AtlasConfig::default());
        let initial = session.begin_full_set_load();
        let reload = session.begin_full_set_load();
        assert!(session.apply_full_set(reload, Ok(vec![claim(1, "A", "1,1"), claim(2, "B", "2,2")])));
        assert!(!session.apply_full_set(initial, Ok(vec![claim(1, "A", "1,1")])));
        assert_eq!(session.full_set().len(), 2);
    }

    #[test]
    fn failed_reload_keeps_previous_full_set() {
        let mut session = loaded_session();
        session.load_full_set(Err(AtlasError::status(502, "bad gateway")));
        assert_eq!(session.full_set().len(), 3);
        assert!(session.view().full_set_loaded);
    }
}
