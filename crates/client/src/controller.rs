//! Async runtime around [`AtlasSession`]: debounce timers, in-flight
//! searches, and state broadcast.
//!
//! One task owns the session and handles everything in arrival order, so the
//! session never needs a lock. Timers and requests run as their own tasks and
//! report back through an event channel, tagged with the debounce generation
//! or request sequence they belong to; the session decides whether a report
//! is still current. Presentation code sends [`Command`]s through an
//! [`AtlasHandle`] and watches [`AtlasView`] snapshots.

use std::sync::Arc;

use fra_atlas_core::{
    AtlasConfig, AtlasSession, AtlasView, ClaimId, ClaimRecord, DebounceTicket, Result, SearchRequest,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::source::ClaimSource;

/// User intents the presentation layer can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetQueryText(String),
    SetStatusFilter(String),
    SetStateFilter(String),
    SetDistrictFilter(String),
    /// Dropdown "View" on the result with this id.
    ViewOne(ClaimId),
    ViewAll,
    /// Marker or footprint click on the map record with this id.
    Select(ClaimId),
    Reset,
    /// Refetch the full claim set.
    Reload,
}

enum Event {
    FullSetLoaded { load: u64, outcome: Result<Vec<ClaimRecord>> },
    DebounceElapsed(u64),
    SearchCompleted { seq: u64, outcome: Result<Vec<ClaimRecord>> },
}

/// Handle to a running atlas session.
pub struct AtlasHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<AtlasView>,
    task: JoinHandle<()>,
}

impl AtlasHandle {
    /// Start a session on the current tokio runtime and kick off the initial
    /// full-set load.
    pub fn spawn<S>(config: &AtlasConfig, source: S) -> Self
    where
        S: ClaimSource + 'static,
    {
        let session = AtlasSession::new(config);
        let (view_tx, view_rx) = watch::channel(session.view());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let controller = Controller { session, source: Arc::new(source), events: event_tx, view: view_tx };
        let task = tokio::spawn(controller.run(command_rx, event_rx));

        Self { commands: command_tx, view: view_rx, task }
    }

    /// Queue a command. Returns `false` if the session has stopped.
    pub fn send(&self, command: Command) -> bool {
        if self.commands.send(command).is_err() {
            debug!("Atlas session stopped; dropping command");
            return false;
        }
        true
    }

    pub fn set_query_text(&self, text: impl Into<String>) -> bool {
        self.send(Command::SetQueryText(text.into()))
    }

    pub fn set_status_filter(&self, value: impl Into<String>) -> bool {
        self.send(Command::SetStatusFilter(value.into()))
    }

    pub fn set_state_filter(&self, value: impl Into<String>) -> bool {
        self.send(Command::SetStateFilter(value.into()))
    }

    pub fn set_district_filter(&self, value: impl Into<String>) -> bool {
        self.send(Command::SetDistrictFilter(value.into()))
    }

    pub fn view_one(&self, id: ClaimId) -> bool {
        self.send(Command::ViewOne(id))
    }

    pub fn view_all(&self) -> bool {
        self.send(Command::ViewAll)
    }

    pub fn select(&self, id: ClaimId) -> bool {
        self.send(Command::Select(id))
    }

    pub fn reset(&self) -> bool {
        self.send(Command::Reset)
    }

    pub fn reload(&self) -> bool {
        self.send(Command::Reload)
    }

    /// Latest published snapshot.
    pub fn view(&self) -> AtlasView {
        self.view.borrow().clone()
    }

    /// A receiver that wakes on every published change.
    pub fn subscribe(&self) -> watch::Receiver<AtlasView> {
        self.view.clone()
    }

    /// Stop accepting commands and wait for the session task to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        let _ = task.await;
    }
}

struct Controller<S> {
    session: AtlasSession,
    source: Arc<S>,
    events: mpsc::UnboundedSender<Event>,
    view: watch::Sender<AtlasView>,
}

impl<S> Controller<S>
where
    S: ClaimSource + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        self.load_full_set();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
            self.publish();
        }
        debug!("Atlas session finished");
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, "Command");
        match command {
            Command::SetQueryText(text) => {
                let ticket = self.session.set_query_text(text);
                self.schedule_debounce(ticket);
            }
            Command::SetStatusFilter(value) => {
                let request = self.session.set_status_filter(value);
                self.dispatch(request);
            }
            Command::SetStateFilter(value) => {
                let request = self.session.set_state_filter(value);
                self.dispatch(request);
            }
            Command::SetDistrictFilter(value) => {
                let request = self.session.set_district_filter(value);
                self.dispatch(request);
            }
            Command::ViewOne(id) => match self.session.find_result(id).cloned() {
                Some(record) => self.session.view_one(record),
                None => debug!(id, "View requested for a claim not in the results"),
            },
            Command::ViewAll => {
                if !self.session.view_all() {
                    debug!("View all with no results");
                }
            }
            Command::Select(id) => {
                if !self.session.select_displayed(id) {
                    debug!(id, "Selected claim is not on the map");
                }
            }
            Command::Reset => self.session.reset(),
            Command::Reload => self.load_full_set(),
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::FullSetLoaded { load, outcome } => {
                self.session.apply_full_set(load, outcome);
            }
            Event::DebounceElapsed(generation) => {
                let request = self.session.debounce_elapsed(generation);
                self.dispatch(request);
            }
            Event::SearchCompleted { seq, outcome } => {
                self.session.apply_results(seq, outcome);
            }
        }
    }

    fn publish(&self) {
        let next = self.session.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn load_full_set(&mut self) {
        let load = self.session.begin_full_set_load();
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = source.fetch_all().await;
            let _ = events.send(Event::FullSetLoaded { load, outcome });
        });
    }

    fn schedule_debounce(&self, ticket: DebounceTicket) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ticket.delay).await;
            let _ = events.send(Event::DebounceElapsed(ticket.generation));
        });
    }

    fn dispatch(&self, request: Option<SearchRequest>) {
        let Some(SearchRequest { seq, params }) = request else {
            return;
        };
        debug!(seq, ?params, "Issuing search");
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = source.search(&params).await;
            let _ = events.send(Event::SearchCompleted { seq, outcome });
        });
    }
}
