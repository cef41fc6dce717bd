use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};

use crate::api::{PitwallApi, or_empty};
use crate::errors::PitwallError;
use crate::model::{EventDetail, LapTelemetryPoint, ResultRow, Session, SessionId, SessionType};

use super::intervals::display_gaps;
use super::selection::{SelectionFallback, apply_reconciliation, pick_default_session};
use super::tracker::LifecycleTracker;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Everything the event page shows, published as a whole after every change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    pub event: Option<EventDetail>,
    pub selected_session: Option<Session>,
    pub classes: Vec<String>,
    pub selected_class: Option<String>,
    pub results: Vec<ResultRow>,
    pub telemetry: Vec<LapTelemetryPoint>,
    pub results_loading: bool,
    pub telemetry_loading: bool,
    pub classes_loading: bool,
    pub polling: bool,
    /// Why the last event refresh failed, cleared by the next successful one
    pub last_refresh_error: Option<String>,
}

impl EventView {
    pub fn is_loading(&self) -> bool {
        self.results_loading || self.telemetry_loading || self.classes_loading
    }

    /// Gap column for the current results, see [`display_gaps`].
    pub fn gaps(&self) -> Vec<Option<String>> {
        match &self.event {
            Some(event) => display_gaps(
                &self.results,
                &event.series.slug,
                self.selected_class.as_deref(),
            ),
            None => self.results.iter().map(|r| r.gap.clone()).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewOptions {
    pub poll_interval: Duration,
    pub fallback: SelectionFallback,
    /// Class filter applied from the start, dropped if the session does not have it.
    pub initial_class: Option<String>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            fallback: SelectionFallback::default(),
            initial_class: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewCommand {
    SelectSession(SessionId),
    SelectClass(Option<String>),
    Shutdown,
}

/// Fetch results reported back to the actor, tagged with the generation they were
/// started for.
#[derive(Debug)]
enum Completion {
    Classes {
        generation: u64,
        classes: Vec<String>,
    },
    Results {
        generation: u64,
        rows: Vec<ResultRow>,
    },
    Telemetry {
        generation: u64,
        points: Vec<LapTelemetryPoint>,
    },
}

/// In-flight fetches for one dependency. Restarting aborts them and moves to a new
/// generation so late completions can be told apart.
#[derive(Default)]
struct Fetches {
    generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl Fetches {
    fn restart(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.generation
    }

    fn cancel(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

impl Drop for Fetches {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Owner of all event page state. Only this task mutates it.
struct ViewActor {
    api: Arc<dyn PitwallApi>,
    slug: String,
    options: ViewOptions,
    tracker: LifecycleTracker,
    state: EventView,
    publisher: watch::Sender<EventView>,
    completions: mpsc::UnboundedSender<Completion>,
    // session changes guard the class list, session and class changes guard the data
    class_fetch: Fetches,
    data_fetch: Fetches,
    poll: Option<Interval>,
}

impl ViewActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ViewCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        let fetched = self.api.event(&self.slug).await;
        self.state.last_refresh_error = fetched.as_ref().err().map(ToString::to_string);
        if self.tracker.apply(fetched) {
            self.state.event = self.tracker.snapshot().cloned();
            self.state.selected_session = self
                .tracker
                .snapshot()
                .and_then(|e| pick_default_session(&e.status, &e.sessions))
                .cloned();
            match &self.state.selected_session {
                Some(session) => info!("Showing {} of {}", session.schedule_label(), self.slug),
                None => info!("Event {} has no result sessions", self.slug),
            }
            self.on_session_changed();
        }
        self.sync_poll_timer();
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ViewCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = completions.recv() => self.apply_completion(completion),
                _ = next_tick(&mut self.poll) => self.poll_cycle().await,
            }
            self.sync_poll_timer();
            self.publish();
        }

        self.class_fetch.cancel();
        self.data_fetch.cancel();
        debug!("Event view for {} stopped", self.slug);
    }

    fn publish(&self) {
        let state = &self.state;
        self.publisher.send_if_modified(|current| {
            if current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
    }

    /// The poll timer exists only while the event is live.
    fn sync_poll_timer(&mut self) {
        match (self.tracker.should_poll(), self.poll.is_some()) {
            (true, false) => {
                let period = self.options.poll_interval.max(Duration::from_millis(1));
                info!("Event {} is live, refreshing every {:?}", self.slug, period);
                let mut interval = time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.poll = Some(interval);
            }
            (false, true) => {
                info!("Event {} is no longer live, stopped refreshing", self.slug);
                self.poll = None;
            }
            _ => {}
        }
        self.state.polling = self.poll.is_some();
    }

    fn handle_command(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::SelectSession(id) => {
                if self.state.selected_session.as_ref().is_some_and(|s| s.id == id) {
                    return;
                }
                let Some(session) = self.selectable_session(id) else {
                    return;
                };
                debug!("Session {} selected", id);
                self.state.selected_session = Some(session);
                self.on_session_changed();
            }
            ViewCommand::SelectClass(class_name) => {
                if class_name == self.state.selected_class {
                    return;
                }
                // while the list loads, its completion resets a class it does not offer
                if let Some(class) = &class_name {
                    if !self.state.classes_loading && !self.state.classes.contains(class) {
                        warn!("Class {} is not offered by this session, ignoring it", class);
                        return;
                    }
                }
                debug!("Class filter set to {:?}", class_name);
                self.state.selected_class = class_name;
                self.on_class_changed();
            }
            ViewCommand::Shutdown => {}
        }
    }

    fn selectable_session(&self, id: SessionId) -> Option<Session> {
        let Some(event) = self.tracker.snapshot() else {
            warn!("Cannot select session {} before the event has loaded", id);
            return None;
        };
        let Some(session) = event.session(id) else {
            warn!("Session {} is not part of {}", id, event.slug);
            return None;
        };
        if session.session_type == SessionType::Practice {
            warn!("Session {} is a practice session, it has no results", id);
            return None;
        }
        if !event.is_session_selectable(session) {
            warn!(
                "Session {} is {} and the event is not live, nothing to show yet",
                id, session.status
            );
            return None;
        }
        Some(session.clone())
    }

    fn on_session_changed(&mut self) {
        let class_generation = self.class_fetch.restart();
        let data_generation = self.data_fetch.restart();

        let Some(session_id) = self.state.selected_session.as_ref().map(|s| s.id) else {
            self.state.classes.clear();
            self.state.selected_class = None;
            self.state.results.clear();
            self.state.telemetry.clear();
            self.state.classes_loading = false;
            self.state.results_loading = false;
            self.state.telemetry_loading = false;
            return;
        };

        self.state.classes_loading = true;
        let api = self.api.clone();
        let slug = self.slug.clone();
        let completions = self.completions.clone();
        self.class_fetch.track(tokio::spawn(async move {
            let classes = or_empty(
                api.result_classes(&slug, session_id).await,
                "result classes",
            );
            let _ = completions.send(Completion::Classes {
                generation: class_generation,
                classes,
            });
        }));

        self.spawn_data_fetches(session_id, data_generation);
    }

    fn on_class_changed(&mut self) {
        let generation = self.data_fetch.restart();
        if let Some(session_id) = self.state.selected_session.as_ref().map(|s| s.id) {
            self.spawn_data_fetches(session_id, generation);
        }
    }

    fn spawn_data_fetches(&mut self, session_id: SessionId, generation: u64) {
        self.state.results_loading = true;
        self.state.telemetry_loading = true;

        let api = self.api.clone();
        let slug = self.slug.clone();
        let class_name = self.state.selected_class.clone();
        let completions = self.completions.clone();
        self.data_fetch.track(tokio::spawn(async move {
            let rows = or_empty(
                api.results(&slug, session_id, class_name.as_deref()).await,
                "results",
            );
            let _ = completions.send(Completion::Results { generation, rows });
        }));

        let api = self.api.clone();
        let slug = self.slug.clone();
        let completions = self.completions.clone();
        self.data_fetch.track(tokio::spawn(async move {
            let points = or_empty(api.telemetry(&slug, session_id).await, "lap telemetry");
            let _ = completions.send(Completion::Telemetry { generation, points });
        }));
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Classes {
                generation,
                classes,
            } => {
                if !self.class_fetch.is_current(generation) {
                    debug!("Dropping class list of a previous session");
                    return;
                }
                self.state.classes_loading = false;
                self.state.classes = classes.into_iter().filter(|c| !c.is_empty()).collect();
                let still_offered = self
                    .state
                    .selected_class
                    .as_ref()
                    .is_none_or(|c| self.state.classes.contains(c));
                if !still_offered {
                    debug!(
                        "Class {:?} is not offered by this session, showing all classes",
                        self.state.selected_class
                    );
                    self.state.selected_class = None;
                    self.on_class_changed();
                }
            }
            Completion::Results { generation, rows } => {
                if self.data_fetch.is_current(generation) {
                    self.state.results = rows;
                    self.state.results_loading = false;
                }
            }
            Completion::Telemetry { generation, points } => {
                if self.data_fetch.is_current(generation) {
                    self.state.telemetry = points;
                    self.state.telemetry_loading = false;
                }
            }
        }
    }

    /// Refresh the event, reconcile the selection, then refresh results and telemetry.
    async fn poll_cycle(&mut self) {
        let fetched = self.api.event(&self.slug).await;
        self.state.last_refresh_error = fetched.as_ref().err().map(ToString::to_string);
        if !self.tracker.apply(fetched) {
            return;
        }
        self.state.event = self.tracker.snapshot().cloned();

        let previous = self.state.selected_session.clone();
        let changed = match self.tracker.snapshot() {
            Some(event) => {
                apply_reconciliation(&mut self.state.selected_session, event, self.options.fallback)
            }
            None => false,
        };
        if changed {
            debug!(
                "Selection moved from {:?} to {:?}",
                previous.map(|s| s.id),
                self.state.selected_session.as_ref().map(|s| s.id)
            );
            self.on_session_changed();
            return;
        }

        let Some(session_id) = self.state.selected_session.as_ref().map(|s| s.id) else {
            return;
        };
        let class_name = self.state.selected_class.clone();
        let (results, telemetry) = tokio::join!(
            self.api
                .results(&self.slug, session_id, class_name.as_deref()),
            self.api.telemetry(&self.slug, session_id),
        );
        match results {
            Ok(rows) => self.state.results = rows,
            Err(e) => debug!("Keeping results after failed refresh: {}", e),
        }
        match telemetry {
            Ok(points) => self.state.telemetry = points,
            Err(e) => debug!("Keeping lap telemetry after failed refresh: {}", e),
        }
    }
}

/// Handle to a running event view.
///
/// The view runs as its own tokio task; dropping the handle aborts it together with its
/// refresh timer and any fetch still in flight.
pub struct EventViewHandle {
    commands: mpsc::UnboundedSender<ViewCommand>,
    view: watch::Receiver<EventView>,
    task: Option<JoinHandle<()>>,
}

impl EventViewHandle {
    /// Start tracking `slug`. Must be called from within a tokio runtime.
    pub fn spawn(api: Arc<dyn PitwallApi>, slug: impl Into<String>, options: ViewOptions) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (publisher, view) = watch::channel(EventView::default());

        let actor = ViewActor {
            api,
            slug: slug.into(),
            state: EventView {
                selected_class: options.initial_class.clone(),
                ..Default::default()
            },
            options,
            tracker: LifecycleTracker::new(),
            publisher,
            completions: completion_tx,
            class_fetch: Fetches::default(),
            data_fetch: Fetches::default(),
            poll: None,
        };
        let task = tokio::spawn(actor.run(command_rx, completion_rx));

        Self {
            commands: command_tx,
            view,
            task: Some(task),
        }
    }

    pub fn current(&self) -> EventView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EventView> {
        self.view.clone()
    }

    pub fn select_session(&self, id: SessionId) -> Result<(), PitwallError> {
        self.send(ViewCommand::SelectSession(id))
    }

    pub fn select_class(&self, class_name: Option<String>) -> Result<(), PitwallError> {
        self.send(ViewCommand::SelectClass(class_name))
    }

    fn send(&self, command: ViewCommand) -> Result<(), PitwallError> {
        self.commands
            .send(command)
            .map_err(|_| PitwallError::ViewClosed)
    }

    /// Wait until a published view satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&EventView) -> bool,
    ) -> Result<EventView, PitwallError> {
        self.view
            .wait_for(predicate)
            .await
            .map(|view| (*view).clone())
            .map_err(|_| PitwallError::ViewClosed)
    }

    /// Stop the view and wait for its task to wind down.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(ViewCommand::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EventViewHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
