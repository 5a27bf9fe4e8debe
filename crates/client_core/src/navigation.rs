use std::{future::Future, sync::Weak};

use tokio::{sync::Mutex, task::JoinSet};
use tracing::{debug, error, warn};
use url::Url;

use crate::{
    router::Router,
    routes::Route,
    views::{Screen, View},
};

/// In-memory browser history. Pushing the entry already on top is a no-op.
#[derive(Debug, Clone)]
pub struct History {
    origin: Url,
    entries: Vec<Url>,
}

impl History {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, route: Route) -> bool {
        let Ok(entry) = self.origin.join(route.path()) else {
            warn!(route = %route, origin = %self.origin, "route does not form a valid history url");
            return false;
        };
        if self.entries.last() == Some(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    pub fn current(&self) -> Option<&Url> {
        self.entries.last()
    }
}

/// Navigation state shared by the router and every controller it binds.
///
/// Owned by the application's single [`Router`]; controllers hold it by `Arc`
/// and reach the router back through a weak reference, so dropping the router
/// tears the whole graph down.
pub struct NavigationContext {
    previous_location: Mutex<Option<Route>>,
    history: Mutex<History>,
    screen: Mutex<Screen>,
    background: Mutex<JoinSet<()>>,
    router: Weak<Router>,
}

impl NavigationContext {
    pub(crate) fn new(origin: Url, router: Weak<Router>) -> Self {
        Self {
            previous_location: Mutex::new(None),
            history: Mutex::new(History::new(origin)),
            screen: Mutex::new(Screen::default()),
            background: Mutex::new(JoinSet::new()),
            router,
        }
    }

    pub async fn navigate(&self, route: Route) {
        match self.router.upgrade() {
            Some(router) => router.navigate(route).await,
            None => warn!(route = %route, "navigation requested after router shutdown"),
        }
    }

    pub async fn previous_location(&self) -> Option<Route> {
        *self.previous_location.lock().await
    }

    pub async fn set_previous_location(&self, route: Option<Route>) {
        *self.previous_location.lock().await = route;
    }

    pub async fn history(&self) -> History {
        self.history.lock().await.clone()
    }

    pub(crate) async fn push_history(&self, route: Route) {
        if !self.history.lock().await.push(route) {
            debug!(route = %route, "history entry unchanged");
        }
    }

    pub async fn screen(&self) -> Screen {
        self.screen.lock().await.clone()
    }

    pub(crate) async fn generation(&self) -> u64 {
        self.screen.lock().await.generation()
    }

    /// Runs `task` on the runtime, tracked until [`Self::drain_background`].
    pub(crate) async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut background = self.background.lock().await;
        while background.try_join_next().is_some() {}
        background.spawn(task);
    }

    /// Waits for every tracked background task, including ones spawned while
    /// draining.
    pub async fn drain_background(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.background.lock().await);
            if pending.is_empty() {
                return;
            }
            while let Some(joined) = pending.join_next().await {
                if let Err(err) = joined {
                    error!(error = %err, "background task did not complete");
                }
            }
        }
    }

    /// Replaces the root view and returns the new render generation.
    pub(crate) async fn render(&self, view: View, highlight: Option<Route>) -> u64 {
        let mut screen = self.screen.lock().await;
        let generation = screen.replace(view);
        if let Some(route) = highlight {
            screen.highlight(route);
        }
        generation
    }

    /// Renders only if nothing replaced the render `expected` since it was
    /// taken; a slow fetch must not clobber a newer screen.
    pub(crate) async fn render_if_current(
        &self,
        expected: u64,
        view: View,
        highlight: Option<Route>,
    ) -> Option<u64> {
        let mut screen = self.screen.lock().await;
        if screen.generation() != expected {
            debug!(
                expected,
                current = screen.generation(),
                "dropping stale render"
            );
            return None;
        }
        let generation = screen.replace(view);
        if let Some(route) = highlight {
            screen.highlight(route);
        }
        Some(generation)
    }

    pub(crate) async fn set_form_error(&self, generation: u64, message: &str) -> bool {
        let mut screen = self.screen.lock().await;
        match screen.form_mut(generation) {
            Some(form) => {
                form.error_message = message.to_string();
                true
            }
            None => false,
        }
    }

    pub(crate) async fn set_file_input(&self, generation: u64, value: &str) -> bool {
        let mut screen = self.screen.lock().await;
        match screen.form_mut(generation) {
            Some(form) => {
                form.file_input = value.to_string();
                true
            }
            None => false,
        }
    }

    pub(crate) async fn open_modal(&self, generation: u64, url: &str) -> bool {
        self.screen.lock().await.open_modal(generation, url)
    }
}
