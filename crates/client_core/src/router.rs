//! Navigation and authorization state machine.
//!
//! Every entry rebuilds its controller against the freshly rendered view;
//! nothing is updated in place between renders.

use std::sync::Arc;

use shared::domain::User;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    bills::{BillScope, BillsController},
    dashboard::DashboardController,
    error::SessionError,
    login::{sign_out, LoginController},
    navigation::NavigationContext,
    new_bill::{NewBillController, RecordUpdateMode},
    persistence::PersistenceClient,
    routes::{Location, Route},
    session::{current_user, SessionStore},
    views::{ErrorKind, NewBillForm, Screen, View},
};

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Origin history entries are recorded under.
    pub origin: Url,
    pub record_update_mode: RecordUpdateMode,
}

impl RouterOptions {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            record_update_mode: RecordUpdateMode::default(),
        }
    }

    pub fn with_record_update_mode(mut self, mode: RecordUpdateMode) -> Self {
        self.record_update_mode = mode;
        self
    }
}

/// Controller bound to the view currently on screen.
#[derive(Clone, Default)]
pub enum ActiveController {
    #[default]
    None,
    Login(LoginController),
    Bills(BillsController),
    NewBill(NewBillController),
    Dashboard(DashboardController),
}

pub struct Router {
    session: Arc<dyn SessionStore>,
    store: Arc<dyn PersistenceClient>,
    context: Arc<NavigationContext>,
    options: RouterOptions,
    active: Mutex<ActiveController>,
}

impl Router {
    pub fn new(
        session: Arc<dyn SessionStore>,
        store: Arc<dyn PersistenceClient>,
        options: RouterOptions,
    ) -> Arc<Self> {
        Arc::new_cyclic(|router| Self {
            session,
            store,
            context: Arc::new(NavigationContext::new(
                options.origin.clone(),
                router.clone(),
            )),
            options,
            active: Mutex::new(ActiveController::None),
        })
    }

    pub fn context(&self) -> &Arc<NavigationContext> {
        &self.context
    }

    pub fn current_user(&self) -> Option<User> {
        current_user(self.session.as_ref())
    }

    pub fn home(&self) -> Route {
        Route::home_for(self.current_user().as_ref())
    }

    pub async fn screen(&self) -> Screen {
        self.context.screen().await
    }

    /// Initial navigation on process start.
    pub async fn start(&self, location: &Location) {
        let route = location.initial_route(self.current_user().as_ref());
        info!(
            pathname = %location.pathname,
            hash = %location.hash,
            route = %route,
            "starting router"
        );
        self.navigate(route).await;
    }

    /// Browser "back": return to the remembered location, else the role home.
    pub async fn pop_state(&self) {
        let target = match self.context.previous_location().await {
            Some(route) => route,
            None => self.home(),
        };
        self.navigate(target).await;
    }

    pub async fn navigate(&self, route: Route) {
        let user = self.current_user();
        self.context.push_history(route).await;
        info!(route = %route, signed_in = user.is_some(), "navigating");

        let loading = self
            .context
            .render(View::Loading(route), loading_highlight(route))
            .await;

        match route {
            Route::Login => self.enter_login().await,
            Route::Bills => self.enter_bills(user, loading).await,
            Route::NewBill => self.enter_new_bill(user).await,
            Route::Dashboard => self.enter_dashboard(user, loading).await,
        }
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        sign_out(&self.context, self.session.as_ref()).await
    }

    /// Waits for detached record updates still in flight.
    pub async fn drain_background(&self) {
        self.context.drain_background().await;
    }

    pub async fn active_controller(&self) -> ActiveController {
        self.active.lock().await.clone()
    }

    pub async fn login_controller(&self) -> Option<LoginController> {
        match self.active_controller().await {
            ActiveController::Login(controller) => Some(controller),
            _ => None,
        }
    }

    pub async fn bills_controller(&self) -> Option<BillsController> {
        match self.active_controller().await {
            ActiveController::Bills(controller) => Some(controller),
            _ => None,
        }
    }

    pub async fn new_bill_controller(&self) -> Option<NewBillController> {
        match self.active_controller().await {
            ActiveController::NewBill(controller) => Some(controller),
            _ => None,
        }
    }

    pub async fn dashboard_controller(&self) -> Option<DashboardController> {
        match self.active_controller().await {
            ActiveController::Dashboard(controller) => Some(controller),
            _ => None,
        }
    }

    /// Binds `controller` only while render `generation` is still on screen.
    /// The check and the write share the `active` lock, so a newer entry
    /// always binds last.
    async fn activate(&self, generation: u64, controller: ActiveController) -> bool {
        let mut active = self.active.lock().await;
        let current = self.context.generation().await;
        if current != generation {
            debug!(generation, current, "dropping stale controller binding");
            return false;
        }
        *active = controller;
        true
    }

    async fn enter_login(&self) {
        let generation = self.context.render(View::Login, None).await;
        self.activate(
            generation,
            ActiveController::Login(LoginController::new(
                Arc::clone(&self.context),
                Arc::clone(&self.session),
            )),
        )
        .await;
    }

    async fn enter_bills(&self, user: Option<User>, loading: u64) {
        self.activate(loading, ActiveController::None).await;
        let controller = BillsController::new(
            Arc::clone(&self.context),
            Arc::clone(&self.store),
            BillScope::for_user(user.as_ref()),
            loading,
        );
        let bills = match controller.list().await {
            Ok(bills) => bills,
            Err(err) => {
                warn!(route = %Route::Bills, error = %err, "bill list fetch failed");
                self.render_fetch_error(Route::Bills, loading, err.to_string())
                    .await;
                return;
            }
        };

        if !user.as_ref().is_some_and(User::is_employee) {
            self.render_unauthorized_after(Route::Bills, loading).await;
            return;
        }

        let Some(generation) = self
            .context
            .render_if_current(loading, View::Bills(bills), Some(Route::Bills))
            .await
        else {
            return;
        };
        self.activate(
            generation,
            ActiveController::Bills(BillsController::new(
                Arc::clone(&self.context),
                Arc::clone(&self.store),
                controller.scope().clone(),
                generation,
            )),
        )
        .await;
    }

    async fn enter_new_bill(&self, user: Option<User>) {
        // Creation needs no initial data, so the role check is immediate.
        if !user.as_ref().is_some_and(User::is_employee) {
            let generation = self
                .context
                .render(
                    View::Error {
                        route: Route::NewBill,
                        kind: ErrorKind::Unauthorized,
                    },
                    None,
                )
                .await;
            self.activate(generation, ActiveController::None).await;
            return;
        }

        let generation = self
            .context
            .render(View::NewBill(NewBillForm::default()), Some(Route::NewBill))
            .await;
        self.activate(
            generation,
            ActiveController::NewBill(NewBillController::new(
                Arc::clone(&self.context),
                Arc::clone(&self.store),
                Arc::clone(&self.session),
                self.options.record_update_mode,
                generation,
            )),
        )
        .await;
    }

    async fn enter_dashboard(&self, user: Option<User>, loading: u64) {
        self.activate(loading, ActiveController::None).await;
        let controller = DashboardController::new(Arc::clone(&self.store));
        let bills = match controller.list_all_users().await {
            Ok(bills) => bills,
            Err(err) => {
                warn!(route = %Route::Dashboard, error = %err, "dashboard fetch failed");
                self.render_fetch_error(Route::Dashboard, loading, err.to_string())
                    .await;
                return;
            }
        };

        if !user.as_ref().is_some_and(User::is_admin) {
            self.render_unauthorized_after(Route::Dashboard, loading).await;
            return;
        }

        if let Some(generation) = self
            .context
            .render_if_current(loading, View::Dashboard(bills), None)
            .await
        {
            self.activate(generation, ActiveController::Dashboard(controller)).await;
        }
    }

    async fn render_fetch_error(&self, route: Route, loading: u64, message: String) {
        self.context
            .render_if_current(
                loading,
                View::Error {
                    route,
                    kind: ErrorKind::FetchFailed(message),
                },
                None,
            )
            .await;
    }

    async fn render_unauthorized_after(&self, route: Route, loading: u64) {
        warn!(route = %route, "unauthorized navigation");
        self.context
            .render_if_current(
                loading,
                View::Error {
                    route,
                    kind: ErrorKind::Unauthorized,
                },
                None,
            )
            .await;
    }
}

/// The bills icon is lit as soon as its loading placeholder shows; the
/// new-bill icon only once the form is up.
fn loading_highlight(route: Route) -> Option<Route> {
    match route {
        Route::Bills => Some(Route::Bills),
        Route::Login | Route::NewBill | Route::Dashboard => None,
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
