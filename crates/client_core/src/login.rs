//! Login and logout. Credential checks and token issuance happen elsewhere;
//! these only record who is signed in and move the router accordingly.

use std::sync::Arc;

use shared::domain::User;
use tracing::info;

use crate::{
    error::SessionError,
    navigation::NavigationContext,
    routes::Route,
    session::{store_user, SessionStore},
};

#[derive(Clone)]
pub struct LoginController {
    context: Arc<NavigationContext>,
    session: Arc<dyn SessionStore>,
}

impl LoginController {
    pub(crate) fn new(context: Arc<NavigationContext>, session: Arc<dyn SessionStore>) -> Self {
        Self { context, session }
    }

    /// Stores `user`, remembers its home as the back-navigation target and
    /// navigates there.
    pub async fn sign_in(&self, user: &User) -> Result<Route, SessionError> {
        store_user(self.session.as_ref(), user)?;
        let home = Route::home_for(Some(user));
        self.context.set_previous_location(Some(home)).await;
        info!(role = ?user.role, route = %home, "signed in");
        self.context.navigate(home).await;
        Ok(home)
    }
}

pub(crate) async fn sign_out(
    context: &NavigationContext,
    session: &dyn SessionStore,
) -> Result<(), SessionError> {
    session.clear()?;
    info!("signed out");
    context.navigate(Route::Login).await;
    Ok(())
}
