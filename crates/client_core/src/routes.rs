use std::fmt;

use shared::domain::{User, UserRole};

pub const LOGIN_PATH: &str = "/";
pub const BILLS_PATH: &str = "#employee/bills";
pub const NEW_BILL_PATH: &str = "#employee/bill/new";
pub const DASHBOARD_PATH: &str = "#admin/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Bills,
    NewBill,
    Dashboard,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Login, Route::Bills, Route::NewBill, Route::Dashboard];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Bills => BILLS_PATH,
            Route::NewBill => NEW_BILL_PATH,
            Route::Dashboard => DASHBOARD_PATH,
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    /// Routes reachable through a location hash. `Login` lives at the root
    /// pathname and is never addressed by fragment.
    pub fn from_fragment(hash: &str) -> Option<Route> {
        match Self::from_path(hash)? {
            Route::Login => None,
            route => Some(route),
        }
    }

    /// Landing route for the given session: `Bills` for employees,
    /// `Dashboard` for admins and `Login` when nobody is signed in.
    pub fn home_for(user: Option<&User>) -> Route {
        match user.map(|user| user.role) {
            Some(UserRole::Employee) => Route::Bills,
            Some(UserRole::Admin) => Route::Dashboard,
            None => Route::Login,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// What the environment reports at process start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub hash: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            hash: hash.into(),
        }
    }

    pub fn root() -> Self {
        Self::new(LOGIN_PATH, "")
    }

    /// Route the initial navigation should land on.
    pub fn initial_route(&self, user: Option<&User>) -> Route {
        if self.hash.is_empty() {
            return Route::home_for(user);
        }
        Route::from_fragment(&self.hash).unwrap_or_else(|| Route::home_for(user))
    }
}
