use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};
use shared::domain::Bill;

use crate::{bills::sort_newest_first, error::PersistenceError, persistence::PersistenceClient};

/// Admin view over every user's bills.
#[derive(Clone)]
pub struct DashboardController {
    store: Arc<dyn PersistenceClient>,
}

impl DashboardController {
    pub(crate) fn new(store: Arc<dyn PersistenceClient>) -> Self {
        Self { store }
    }

    pub fn list_all_users(&self) -> BoxFuture<'static, Result<Vec<Bill>, PersistenceError>> {
        let store = Arc::clone(&self.store);
        async move { Ok(sort_newest_first(store.list_bills().await?)) }.boxed()
    }
}
