//! Bill List Controller.

use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};
use shared::domain::{Bill, User};
use tracing::debug;

use crate::{
    error::PersistenceError, navigation::NavigationContext, persistence::PersistenceClient,
    routes::Route,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillScope {
    /// Bills owned by this email.
    Own(String),
    All,
}

impl BillScope {
    pub fn for_user(user: Option<&User>) -> Self {
        match user {
            Some(user) if user.is_employee() => BillScope::Own(user.email.clone()),
            _ => BillScope::All,
        }
    }

    fn admits(&self, bill: &Bill) -> bool {
        match self {
            BillScope::Own(email) => &bill.email == email,
            BillScope::All => true,
        }
    }
}

/// Most recent first. ISO dates order lexically; the sort is stable so equal
/// dates keep the order the store returned.
pub fn sort_newest_first(mut bills: Vec<Bill>) -> Vec<Bill> {
    bills.sort_by(|a, b| b.date.cmp(&a.date));
    bills
}

#[derive(Clone)]
pub struct BillsController {
    context: Arc<NavigationContext>,
    store: Arc<dyn PersistenceClient>,
    scope: BillScope,
    generation: u64,
}

impl BillsController {
    pub(crate) fn new(
        context: Arc<NavigationContext>,
        store: Arc<dyn PersistenceClient>,
        scope: BillScope,
        generation: u64,
    ) -> Self {
        Self {
            context,
            store,
            scope,
            generation,
        }
    }

    pub fn scope(&self) -> &BillScope {
        &self.scope
    }

    /// Nothing is fetched until the returned future is polled, and it fetches
    /// once; call `list` again for a fresh fetch.
    pub fn list(&self) -> BoxFuture<'static, Result<Vec<Bill>, PersistenceError>> {
        let store = Arc::clone(&self.store);
        let scope = self.scope.clone();
        async move {
            let bills = store.list_bills().await?;
            let total = bills.len();
            let visible: Vec<Bill> = bills.into_iter().filter(|bill| scope.admits(bill)).collect();
            debug!(total, visible = visible.len(), "bills fetched");
            Ok(sort_newest_first(visible))
        }
        .boxed()
    }

    /// Opens the receipt modal on the image stored at `bill_url`.
    pub async fn on_eye_clicked(&self, bill_url: &str) -> bool {
        self.context.open_modal(self.generation, bill_url).await
    }

    pub async fn on_new_bill_clicked(&self) {
        self.context.navigate(Route::NewBill).await;
    }
}

#[cfg(test)]
#[path = "tests/bills_tests.rs"]
mod tests;
