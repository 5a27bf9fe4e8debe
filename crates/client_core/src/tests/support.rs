use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{Bill, BillId, BillStatus, User},
    protocol::CreatedBill,
};
use tokio::sync::Mutex;
use url::Url;

use crate::{
    error::PersistenceError,
    new_bill::{FileSelection, NewBillFields, RecordUpdateMode},
    persistence::{AttachmentUpload, PersistenceClient, SelectedFile},
    router::{Router, RouterOptions},
    session::MemorySessionStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Create {
        email: String,
        file_name: String,
        mime_type: String,
    },
    Update {
        selector: BillId,
        bill: Bill,
    },
}

pub(crate) struct TestStore {
    bills: Vec<Bill>,
    fail_list_once: Mutex<Option<PersistenceError>>,
    fail_create_once: Mutex<Option<PersistenceError>>,
    fail_update: Option<PersistenceError>,
    list_delay: Option<Duration>,
    update_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl TestStore {
    pub(crate) fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            bills,
            fail_list_once: Mutex::new(None),
            fail_create_once: Mutex::new(None),
            fail_update: None,
            list_delay: None,
            update_delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn fixtures() -> Self {
        Self::with_bills(fixture_bills())
    }

    pub(crate) fn failing_updates(mut self, err: PersistenceError) -> Self {
        self.fail_update = Some(err);
        self
    }

    pub(crate) fn slow_list(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Record updates finish only after `delay`; the call is logged once
    /// they finish.
    pub(crate) fn slow_updates(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    pub(crate) async fn fail_next_list(&self, err: PersistenceError) {
        *self.fail_list_once.lock().await = Some(err);
    }

    pub(crate) async fn fail_next_create(&self, err: PersistenceError) {
        *self.fail_create_once.lock().await = Some(err);
    }

    pub(crate) async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn updates(&self) -> Vec<(BillId, Bill)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::Update { selector, bill } => Some((selector.clone(), bill.clone())),
                _ => None,
            })
            .collect()
    }

    /// Polls until `count` record updates arrived; detached updates run on
    /// their own task.
    pub(crate) async fn wait_for_updates(&self, count: usize) -> Vec<(BillId, Bill)> {
        for _ in 0..200 {
            let updates = self.updates().await;
            if updates.len() >= count {
                return updates;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} record updates");
    }
}

#[async_trait]
impl PersistenceClient for TestStore {
    async fn list_bills(&self) -> Result<Vec<Bill>, PersistenceError> {
        self.calls.lock().await.push(Call::List);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.fail_list_once.lock().await.take() {
            return Err(err);
        }
        Ok(self.bills.clone())
    }

    async fn create_bill(
        &self,
        upload: AttachmentUpload,
    ) -> Result<CreatedBill, PersistenceError> {
        self.calls.lock().await.push(Call::Create {
            email: upload.email.clone(),
            file_name: upload.file.name.clone(),
            mime_type: upload.file.mime_type.clone(),
        });
        if let Some(err) = self.fail_create_once.lock().await.take() {
            return Err(err);
        }
        Ok(CreatedBill {
            file_path: format!("https://localhost:3456/images/{}", upload.file.name),
            key: BillId("1234".into()),
        })
    }

    async fn update_bill(&self, selector: &BillId, bill: &Bill) -> Result<(), PersistenceError> {
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().await.push(Call::Update {
            selector: selector.clone(),
            bill: bill.clone(),
        });
        match &self.fail_update {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn fixture_bill(
    id: &str,
    email: &str,
    expense_type: &str,
    name: &str,
    date: &str,
    amount: i64,
    status: BillStatus,
) -> Bill {
    Bill {
        id: Some(BillId(id.into())),
        email: email.into(),
        expense_type: expense_type.into(),
        name: name.into(),
        amount,
        date: date.into(),
        vat: amount / 5,
        pct: 20,
        commentary: String::new(),
        file_url: Some(format!("https://test.storage.tld/{id}.jpg")),
        file_name: Some(format!("{id}.jpg")),
        status,
    }
}

/// Four bills of `a@a`, deliberately out of date order, plus one bill of
/// another employee.
pub(crate) fn fixture_bills() -> Vec<Bill> {
    use BillStatus::{Accepted, Pending, Refused};
    vec![
        fixture_bill("b2", "a@a", "Transports", "test1", "2001-01-01", 100, Refused),
        fixture_bill("b1", "a@a", "Hôtel et logement", "encore", "2004-04-04", 400, Pending),
        fixture_bill("b9", "other@test.tld", "Transports", "autre", "2005-05-05", 50, Pending),
        fixture_bill("b4", "a@a", "Restaurants et bars", "test2", "2002-02-02", 200, Refused),
        fixture_bill("b3", "a@a", "Services en ligne", "test3", "2003-03-03", 300, Accepted),
    ]
}

pub(crate) fn options(mode: RecordUpdateMode) -> RouterOptions {
    RouterOptions::new(Url::parse("http://localhost:8080").expect("origin"))
        .with_record_update_mode(mode)
}

pub(crate) fn router_for(
    user: Option<User>,
    store: Arc<TestStore>,
    mode: RecordUpdateMode,
) -> Arc<Router> {
    let session = match user {
        Some(user) => MemorySessionStore::with_user(&user),
        None => MemorySessionStore::new(),
    };
    Router::new(Arc::new(session), store, options(mode))
}

pub(crate) fn png_selection() -> FileSelection {
    selection("facture.png", "image/png")
}

pub(crate) fn pdf_selection() -> FileSelection {
    selection("facture.pdf", "application/pdf")
}

pub(crate) fn selection(name: &str, mime_type: &str) -> FileSelection {
    FileSelection {
        value: format!("C:\\fakepath\\{name}"),
        file: Some(SelectedFile::new(name, mime_type, b"facture".to_vec())),
    }
}

pub(crate) fn filled_fields() -> NewBillFields {
    NewBillFields {
        expense_type: "Hôtel et logement".into(),
        name: "New bill test".into(),
        date: "2004-04-04".into(),
        amount: "400".into(),
        vat: "80".into(),
        pct: "20".into(),
        commentary: "séminaire billed".into(),
    }
}
