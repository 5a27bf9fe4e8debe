//! Bill Submission Controller: file selection, validation, upload, record
//! persistence and the hand-off back to the bill list.

use std::{str::FromStr, sync::Arc};

use shared::domain::{Bill, BillId, BillStatus};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    navigation::NavigationContext,
    persistence::{AttachmentUpload, PersistenceClient, SelectedFile},
    routes::Route,
    session::{current_user, SessionStore},
};

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];
pub const VALIDATION_MESSAGE: &str = "Veuillez renseigner tout les champs";
pub const MISSING_FILE_MESSAGE: &str = "Erreur : Pas de fichier";
const DEFAULT_PCT: i64 = 20;

/// How the record update that follows a successful upload is run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordUpdateMode {
    /// Spawned as a tracked background task; a failure is logged and
    /// navigation proceeds. `Router::drain_background` waits for it.
    #[default]
    Detached,
    /// Awaited; a failure lands in the error slot and the form stays up.
    Awaited,
}

impl FromStr for RecordUpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(Self::Detached),
            "awaited" => Ok(Self::Awaited),
            other => Err(format!("unknown record update mode '{other}'")),
        }
    }
}

/// Raw values of the new-bill form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBillFields {
    pub expense_type: String,
    pub name: String,
    pub date: String,
    pub amount: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

impl NewBillFields {
    /// Builds the pending bill, or `None` when a required value is missing or
    /// zero. Blank `vat` is derived from `amount` and `pct`; blank or zero
    /// `pct` falls back to 20.
    pub fn to_bill(&self, email: &str) -> Option<Bill> {
        let amount = parse_int(&self.amount);
        let pct = parse_int(&self.pct)
            .filter(|pct| *pct != 0)
            .unwrap_or(DEFAULT_PCT);
        let vat = if self.vat.is_empty() {
            amount.map(|amount| (amount as f64 / 100.0 * pct as f64).round() as i64)
        } else {
            parse_int(&self.vat)
        };

        let amount = amount.filter(|v| *v != 0)?;
        let vat = vat.filter(|v| *v != 0)?;
        if email.is_empty()
            || self.expense_type.is_empty()
            || self.name.is_empty()
            || self.date.is_empty()
        {
            return None;
        }

        Some(Bill {
            id: None,
            email: email.to_string(),
            expense_type: self.expense_type.clone(),
            name: self.name.clone(),
            amount,
            date: self.date.clone(),
            vat,
            pct,
            commentary: self.commentary.clone(),
            file_url: None,
            file_name: None,
            status: BillStatus::Pending,
        })
    }
}

/// Leading-integer parse of a form value: optional sign then digits, anything
/// after the digits ignored. `"12abc"` is 12, `""` and `"abc"` are `None`.
pub fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Base name of the picker's reported path, for `/` or `\` separated paths.
pub fn file_name_from_input(value: &str) -> Option<&str> {
    value
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
}

/// A change event from the file input: the input's raw value and the first
/// selected file, if any.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    pub value: String,
    pub file: Option<SelectedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelectionOutcome {
    Accepted { file_name: String },
    /// Unsupported type: the input was cleared, the held file kept.
    Rejected,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Invalid,
    UploadFailed(String),
    RecordFailed(String),
    Submitted { bill_id: BillId },
}

#[derive(Debug, Default)]
struct PendingAttachment {
    file: Option<SelectedFile>,
    file_name: Option<String>,
    file_url: Option<String>,
    bill_id: Option<BillId>,
}

#[derive(Clone)]
pub struct NewBillController {
    context: Arc<NavigationContext>,
    store: Arc<dyn PersistenceClient>,
    session: Arc<dyn SessionStore>,
    update_mode: RecordUpdateMode,
    generation: u64,
    pending: Arc<Mutex<PendingAttachment>>,
}

impl NewBillController {
    pub(crate) fn new(
        context: Arc<NavigationContext>,
        store: Arc<dyn PersistenceClient>,
        session: Arc<dyn SessionStore>,
        update_mode: RecordUpdateMode,
        generation: u64,
    ) -> Self {
        Self {
            context,
            store,
            session,
            update_mode,
            generation,
            pending: Arc::new(Mutex::new(PendingAttachment::default())),
        }
    }

    pub async fn held_file(&self) -> Option<SelectedFile> {
        self.pending.lock().await.file.clone()
    }

    pub async fn held_file_name(&self) -> Option<String> {
        self.pending.lock().await.file_name.clone()
    }

    pub async fn bill_id(&self) -> Option<BillId> {
        self.pending.lock().await.bill_id.clone()
    }

    pub async fn file_url(&self) -> Option<String> {
        self.pending.lock().await.file_url.clone()
    }

    pub async fn on_file_selected(&self, selection: FileSelection) -> FileSelectionOutcome {
        let Some(file) = selection.file else {
            return FileSelectionOutcome::Empty;
        };
        if !ACCEPTED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            debug!(mime_type = %file.mime_type, "rejected attachment type");
            self.context.set_file_input(self.generation, "").await;
            return FileSelectionOutcome::Rejected;
        }

        let file_name = file_name_from_input(&selection.value)
            .map(str::to_string)
            .unwrap_or_else(|| file.name.clone());
        self.context
            .set_file_input(self.generation, &selection.value)
            .await;
        let mut pending = self.pending.lock().await;
        pending.file = Some(file);
        pending.file_name = Some(file_name.clone());
        FileSelectionOutcome::Accepted { file_name }
    }

    pub async fn submit(&self, fields: &NewBillFields) -> SubmitOutcome {
        let email = current_user(self.session.as_ref())
            .map(|user| user.email)
            .unwrap_or_default();
        let Some(mut bill) = fields.to_bill(&email) else {
            self.show_error(VALIDATION_MESSAGE).await;
            return SubmitOutcome::Invalid;
        };

        let held = {
            let pending = self.pending.lock().await;
            pending.file.clone().zip(pending.file_name.clone())
        };
        let Some((file, file_name)) = held else {
            self.show_error(MISSING_FILE_MESSAGE).await;
            return SubmitOutcome::UploadFailed(MISSING_FILE_MESSAGE.to_string());
        };

        let created = match self
            .store
            .create_bill(AttachmentUpload {
                file,
                email: bill.email.clone(),
            })
            .await
        {
            Ok(created) => created,
            Err(err) => {
                let message = err.to_string();
                self.show_error(&message).await;
                return SubmitOutcome::UploadFailed(message);
            }
        };
        let bill_id = created.key;
        {
            let mut pending = self.pending.lock().await;
            pending.bill_id = Some(bill_id.clone());
            pending.file_url = Some(created.file_path.clone());
        }

        bill.file_url = Some(created.file_path);
        bill.file_name = Some(file_name);
        bill.status = BillStatus::Pending;

        match self.update_mode {
            RecordUpdateMode::Detached => {
                let store = Arc::clone(&self.store);
                let selector = bill_id.clone();
                self.context
                    .spawn_background(async move {
                        if let Err(err) = store.update_bill(&selector, &bill).await {
                            error!(
                                bill_id = %selector,
                                error = %err,
                                "failed to persist bill record"
                            );
                        }
                    })
                    .await;
            }
            RecordUpdateMode::Awaited => {
                if let Err(err) = self.store.update_bill(&bill_id, &bill).await {
                    error!(bill_id = %bill_id, error = %err, "failed to persist bill record");
                    let message = err.to_string();
                    self.show_error(&message).await;
                    return SubmitOutcome::RecordFailed(message);
                }
            }
        }

        info!(bill_id = %bill_id, "bill submitted");
        self.show_error("").await;
        self.context.navigate(Route::Bills).await;
        SubmitOutcome::Submitted { bill_id }
    }

    async fn show_error(&self, message: &str) {
        if !self.context.set_form_error(self.generation, message).await {
            debug!("form no longer on screen; error message dropped");
        }
    }
}

#[cfg(test)]
#[path = "tests/new_bill_tests.rs"]
mod tests;
