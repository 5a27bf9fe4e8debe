//! Client core for expense bills: the navigation state machine, bill
//! submission, and bill list retrieval, over a remote `bills` resource and a
//! local session store.

pub mod bills;
pub mod dashboard;
pub mod error;
pub mod login;
pub mod navigation;
pub mod new_bill;
pub mod persistence;
pub mod router;
pub mod routes;
pub mod session;
pub mod views;

pub use bills::{BillScope, BillsController};
pub use dashboard::DashboardController;
pub use error::{PersistenceError, SessionError};
pub use login::LoginController;
pub use navigation::{History, NavigationContext};
pub use new_bill::{
    FileSelection, FileSelectionOutcome, NewBillController, NewBillFields, RecordUpdateMode,
    SubmitOutcome,
};
pub use persistence::{AttachmentUpload, HttpPersistenceClient, PersistenceClient, SelectedFile};
pub use router::{ActiveController, Router, RouterOptions};
pub use routes::{Location, Route};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use views::{ErrorKind, Screen, View};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
