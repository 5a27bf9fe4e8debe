use serde::{Deserialize, Serialize};

use crate::domain::BillId;

/// Response of the attachment-create call on the `bills` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBill {
    pub file_path: String,
    pub key: BillId,
}

/// Error body some backends attach to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "error")]
    pub message: String,
}
