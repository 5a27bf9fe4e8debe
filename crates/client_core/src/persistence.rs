//! Persistence Client: the remote `bills` resource.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use shared::{
    domain::{Bill, BillId},
    protocol::{CreatedBill, ErrorBody},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::PersistenceError,
    session::{SessionStore, JWT_KEY},
};

/// In-memory handle to an image picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Multipart payload of the attachment-create call: `{file, email}`.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file: SelectedFile,
    pub email: String,
}

#[async_trait]
pub trait PersistenceClient: Send + Sync {
    async fn list_bills(&self) -> Result<Vec<Bill>, PersistenceError>;
    async fn create_bill(&self, upload: AttachmentUpload)
        -> Result<CreatedBill, PersistenceError>;
    async fn update_bill(&self, selector: &BillId, bill: &Bill) -> Result<(), PersistenceError>;
}

pub struct HttpPersistenceClient {
    http: Client,
    base_url: Url,
    session: Option<Arc<dyn SessionStore>>,
}

impl HttpPersistenceClient {
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: Client::new(),
            base_url,
            session: None,
        }
    }

    /// Attaches `Authorization: Bearer <jwt>` whenever the session holds a token.
    pub fn with_session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, PersistenceError> {
        self.base_url
            .join(path)
            .map_err(|e| PersistenceError::Transport(format!("invalid endpoint '{path}': {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self
            .session
            .as_ref()
            .and_then(|session| session.get_item(JWT_KEY))
        {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn checked(response: Response) -> Result<Response, PersistenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|body| body.message)
            .unwrap_or(body);
        warn!(status = status.as_u16(), detail = %detail, "bills request rejected");
        Err(PersistenceError::status(status.as_u16()))
    }
}

#[async_trait]
impl PersistenceClient for HttpPersistenceClient {
    async fn list_bills(&self) -> Result<Vec<Bill>, PersistenceError> {
        let url = self.endpoint("bills")?;
        let response = self.authorize(self.http.get(url)).send().await?;
        let bills: Vec<Bill> = Self::checked(response).await?.json().await?;
        debug!(count = bills.len(), "listed bills");
        Ok(bills)
    }

    async fn create_bill(
        &self,
        upload: AttachmentUpload,
    ) -> Result<CreatedBill, PersistenceError> {
        let url = self.endpoint("bills")?;
        let AttachmentUpload { file, email } = upload;
        // The multipart encoder owns the content type and its boundary.
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part).text("email", email);
        let response = self
            .authorize(self.http.post(url))
            .multipart(form)
            .send()
            .await?;
        let created: CreatedBill = Self::checked(response).await?.json().await?;
        debug!(bill_id = %created.key, "attachment stored");
        Ok(created)
    }

    async fn update_bill(&self, selector: &BillId, bill: &Bill) -> Result<(), PersistenceError> {
        let url = self.endpoint(&format!("bills/{}", selector.0))?;
        let response = self
            .authorize(self.http.patch(url))
            .json(bill)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
