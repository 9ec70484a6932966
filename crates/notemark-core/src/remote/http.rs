//! `reqwest` binding of [`RemoteNoteService`] for the NoteMark REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{NotesPage, RemoteError, RemoteNoteService, RemoteResult};
use crate::config::ClientConfig;
use crate::models::{NoteId, NotePayload};
use crate::session::Session;
use crate::util::compact_text;

const NOTES_PATH: &str = "/api/notes";
const USER_EMAIL_HEADER: &str = "X-User-Email";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// Turn a non-success response body into a user-facing message.
///
/// JSON `{ "error": ..., "status": ... }` bodies yield their `error`; an empty
/// 401 means the credentials were rejected.
pub fn parse_api_error(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return if status == StatusCode::UNAUTHORIZED {
            "Invalid Email id or password".to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Unknown error occurred")
                .to_string()
        };
    }

    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| compact_text(body))
}

/// Attach the configured `X-User-Email` header, if any.
pub(super) fn with_user_email(request: RequestBuilder, config: &ClientConfig) -> RequestBuilder {
    match config.user_email.as_deref() {
        Some(email) => request.header(USER_EMAIL_HEADER, email),
        None => request,
    }
}

/// Send a request and map non-success statuses to [`RemoteError`].
pub(super) async fn send_checked(request: RequestBuilder) -> RemoteResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::http(
        status.as_u16(),
        parse_api_error(status, &body),
    ))
}

/// Note service backed by the NoteMark HTTP API.
#[derive(Clone)]
pub struct HttpNoteService {
    config: ClientConfig,
    client: Client,
}

impl HttpNoteService {
    pub fn new(config: ClientConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { config, client })
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        with_user_email(request.bearer_auth(&session.access_token), &self.config)
    }

    /// Decode the server's copy of a note, falling back to what was sent.
    async fn note_or_sent(response: Response, sent: &NotePayload) -> NotePayload {
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<NotePayload>(&body) {
            Ok(note) => note,
            Err(error) => {
                tracing::debug!(
                    "Server response for note {} was not a note ({error}); keeping local copy",
                    sent.id
                );
                sent.clone()
            }
        }
    }
}

#[async_trait]
impl RemoteNoteService for HttpNoteService {
    async fn create(&self, session: &Session, note: &NotePayload) -> RemoteResult<NotePayload> {
        let request = self.authorized(
            self.client.post(self.config.endpoint(NOTES_PATH)).json(note),
            session,
        );
        let response = send_checked(request).await?;
        Ok(Self::note_or_sent(response, note).await)
    }

    async fn update(&self, session: &Session, note: &NotePayload) -> RemoteResult<NotePayload> {
        let request = self.authorized(
            self.client.put(self.config.endpoint(NOTES_PATH)).json(note),
            session,
        );
        let response = send_checked(request).await?;
        Ok(Self::note_or_sent(response, note).await)
    }

    async fn delete(&self, session: &Session, id: &NoteId) -> RemoteResult<()> {
        let url = self.config.endpoint(&format!("{NOTES_PATH}/{id}"));
        send_checked(self.authorized(self.client.delete(url), session))
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        session: &Session,
        page: Option<u32>,
        size: Option<u32>,
    ) -> RemoteResult<NotesPage> {
        let mut request = self.client.get(self.config.endpoint(NOTES_PATH));
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(size) = size {
            request = request.query(&[("size", size)]);
        }
        let response = send_checked(self.authorized(request, session)).await?;
        Ok(response.json::<NotesPage>().await?)
    }
}
