//! REST client for the forum API.
//!
//! All operations are awaitable and return a typed result; there are no
//! callback chains. The [`ForumBackend`] trait is the seam between the
//! synchronizer/dispatcher and the network, so both can run against an
//! in-memory fake in tests.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{Answer, AnswerId, Question, QuestionId, QuestionStatus, Token};

/// The pull and mutation operations the synchronization core needs from
/// the forum service.
#[async_trait]
pub trait ForumBackend: Send + Sync {
    async fn list_questions(&self) -> Result<Vec<Question>, SyncError>;
    async fn list_answers(&self, question_id: QuestionId) -> Result<Vec<Answer>, SyncError>;
    async fn create_question(&self, message: &str) -> Result<Question, SyncError>;
    async fn create_answer(
        &self,
        question_id: QuestionId,
        message: &str,
    ) -> Result<Answer, SyncError>;
    async fn change_status(
        &self,
        question_id: QuestionId,
        new_status: QuestionStatus,
    ) -> Result<(), SyncError>;
    async fn delete_answer(&self, answer_id: AnswerId) -> Result<(), SyncError>;
}

/// HTTP implementation of [`ForumBackend`] against the forum REST API.
pub struct ForumApi {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl ForumApi {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Exchange admin credentials for a bearer token
    /// (`POST /auth/token`, form-encoded).
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, SyncError> {
        let url = self.endpoint("auth/token")?;
        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        decode_json(response).await
    }

    /// Attach a bearer token to subsequent admin calls.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url.join(path).map_err(|e| SyncError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl ForumBackend for ForumApi {
    async fn list_questions(&self) -> Result<Vec<Question>, SyncError> {
        let url = self.endpoint("questions")?;
        let response = self.client.get(url).send().await?;
        decode_json(response).await
    }

    async fn list_answers(&self, question_id: QuestionId) -> Result<Vec<Answer>, SyncError> {
        let url = self.endpoint(&format!("answers/{question_id}"))?;
        let response = self.client.get(url).send().await?;
        decode_json(response).await
    }

    async fn create_question(&self, message: &str) -> Result<Question, SyncError> {
        let url = self.endpoint("question")?;
        let response = self
            .client
            .post(url)
            .query(&[("message", message)])
            .send()
            .await?;
        decode_json(response).await
    }

    async fn create_answer(
        &self,
        question_id: QuestionId,
        message: &str,
    ) -> Result<Answer, SyncError> {
        let url = self.endpoint("answer")?;
        let response = self
            .client
            .post(url)
            .query(&[
                ("questionid", question_id.to_string().as_str()),
                ("answer", message),
            ])
            .send()
            .await?;
        decode_json(response).await
    }

    async fn change_status(
        &self,
        question_id: QuestionId,
        new_status: QuestionStatus,
    ) -> Result<(), SyncError> {
        let url = self.endpoint("auth/change-status")?;
        let request = self.client.post(url).query(&[
            ("questionid", question_id.to_string().as_str()),
            ("new_status", new_status.as_str()),
        ]);
        let response = self.authorized(request).send().await?;
        expect_success(response).await
    }

    async fn delete_answer(&self, answer_id: AnswerId) -> Result<(), SyncError> {
        let url = self.endpoint("auth/answer")?;
        let request = self
            .client
            .delete(url)
            .query(&[("answerid", answer_id.to_string().as_str())]);
        let response = self.authorized(request).send().await?;
        expect_success(response).await
    }
}

/// Map a response to its decoded JSON body, or an [`SyncError::Api`] for a
/// non-2xx status. Decoding goes through the body text so malformed JSON
/// surfaces as a decode error rather than a transport one.
async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SyncError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(api_error(status, body));
    }
    Ok(serde_json::from_str(&body)?)
}

async fn expect_success(response: reqwest::Response) -> Result<(), SyncError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status, body));
    }
    Ok(())
}

fn api_error(status: StatusCode, body: String) -> SyncError {
    // Truncate long HTML error pages to keep logs readable.
    let body = body.chars().take(200).collect();
    SyncError::Api {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;

    #[test]
    fn endpoints_join_against_the_base_url() {
        let config = SyncConfig::new("http://localhost:8000").unwrap();
        let api = ForumApi::new(&config).unwrap();

        assert_eq!(
            api.endpoint("questions").unwrap().as_str(),
            "http://localhost:8000/questions"
        );
        assert_eq!(
            api.endpoint("answers/42").unwrap().as_str(),
            "http://localhost:8000/answers/42"
        );
    }

    #[test]
    fn api_error_truncates_long_bodies() {
        let err = api_error(StatusCode::BAD_GATEWAY, "x".repeat(500));
        match err {
            SyncError::Api { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
