//! Remote quote API
//!
//! `QuoteApi` is the seam between the workflow and the server; the HTTP
//! implementation talks to the backend's `/api/v1/quotes` routes.

use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    AcceptQuoteRequest, ApiEnvelope, ApiErrorBody, CancelQuoteRequest, CheckExistingParams,
    CounterQuoteRequest, CreateQuoteRequest, ExistingQuoteCheck, ExtendValidityRequest,
    IssueQuoteRequest, NegotiationOutcome, PaginatedResponse, Quote, QuoteListFilters,
    QuoteStatistics, RejectQuoteRequest, ReviseQuoteRequest,
};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Quote endpoints consumed by the client
#[async_trait::async_trait]
pub trait QuoteApi: Send + Sync {
    async fn list_quotes(&self, filters: &QuoteListFilters) -> ClientResult<PaginatedResponse<Quote>>;

    async fn get_quote(&self, id: Uuid) -> ClientResult<Quote>;

    async fn create_quote(&self, req: &CreateQuoteRequest) -> ClientResult<Quote>;

    async fn issue_quote(&self, id: Uuid, req: &IssueQuoteRequest) -> ClientResult<Quote>;

    async fn accept_quote(&self, id: Uuid, req: &AcceptQuoteRequest) -> ClientResult<NegotiationOutcome>;

    async fn reject_quote(&self, id: Uuid, req: &RejectQuoteRequest) -> ClientResult<NegotiationOutcome>;

    async fn counter_quote(&self, id: Uuid, req: &CounterQuoteRequest) -> ClientResult<NegotiationOutcome>;

    async fn cancel_quote(&self, id: Uuid, req: &CancelQuoteRequest) -> ClientResult<Quote>;

    async fn revise_quote(&self, id: Uuid, req: &ReviseQuoteRequest) -> ClientResult<Quote>;

    async fn extend_validity(&self, id: Uuid, req: &ExtendValidityRequest) -> ClientResult<Quote>;

    async fn check_existing(&self, params: &CheckExistingParams) -> ClientResult<ExistingQuoteCheck>;

    async fn statistics(&self) -> ClientResult<QuoteStatistics>;
}

/// `QuoteApi` over HTTP with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpQuoteApi {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpQuoteApi {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let builder = reqwest::Client::builder();
        // The browser fetch backend has no client-wide timeout
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.timeout);
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.config.api_url(path))
            .bearer_auth(&self.config.bearer_token)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        decode(resp).await
    }

    async fn post_enveloped<B>(&self, path: &str, body: &B) -> ClientResult<Quote>
    where
        B: Serialize + Sync + ?Sized,
    {
        let envelope: ApiEnvelope<Quote> = self.post(path, body).await?;
        Ok(envelope.data)
    }
}

/// Decode a success body, or turn the error body into a `ClientError`
async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let bytes = resp.bytes().await?;
    let body = serde_json::from_slice::<ApiErrorBody>(&bytes).ok();
    let err = ClientError::from_response(status.as_u16(), body);
    tracing::debug!(status = status.as_u16(), error = %err, "Quote API request failed");
    Err(err)
}

#[async_trait::async_trait]
impl QuoteApi for HttpQuoteApi {
    async fn list_quotes(&self, filters: &QuoteListFilters) -> ClientResult<PaginatedResponse<Quote>> {
        let resp = self
            .request(Method::GET, "/quotes")
            .query(filters)
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_quote(&self, id: Uuid) -> ClientResult<Quote> {
        let resp = self
            .request(Method::GET, &format!("/quotes/{}", id))
            .send()
            .await?;
        let envelope: ApiEnvelope<Quote> = decode(resp).await?;
        Ok(envelope.data)
    }

    async fn create_quote(&self, req: &CreateQuoteRequest) -> ClientResult<Quote> {
        self.post_enveloped("/quotes", req).await
    }

    async fn issue_quote(&self, id: Uuid, req: &IssueQuoteRequest) -> ClientResult<Quote> {
        self.post_enveloped(&format!("/quotes/{}/issue", id), req).await
    }

    async fn accept_quote(&self, id: Uuid, req: &AcceptQuoteRequest) -> ClientResult<NegotiationOutcome> {
        self.post(&format!("/quotes/{}/accept", id), req).await
    }

    async fn reject_quote(&self, id: Uuid, req: &RejectQuoteRequest) -> ClientResult<NegotiationOutcome> {
        self.post(&format!("/quotes/{}/reject", id), req).await
    }

    async fn counter_quote(&self, id: Uuid, req: &CounterQuoteRequest) -> ClientResult<NegotiationOutcome> {
        self.post(&format!("/quotes/{}/counter", id), req).await
    }

    async fn cancel_quote(&self, id: Uuid, req: &CancelQuoteRequest) -> ClientResult<Quote> {
        self.post_enveloped(&format!("/quotes/{}/cancel", id), req).await
    }

    async fn revise_quote(&self, id: Uuid, req: &ReviseQuoteRequest) -> ClientResult<Quote> {
        self.post_enveloped(&format!("/quotes/{}/revise", id), req).await
    }

    async fn extend_validity(&self, id: Uuid, req: &ExtendValidityRequest) -> ClientResult<Quote> {
        self.post_enveloped(&format!("/quotes/{}/extend", id), req).await
    }

    async fn check_existing(&self, params: &CheckExistingParams) -> ClientResult<ExistingQuoteCheck> {
        let resp = self
            .request(Method::GET, "/quotes/check-existing")
            .query(params)
            .send()
            .await?;
        let envelope: ApiEnvelope<ExistingQuoteCheck> = decode(resp).await?;
        Ok(envelope.data)
    }

    async fn statistics(&self) -> ClientResult<QuoteStatistics> {
        let resp = self
            .request(Method::GET, "/quotes/statistics")
            .send()
            .await?;
        let envelope: ApiEnvelope<QuoteStatistics> = decode(resp).await?;
        Ok(envelope.data)
    }
}
