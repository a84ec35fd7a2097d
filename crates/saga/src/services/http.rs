//! Ledger client for a remote inventory service.

use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::StockStats;
use inventory::{LedgerOperation, LedgerRequest, LedgerResponse};
use reqwest::StatusCode;

use super::ledger::{LedgerClient, LedgerOutcome, LedgerRefusal, RefusalKind};

/// Calls the inventory service over HTTP.
///
/// A call that does not answer within the timeout is reported as
/// `Unavailable`; the order service never applies the guarded status change
/// in that case.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn refusal_kind(operation: LedgerOperation, status: StatusCode) -> Option<RefusalKind> {
    match status {
        StatusCode::NOT_FOUND => Some(RefusalKind::ProductNotFound),
        StatusCode::CONFLICT if operation == LedgerOperation::Reserve => {
            Some(RefusalKind::InsufficientStock)
        }
        StatusCode::CONFLICT => Some(RefusalKind::InsufficientReserved),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Some(RefusalKind::Invalid),
        _ => None,
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id, order_ref = %request.order_ref))]
    async fn apply(&self, operation: LedgerOperation, request: LedgerRequest) -> LedgerOutcome {
        let url = format!("{}/{}", self.base_url, operation.as_str());
        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, error = %e, "ledger call failed");
                return LedgerOutcome::Unavailable(format!("ledger call to {url} failed: {e}"));
            }
        };

        let status = response.status();
        let body: LedgerResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return LedgerOutcome::Unavailable(format!(
                    "unreadable ledger response ({status}): {e}"
                ));
            }
        };

        if status.is_success() && body.success {
            return match body.levels() {
                Some(levels) => LedgerOutcome::Applied(levels),
                None => LedgerOutcome::Unavailable(
                    "ledger reported success without counters".to_string(),
                ),
            };
        }

        match refusal_kind(operation, status) {
            Some(kind) => LedgerOutcome::Refused(LedgerRefusal {
                kind,
                levels: body.levels(),
                message: body.message,
            }),
            None => LedgerOutcome::Unavailable(format!("ledger answered {status}: {}", body.message)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn stats(&self, product_id: ProductId) -> LedgerOutcome<StockStats> {
        let url = format!("{}/stats/{}", self.base_url, product_id);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return LedgerOutcome::Unavailable(format!("ledger call to {url} failed: {e}")),
        };

        match response.status() {
            StatusCode::OK => match response.json::<StockStats>().await {
                Ok(stats) => LedgerOutcome::Applied(stats),
                Err(e) => LedgerOutcome::Unavailable(format!("unreadable stats response: {e}")),
            },
            StatusCode::NOT_FOUND => LedgerOutcome::Refused(LedgerRefusal {
                kind: RefusalKind::ProductNotFound,
                message: format!("Product not found: {product_id}"),
                levels: None,
            }),
            status => LedgerOutcome::Unavailable(format!("ledger answered {status}")),
        }
    }
}
