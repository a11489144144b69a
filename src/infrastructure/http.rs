//! HTTP surface.
//!
//! ```text
//! /api
//! ├── POST /claim   - request a payout (form: address, symbol?), rate limited
//! └── GET  /info    - faucet account, network and payout
//! ```
//!
//! Clients are identified by connection peer, or by `X-Forwarded-For` when
//! the faucet runs behind trusted proxies. Serve the router with
//! `into_make_service_with_connect_info::<SocketAddr>()` so the peer is known.
//!
//! A claim rejected before any transfer started (malformed form, unknown
//! token, full queue) does not count against the client's interval.

use crate::application::error::{ClaimError, ClaimOutcome};
use crate::domain::claim::ClaimRequest;
use crate::infrastructure::faucet::{Faucet, FaucetInfo};
use axum::{
    extract::{rejection::FormRejection, ConnectInfo, Form, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Header carrying the proxy chain.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Form body of a claim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimForm {
    /// Destination address
    #[serde(default)]
    pub address: String,
    /// Token symbol; absent or empty for the native currency
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Body of a successful claim response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ClaimResponse {
    /// Sent right away
    Dispatched {
        /// Transaction id returned by the ledger
        tx_hash: String,
    },
    /// Accepted into the queue
    Queued {
        /// Destination that will be funded
        address: String,
    },
}

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason
    pub error: String,
}

/// HTTP status for a claim error.
pub fn status_for(err: &ClaimError) -> StatusCode {
    match err {
        ClaimError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ClaimError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
        ClaimError::UnknownToken(_) | ClaimError::InvalidClaim(_) => StatusCode::BAD_REQUEST,
        ClaimError::InvalidAmount(_) | ClaimError::Transfer(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Response extension marking a claim that should not use up the grant.
#[derive(Debug, Clone, Copy)]
struct RefundGrant;

fn error_response(status: StatusCode, error: String, refund: bool) -> Response {
    let mut response = (status, Json(ErrorResponse { error })).into_response();
    if refund {
        response.extensions_mut().insert(RefundGrant);
    }
    response
}

impl IntoResponse for ClaimError {
    fn into_response(self) -> Response {
        error_response(status_for(&self), self.to_string(), self.refunds_grant())
    }
}

/// Build the faucet router.
pub fn router(faucet: Arc<Faucet>) -> Router {
    let claims = Router::new()
        .route("/api/claim", post(claim))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&faucet),
            rate_limit,
        ));

    Router::new()
        .route("/api/info", get(info))
        .merge(claims)
        .with_state(faucet)
}

/// Serve the faucet on `listener` until `shutdown` is cancelled.
///
/// # Errors
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    faucet: Arc<Faucet>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(faucet).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
}

/// Reject clients that claimed within the interval.
async fn rate_limit(State(faucet): State<Arc<Faucet>>, request: Request, next: Next) -> Response {
    let peer = match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip(),
        None => {
            tracing::debug!("no peer address on request");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    };
    let forwarded = request
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok());
    let identity = faucet.resolver().resolve(peer, forwarded);

    let Some(grant) = faucet.limiter().acquire(&identity) else {
        return ClaimError::RateLimited.into_response();
    };
    let response = next.run(request).await;
    if response.extensions().get::<RefundGrant>().is_some() {
        faucet.limiter().refund(grant);
    }
    response
}

async fn claim(
    State(faucet): State<Arc<Faucet>>,
    form: Result<Form<ClaimForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable claim form");
            return error_response(rejection.status(), rejection.body_text(), true);
        }
    };
    let claim = match ClaimRequest::new(&form.address, form.symbol.as_deref()) {
        Ok(claim) => claim,
        Err(err) => return ClaimError::from(err).into_response(),
    };
    let address = claim.destination().to_string();

    match faucet.admit(claim).await {
        Ok(ClaimOutcome::Dispatched(tx)) => Json(ClaimResponse::Dispatched {
            tx_hash: tx.as_str().to_string(),
        })
        .into_response(),
        Ok(ClaimOutcome::Queued) => Json(ClaimResponse::Queued { address }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn info(State(faucet): State<Arc<Faucet>>) -> Json<FaucetInfo> {
    Json(faucet.info())
}
