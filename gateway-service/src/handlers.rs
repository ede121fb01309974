// ============================================================================
// Delivery Handler
// ============================================================================
//
// Every path on the public listener is an object key. Per request:
//
//   config -> client IP -> rate limit -> verify token -> proxy -> disposition
//
// Each stage can end the request early. The object store is only contacted
// once the token is fully verified.
//
// ============================================================================

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use delivery_error::{AppError, AppResult};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tracing::Instrument;
use url::form_urlencoded;
use uuid::Uuid;

use crate::client_ip::client_ip_from_header;
use crate::metrics::{outcome_for, record_outcome, OUTCOME_AUTHORIZED};
use crate::proxy::apply_disposition;
use crate::rate_limiter::{check_or_allow, rate_limit_key};
use crate::state::GatewayState;

const HEADER_REQUEST_ID: &str = "x-request-id";

/// Rate-limit bucket for requests without a usable client IP header
const UNKNOWN_CLIENT: &str = "unknown";

/// Capability parameters carried in the query string
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CapabilityParams {
    pub verify: Option<String>,
    pub content_disposition: Option<String>,
}

impl CapabilityParams {
    /// First occurrence of each parameter wins
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "verify" if params.verify.is_none() => params.verify = Some(value.into_owned()),
                "content-disposition" if params.content_disposition.is_none() => {
                    params.content_disposition = Some(value.into_owned())
                }
                _ => {}
            }
        }
        params
    }
}

/// Fallback handler for the public listener
pub async fn deliver(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("deliver", request_id = %request_id);

    let mut response = match authorize_and_forward(&state, request).instrument(span).await {
        Ok(response) => {
            record_outcome(OUTCOME_AUTHORIZED);
            response
        }
        Err(e) => {
            record_outcome(outcome_for(&e));
            e.into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(HEADER_REQUEST_ID), value);
    }
    response
}

async fn authorize_and_forward(state: &GatewayState, request: Request) -> AppResult<Response> {
    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| AppError::configuration_missing("DELIVERY_HMAC_SECRET"))?;

    let client_ip = client_ip_from_header(request.headers(), &state.config.client_ip_header);
    if client_ip.is_none() {
        tracing::debug!(
            header = %state.config.client_ip_header,
            "Request carries no usable client IP header"
        );
    }

    let key = rate_limit_key(
        client_ip.as_deref().unwrap_or(UNKNOWN_CLIENT),
        state.config.upstream_host(),
    );
    check_or_allow(state.rate_limiter.as_ref(), &key).await?;

    let params = CapabilityParams::from_query(request.uri().query());
    let resource_path = percent_decode_str(request.uri().path())
        .decode_utf8()
        .map_err(|_| AppError::malformed("path is not valid UTF-8 after decoding"))?
        .into_owned();

    let capability = verifier.verify(
        &resource_path,
        params.verify.as_deref(),
        client_ip.as_deref(),
        Utc::now().timestamp(),
    )?;

    tracing::debug!(
        path = %resource_path,
        subject_id = %capability.subject_id,
        expires_at = capability.expires_at,
        "Capability authorized"
    );

    let response = state.upstream.forward(request).await?;
    Ok(apply_disposition(
        response,
        params.content_disposition.as_deref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_query() {
        let params = CapabilityParams::from_query(Some(
            "verify=7-203.0.113.5-1-2-ab%2Bc%2F%3D&content-disposition=attachment%3B+filename%3D%22a.pdf%22",
        ));
        assert_eq!(params.verify.as_deref(), Some("7-203.0.113.5-1-2-ab+c/="));
        assert_eq!(
            params.content_disposition.as_deref(),
            Some("attachment; filename=\"a.pdf\"")
        );
    }

    #[test]
    fn test_params_first_occurrence_wins() {
        let params = CapabilityParams::from_query(Some("verify=a&verify=b&other=1"));
        assert_eq!(params.verify.as_deref(), Some("a"));
        assert_eq!(params.content_disposition, None);
    }

    #[test]
    fn test_params_without_query() {
        assert_eq!(CapabilityParams::from_query(None), CapabilityParams::default());
    }
}
