//! Channel endpoints
//!
//! `/api/createchannel` relays one run of the external script;
//! `/api/closechannel` only logs. Neither endpoint keeps state between
//! requests.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use crate::script::ScriptRunner;

/// `aval`/`bval` as sent by the web client
///
/// Kept as raw text: the client may send `NaN` or `undefined`, and the
/// values are only logged, never handed to the script.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChannelQuery {
    pub aval: Option<String>,
    pub bval: Option<String>,
}

impl ChannelQuery {
    /// Decode a query string; the first occurrence of a key wins
    pub fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let Some(query) = query else {
            return parsed;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "aval" => &mut parsed.aval,
                "bval" => &mut parsed.bval,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        parsed
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChannelResponse {
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /api/createchannel`
pub async fn create_channel(
    ctx: &RequestContext<'_>,
    runner: &ScriptRunner,
) -> Response<Full<Bytes>> {
    let query = ChannelQuery::parse(ctx.query);
    logger::log_create_request(query.aval.as_deref(), query.bval.as_deref());

    match runner.run().await {
        Ok(output) => http::build_json_response(
            StatusCode::OK,
            &CreateChannelResponse { output },
            ctx.is_head,
        ),
        Err(err) => {
            logger::log_script_failure(&err);
            http::build_json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: err.to_string(),
                },
                ctx.is_head,
            )
        }
    }
}

/// `GET /api/closechannel`
pub fn close_channel(_ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
    logger::log_channel_closed();
    http::build_empty_response()
}
