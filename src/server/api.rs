use super::{hub::BroadcastHub, websocket};
use crate::{
    domain::Watchlist,
    error::{ErrorContext, Result},
};
use serde_json::{json, Value};
use std::{convert::Infallible, sync::Arc};
use tracing::info;
use warp::{http::StatusCode, hyper::body::Bytes, Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// HTTP surface: `/health`, `/register-wallet` and the `/ws` stream on one port.
pub struct ApiServer {
    port: u16,
    watchlist: Arc<Watchlist>,
    hub: Arc<BroadcastHub>,
}

impl ApiServer {
    pub fn new(port: u16, watchlist: Arc<Watchlist>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            port,
            watchlist,
            hub,
        }
    }

    pub async fn run(self) -> Result<()> {
        let routes = routes(self.watchlist, self.hub);

        info!("Server listening on http://0.0.0.0:{}", self.port);
        warp::serve(routes).run(([0, 0, 0, 0], self.port)).await;

        Ok(())
    }
}

pub fn routes(
    watchlist: Arc<Watchlist>,
    hub: Arc<BroadcastHub>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let register = warp::path("register-wallet")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_watchlist(watchlist))
        .and_then(register_wallet);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    health
        .or(register)
        .or(websocket::route(hub))
        .with(cors)
}

fn with_watchlist(
    watchlist: Arc<Watchlist>,
) -> impl Filter<Extract = (Arc<Watchlist>,), Error = Infallible> + Clone {
    warp::any().map(move || watchlist.clone())
}

async fn register_wallet(
    body: Bytes,
    watchlist: Arc<Watchlist>,
) -> std::result::Result<impl Reply, Infallible> {
    // Malformed JSON is treated the same as a missing address.
    let payload: Option<Value> = serde_json::from_slice(&body).ok();
    let address = payload
        .as_ref()
        .and_then(|value| value.get("address"))
        .and_then(Value::as_str);

    match watchlist.register(address).await {
        Ok(normalized) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "success": true, "address": normalized })),
            StatusCode::OK,
        )),
        Err(e) => {
            ErrorContext::new("register_wallet").log_error(&e);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": "address is required" })),
                StatusCode::BAD_REQUEST,
            ))
        }
    }
}
