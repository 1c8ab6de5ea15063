use super::hub::{BroadcastHub, Subscription};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};
use warp::{
    ws::{Message, WebSocket, Ws},
    Filter, Rejection, Reply,
};

/// `GET /ws` upgrade. Each socket becomes a hub subscriber until it closes.
pub fn route(
    hub: Arc<BroadcastHub>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_hub(hub))
        .map(|ws: Ws, hub: Arc<BroadcastHub>| {
            ws.on_upgrade(move |socket| handle_subscriber(socket, hub))
        })
}

fn with_hub(
    hub: Arc<BroadcastHub>,
) -> impl Filter<Extract = (Arc<BroadcastHub>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || hub.clone())
}

async fn handle_subscriber(ws: WebSocket, hub: Arc<BroadcastHub>) {
    let (mut ws_sender, mut ws_receiver) = ws.split();
    let Subscription { id, mut receiver } = hub.subscribe().await;

    let send_id = id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(payload) = receiver.recv().await {
            if let Err(e) = ws_sender.send(Message::text(payload)).await {
                debug!("Send to subscriber {} failed: {}", send_id, e);
                break;
            }
        }
    });

    // Inbound frames carry nothing we act on; read until the peer leaves.
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(msg) if msg.is_close() => {
                debug!("Subscriber {} requested close", id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for subscriber {}: {}", id, e);
                break;
            }
        }
    }

    send_task.abort();
    hub.unsubscribe(&id).await;
}
