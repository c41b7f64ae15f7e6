use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{parse_frame, PushEvent, RealtimeCommand, SubscriptionLifecycle};

/// Websocket loop for the backend change feed.
///
/// Connects, joins the user's notification topic, then forwards parsed
/// insert/update events until the feed terminates or a shutdown command
/// arrives. The handshake is bounded by the request timeout: a stalled
/// connect fails like any other backend error instead of wedging the
/// lifecycle in `Connecting`. The lifecycle always ends back at `Idle`,
/// whatever the exit path.
pub(crate) async fn run(
    url: String,
    user_id: String,
    connect_timeout: Duration,
    lifecycle: Arc<SubscriptionLifecycle>,
    mut command_rx: mpsc::UnboundedReceiver<RealtimeCommand>,
    event_tx: mpsc::UnboundedSender<PushEvent>,
) {
    let mut ws = match timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(err)) => {
            warn!(error = %err, "change feed connect failed");
            lifecycle.reset();
            return;
        }
        Err(_) => {
            warn!("change feed connect timed out");
            lifecycle.reset();
            return;
        }
    };

    let join = json!({
        "action": "subscribe",
        "topic": format!("notifications:{user_id}"),
        "ref": Uuid::new_v4().to_string(),
    });
    match timeout(connect_timeout, ws.send(Message::Text(join.to_string()))).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(error = %err, "change feed subscribe failed");
            lifecycle.reset();
            return;
        }
        Err(_) => {
            warn!("change feed subscribe timed out");
            lifecycle.reset();
            return;
        }
    }

    lifecycle.mark_connected();
    info!(user_id, "change feed connected");

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                // A dropped handle counts as shutdown too.
                match command {
                    Some(RealtimeCommand::Shutdown) | None => {
                        lifecycle.begin_close();
                        let _ = ws.close(None).await;
                        break;
                    }
                }
            }
            frame = ws.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                        Ok(event) => {
                            if event_tx.send(event).is_err() {
                                debug!("event receiver gone, closing feed");
                                lifecycle.begin_close();
                                let _ = ws.close(None).await;
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "discarding malformed change frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("change feed terminated by backend");
                        break;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary
                    Some(Err(err)) => {
                        warn!(error = %err, "change feed stream error");
                        break;
                    }
                }
            }
        }
    }

    lifecycle.reset();
}
