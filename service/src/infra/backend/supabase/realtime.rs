//! Realtime change-feed of the [`Supabase`] [`Backend`].
//!
//! Speaks the [Phoenix channels] protocol over a WebSocket, joining a channel
//! with a `postgres_changes` listener on the `propostas_saas` table.
//!
//! [Phoenix channels]: https://hexdocs.pm/phoenix/channels.html

use std::time::Duration;

use common::operations::{By, Subscribe};
use futures::{SinkExt as _, StreamExt as _};
use secrecy::ExposeSecret as _;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracerr::Traced;
use tracing as log;
use url::Url;

use crate::{
    domain::{proposal, user::session},
    infra::backend::{Backend, Error, Subscription},
};

use super::{dto, Supabase};

/// Topic of the channel listening to the `propostas_saas` changes.
const TOPIC: &str = "realtime:propostas_saas_changes";

/// Interval between heartbeats keeping the connection alive.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

impl Supabase {
    /// Builds the realtime WebSocket [`Url`] of the project.
    fn realtime_url(&self) -> Result<Url, Traced<Error>> {
        let mut url = self.endpoint("realtime/v1/websocket")?;
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        url.set_scheme(scheme)
            .map_err(|()| Error::rejected("cannot switch to WebSocket scheme"))
            .map_err(tracerr::wrap!())?;
        _ = url
            .query_pairs_mut()
            .append_pair("apikey", self.inner.anon_key.expose_secret())
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }
}

impl Backend<Subscribe<By<proposal::Change, Option<session::Token>>>>
    for Supabase
{
    type Ok = Subscription<proposal::Change>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Subscribe(by): Subscribe<By<proposal::Change, Option<session::Token>>>,
    ) -> Result<Self::Ok, Self::Err> {
        let url = self.realtime_url()?;
        let access_token = by.into_inner().map_or_else(
            || self.inner.anon_key.expose_secret().to_owned(),
            |t| t.as_ref().to_owned(),
        );

        let connect = tokio_tungstenite::connect_async(url.as_str());
        let (mut ws, _) = tokio::time::timeout(self.inner.timeout, connect)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        let join = serde_json::to_string(&Frame::join(&access_token))
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        ws.send(Message::Text(join))
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            let mut seq = 1_u64;
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        seq += 1;
                        let beat = serde_json::to_string(&Frame::heartbeat(seq))
                            .unwrap_or_default();
                        if let Err(e) = ws.send(Message::Text(beat)).await {
                            log::error!("realtime heartbeat failed: {e}");
                            break;
                        }
                    }
                    msg = ws.next() => {
                        let text = match msg {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => {
                                log::warn!("realtime connection closed");
                                break;
                            }
                            Some(Ok(
                                Message::Binary(_)
                                | Message::Ping(_)
                                | Message::Pong(_)
                                | Message::Frame(_),
                            )) => continue,
                            Some(Err(e)) => {
                                log::error!("realtime connection failed: {e}");
                                break;
                            }
                        };
                        match handle(&text) {
                            Incoming::Change(change) => {
                                if tx.send(change).is_err() {
                                    break;
                                }
                            }
                            Incoming::Ignored => {}
                            Incoming::Closed => break,
                        }
                    }
                }
            }
        });

        Ok(Subscription::new(rx, move || listener.abort()))
    }
}

/// Frame of the Phoenix channels protocol.
#[derive(Debug, Deserialize, Serialize)]
struct Frame {
    /// Topic of the channel this [`Frame`] belongs to.
    topic: String,

    /// Event carried by this [`Frame`].
    event: String,

    /// Payload of the event.
    #[serde(default)]
    payload: serde_json::Value,

    /// Reference to correlate replies with.
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}

impl Frame {
    /// Creates a new [`Frame`] joining the `propostas_saas` changes channel.
    fn join(access_token: &str) -> Self {
        Self {
            topic: TOPIC.into(),
            event: "phx_join".into(),
            payload: serde_json::json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": "*",
                        "schema": "public",
                        "table": "propostas_saas",
                    }],
                },
                "access_token": access_token,
            }),
            reference: Some("1".into()),
        }
    }

    /// Creates a new heartbeat [`Frame`].
    fn heartbeat(seq: u64) -> Self {
        Self {
            topic: "phoenix".into(),
            event: "heartbeat".into(),
            payload: serde_json::json!({}),
            reference: Some(seq.to_string()),
        }
    }
}

/// Payload of a `postgres_changes` event.
#[derive(Debug, Deserialize)]
struct ChangesPayload {
    /// Description of the change.
    data: ChangeData,
}

/// Description of a single row change.
#[derive(Debug, Deserialize)]
struct ChangeData {
    /// Kind of the change: `INSERT`, `UPDATE` or `DELETE`.
    #[serde(rename = "type", alias = "eventType")]
    kind: String,

    /// Row after the change.
    #[serde(default, alias = "new")]
    record: Option<serde_json::Value>,

    /// Row before the change.
    #[serde(default, alias = "old")]
    old_record: Option<serde_json::Value>,
}

/// Interpreted incoming [`Frame`].
#[derive(Debug)]
enum Incoming {
    /// [`proposal::Change`] to deliver.
    Change(proposal::Change),

    /// [`Frame`] not affecting the subscription.
    Ignored,

    /// Channel has been closed by the server.
    Closed,
}

/// Interprets the provided incoming text `frame`.
fn handle(frame: &str) -> Incoming {
    let frame = match serde_json::from_str::<Frame>(frame) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("malformed realtime frame: {e}");
            return Incoming::Ignored;
        }
    };
    match frame.event.as_str() {
        "postgres_changes" => {
            match serde_json::from_value::<ChangesPayload>(frame.payload) {
                Ok(p) => {
                    change(p.data).map_or(Incoming::Ignored, Incoming::Change)
                }
                Err(e) => {
                    log::warn!("malformed `postgres_changes` payload: {e}");
                    Incoming::Ignored
                }
            }
        }
        "system" => {
            let status = frame.payload["status"].as_str().unwrap_or_default();
            let message = frame.payload["message"].as_str().unwrap_or_default();
            if status == "ok" {
                log::info!("realtime channel `{}` subscribed", frame.topic);
            } else {
                log::error!(
                    "realtime channel `{}` error: {message}",
                    frame.topic,
                );
            }
            Incoming::Ignored
        }
        "phx_reply" => {
            if frame.payload["status"].as_str() != Some("ok") {
                log::error!(
                    "realtime channel `{}` join rejected: {}",
                    frame.topic,
                    frame.payload["response"],
                );
            }
            Incoming::Ignored
        }
        "phx_error" => {
            log::error!("realtime channel `{}` errored", frame.topic);
            Incoming::Closed
        }
        "phx_close" => {
            log::info!("realtime channel `{}` closed", frame.topic);
            Incoming::Closed
        }
        _ => Incoming::Ignored,
    }
}

/// Converts the provided [`ChangeData`] into a [`proposal::Change`].
fn change(data: ChangeData) -> Option<proposal::Change> {
    let row = |v: Option<serde_json::Value>| {
        serde_json::from_value::<dto::ProposalRow>(v?)
            .map_err(|e| log::warn!("malformed changed row: {e}"))
            .ok()?
            .into_proposal()
    };
    match data.kind.as_str() {
        "INSERT" => row(data.record).map(proposal::Change::Inserted),
        "UPDATE" => row(data.record).map(proposal::Change::Updated),
        "DELETE" => serde_json::from_value::<dto::RowKey>(data.old_record?)
            .ok()?
            .id
            .into_proposal_id()
            .map(proposal::Change::Deleted),
        kind => {
            log::warn!("unknown change kind `{kind}`");
            None
        }
    }
}
