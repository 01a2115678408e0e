//! Host adapter: JSON lines over stdio.
//!
//! The engine itself is event-model agnostic; this adapter subscribes to the
//! host's intercepted-request stream and forwards each event. One JSON
//! object per line in, one per line out. Fetch replies correlate by `id`;
//! response bodies travel hex-encoded so binary assets survive the text
//! transport. Logging goes to stderr so stdout stays protocol-clean.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use swcache_core::{CacheInfo, Error, RequestDescriptor};

use crate::engine::{CacheEngine, Handled};
use crate::messaging::WorkerChannel;

/// An event forwarded by the host.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum HostEvent {
    /// An intercepted network request.
    Fetch {
        id: u64,
        #[serde(default = "default_method")]
        method: String,
        url: String,
        #[serde(default)]
        navigation: bool,
    },
    /// A client page connected.
    Client { client: String },
    /// A message posted to the worker.
    Message {
        #[serde(default)]
        id: Option<u64>,
        #[serde(rename = "type")]
        kind: String,
    },
}

fn default_method() -> String {
    "GET".into()
}

/// A reply written back to the host.
#[derive(Debug, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
enum HostReply {
    Response {
        id: u64,
        status: u16,
        headers: Vec<(String, String)>,
        body_hex: String,
    },
    Bypass {
        id: u64,
    },
    CacheInfo {
        id: Option<u64>,
        info: CacheInfo,
    },
    Error {
        id: Option<u64>,
        error: String,
    },
}

/// Drive the adapter until the host closes its end.
///
/// Fetch events are handled concurrently as independent in-flight
/// operations; replies interleave in completion order.
pub async fn run<R, W>(
    engine: Arc<CacheEngine>,
    channel: WorkerChannel,
    reader: R,
    writer: W,
) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));
    let mut in_flight = JoinSet::new();
    let mut lines = reader.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| Error::ChannelClosed(format!("host stream failed: {e}")))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let event: HostEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed host event");
                continue;
            }
        };

        match event {
            HostEvent::Fetch { id, method, url, navigation } => {
                let engine = Arc::clone(&engine);
                let writer = Arc::clone(&writer);
                in_flight.spawn(async move {
                    let reply = handle_fetch(&engine, id, &method, &url, navigation).await;
                    write_reply(&writer, &reply).await;
                });
            }
            HostEvent::Client { client } => {
                engine.lifecycle().register_client(client);
            }
            HostEvent::Message { id, kind } => {
                handle_message(&channel, &writer, id, &kind).await;
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    Ok(())
}

async fn handle_fetch(engine: &CacheEngine, id: u64, method: &str, url: &str, navigation: bool) -> HostReply {
    let url = match swcache_client::normalize(url) {
        Ok(url) => url,
        Err(err) => return HostReply::Error { id: Some(id), error: Error::InvalidUrl(err.to_string()).to_string() },
    };

    let request = RequestDescriptor::new(method, url, navigation);
    match engine.handle_request(&request).await {
        Ok(Handled::Response(response)) => HostReply::Response {
            id,
            status: response.status,
            headers: response.headers,
            body_hex: hex::encode(&response.body),
        },
        Ok(Handled::Bypass) => HostReply::Bypass { id },
        Err(err) => HostReply::Error { id: Some(id), error: err.to_string() },
    }
}

async fn handle_message<W>(channel: &WorkerChannel, writer: &Arc<Mutex<W>>, id: Option<u64>, kind: &str)
where
    W: AsyncWrite + Unpin + Send,
{
    match kind {
        "SKIP_WAITING" => {
            if let Err(err) = channel.skip_waiting().await {
                tracing::warn!(error = %err, "SKIP_WAITING failed");
            }
        }
        "GET_CACHE_INFO" => {
            let reply = match channel.cache_info().await {
                Ok(info) => HostReply::CacheInfo { id, info },
                Err(err) => HostReply::Error { id, error: err.to_string() },
            };
            write_reply(writer, &reply).await;
        }
        other => tracing::warn!(kind = other, "ignoring unknown message type"),
    }
}

async fn write_reply<W>(writer: &Arc<Mutex<W>>, reply: &HostReply)
where
    W: AsyncWrite + Unpin + Send,
{
    let mut line = match serde_json::to_string(reply) {
        Ok(line) => line,
        Err(err) => {
            tracing::error!(error = %err, "unserializable reply");
            return;
        }
    };
    line.push('\n');

    let mut writer = writer.lock().await;
    if let Err(err) = writer.write_all(line.as_bytes()).await {
        tracing::warn!(error = %err, "failed to write reply");
        return;
    }
    if let Err(err) = writer.flush().await {
        tracing::warn!(error = %err, "failed to flush reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleController;
    use crate::messaging;
    use crate::testing::MockFetcher;
    use swcache_core::{CacheStore, PrecacheManifest, WorkerConfig};
    use tokio::io::BufReader;
    use url::Url;

    struct Harness {
        input: tokio::io::DuplexStream,
        output: tokio::io::DuplexStream,
        mock: Arc<MockFetcher>,
    }

    async fn harness() -> Harness {
        let store = CacheStore::open_in_memory().await.unwrap();
        let base = Url::parse("https://example.com").unwrap();
        let lifecycle = Arc::new(LifecycleController::new(store, "v1", base));

        let mock = Arc::new(MockFetcher::new());
        mock.ok("https://example.com/", "<html>root</html>");
        lifecycle
            .on_install(&PrecacheManifest::new(["/"]), mock.as_ref())
            .await
            .unwrap();
        lifecycle.on_activate().await.unwrap();

        let config = WorkerConfig::default();
        let engine = Arc::new(CacheEngine::new(lifecycle.clone(), mock.clone(), &config));

        let (channel, rx) = messaging::channel();
        tokio::spawn(messaging::run_message_loop(lifecycle, config.info_sample_limit, rx));

        let (input, adapter_in) = tokio::io::duplex(64 * 1024);
        let (adapter_out, output) = tokio::io::duplex(64 * 1024);
        tokio::spawn(run(engine, channel, BufReader::new(adapter_in), adapter_out));

        Harness { input, output, mock }
    }

    async fn round_trip(harness: &mut Harness, event: &str) -> serde_json::Value {
        harness.input.write_all(event.as_bytes()).await.unwrap();
        harness.input.write_all(b"\n").await.unwrap();

        let mut reader = BufReader::new(&mut harness.output);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_event_replies_with_response() {
        let mut harness = harness().await;

        let reply = round_trip(
            &mut harness,
            r#"{"event":"fetch","id":7,"url":"https://example.com/","navigation":true}"#,
        )
        .await;

        assert_eq!(reply["reply"], "response");
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["status"], 200);
        let body = hex::decode(reply["body_hex"].as_str().unwrap()).unwrap();
        assert_eq!(body, b"<html>root</html>");
    }

    #[tokio::test]
    async fn test_non_http_fetch_is_bypassed() {
        let mut harness = harness().await;

        let reply = round_trip(
            &mut harness,
            r#"{"event":"fetch","id":3,"url":"ws://example.com/live"}"#,
        )
        .await;

        assert_eq!(reply["reply"], "bypass");
        assert_eq!(reply["id"], 3);
    }

    #[tokio::test]
    async fn test_get_cache_info_message() {
        let mut harness = harness().await;

        let reply = round_trip(
            &mut harness,
            r#"{"event":"message","id":9,"type":"GET_CACHE_INFO"}"#,
        )
        .await;

        assert_eq!(reply["reply"], "cache_info");
        assert_eq!(reply["id"], 9);
        assert_eq!(reply["info"]["generation"], "v1");
        assert_eq!(reply["info"]["entry_count"], 1);
    }

    #[tokio::test]
    async fn test_malformed_line_is_dropped() {
        let mut harness = harness().await;

        harness.input.write_all(b"not json at all\n").await.unwrap();

        // The adapter keeps running: the next well-formed event still works.
        let reply = round_trip(
            &mut harness,
            r#"{"event":"fetch","id":1,"url":"https://example.com/"}"#,
        )
        .await;
        assert_eq!(reply["id"], 1);
        assert!(harness.mock.total_fetches() >= 1);
    }

    #[tokio::test]
    async fn test_invalid_url_replies_error() {
        let mut harness = harness().await;

        let reply = round_trip(&mut harness, r#"{"event":"fetch","id":2,"url":""}"#).await;

        assert_eq!(reply["reply"], "error");
        assert_eq!(reply["id"], 2);
        assert!(reply["error"].as_str().unwrap().contains("INVALID_URL"));
    }
}
