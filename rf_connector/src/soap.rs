// soap over http/1.1 as spoken by the realflight link interface (flightaxis)

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tracing::{event, Level};

use crate::error::RfError;
use crate::socketpool::{Connection, ConnectionPool};
use crate::types::NUM_CHANNELS;

/// Closing tag that marks a complete reply.
pub const ENVELOPE_END: &str = "</SOAP-ENV:Envelope>";

/// Substring of a reply that marks a successful action.
pub const SUCCESS_MARKER: &str = "200 OK";

/// Upper bound on the size of a single reply.
pub const REPLY_BUFFER_SIZE: usize = 10000;

// the remote actions we use
pub const ACTION_INJECT_CONTROLLER: &str = "InjectUAVControllerInterface";
pub const ACTION_RESTORE_CONTROLLER: &str = "RestoreOriginalControllerDevice";
pub const ACTION_RESET_AIRCRAFT: &str = "ResetAircraft";
pub const ACTION_EXCHANGE_DATA: &str = "ExchangeData";

// bit mask selecting all 12 channels
const SELECTED_CHANNELS: u32 = 4095;

pub fn build_envelope(action: &str, body: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8'?>\
         <soap:Envelope xmlns:soap='http://schemas.xmlsoap.org/soap/envelope/' \
         xmlns:xsd='http://www.w3.org/2001/XMLSchema' \
         xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance'>\
         <soap:Body>\
         <{action}>{body}</{action}>\
         </soap:Body>\
         </soap:Envelope>"
    )
}

pub fn build_request(action: &str, body: &str) -> String {
    let envelope = build_envelope(action, body);

    format!(
        "POST / HTTP/1.1\r\n\
         Soapaction: '{}'\r\n\
         Content-Length: {}\r\n\
         Content-Type: text/xml;charset=utf-8\r\n\
         \r\n\
         {}",
        action,
        envelope.len(),
        envelope
    )
}

// the ExchangeData payload, one <item> per channel
pub fn control_inputs_body(channels: &[f64; NUM_CHANNELS]) -> String {
    let mut body = String::with_capacity(512);

    body.push_str("<pControlInputs>");
    let _ = write!(
        body,
        "<m-selectedChannels>{}</m-selectedChannels>",
        SELECTED_CHANNELS
    );
    body.push_str("<m-channelValues-0to1>");
    for value in channels {
        let _ = write!(body, "<item>{}</item>", value);
    }
    body.push_str("</m-channelValues-0to1>");
    body.push_str("</pControlInputs>");

    body
}

pub fn is_success(reply: &str) -> bool {
    reply.contains(SUCCESS_MARKER)
}

/// Sends requests on connections leased from the pool.
///
/// Every request uses a fresh connection; sending hands back a
/// [`PendingReply`] that owns that connection until the reply is read.
#[derive(Clone)]
pub struct SoapClient {
    pool: Arc<ConnectionPool>,
    reply_buffer_size: usize,
}

impl SoapClient {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        SoapClient {
            pool,
            reply_buffer_size: REPLY_BUFFER_SIZE,
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub async fn send_request(&self, action: &str, body: &str) -> Result<PendingReply, RfError> {
        let mut connection = match self.pool.acquire().await {
            Ok(c) => c,
            Err(e) => {
                return Err(RfError::NoConnection {
                    action: action.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let request = build_request(action, body);

        let written = tokio::time::timeout(
            connection.io_timeout(),
            connection.stream.write_all(request.as_bytes()),
        )
        .await;

        let reason = match written {
            Ok(Ok(())) => {
                event!(
                    Level::TRACE,
                    "{} request sent on connection {} ({} bytes)",
                    action,
                    connection.id(),
                    request.len()
                );

                return Ok(PendingReply {
                    action: action.to_string(),
                    connection,
                    buffer_size: self.reply_buffer_size,
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "write timed out".to_string(),
        };

        // a half sent request cannot be reused, drop the connection
        connection.close().await;

        Err(RfError::SendFailed {
            action: action.to_string(),
            reason,
        })
    }

    // send then receive, back to back
    pub async fn exchange(
        &self,
        action: &str,
        body: &str,
        timeout: Duration,
    ) -> Result<String, RfError> {
        self.send_request(action, body)
            .await?
            .receive_reply(timeout)
            .await
    }
}

/// A sent request whose reply has not been read yet.
#[derive(Debug)]
pub struct PendingReply {
    action: String,
    connection: Connection,
    buffer_size: usize,
}

impl PendingReply {
    pub fn connection_id(&self) -> u64 {
        self.connection.id()
    }

    /// Waits up to `timeout` for the reply and reads it.
    ///
    /// Reading stops at the closing envelope tag, a full buffer, or when the
    /// peer closes, whichever comes first. The connection is always closed
    /// afterwards.
    pub async fn receive_reply(self, timeout: Duration) -> Result<String, RfError> {
        let PendingReply {
            action,
            mut connection,
            buffer_size,
        } = self;

        match tokio::time::timeout(timeout, connection.stream.readable()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                event!(
                    Level::DEBUG,
                    "Error waiting for {} reply on connection {}: {:?}",
                    action,
                    connection.id(),
                    e
                );
                connection.close().await;
                return Err(RfError::EmptyReply);
            }
            Err(_) => {
                connection.close().await;
                return Err(RfError::Timeout(timeout));
            }
        }

        let mut buffer: Vec<u8> = vec![0_u8; buffer_size];
        let mut total: usize = 0;
        let io_timeout = connection.io_timeout();

        while total < buffer.len() {
            let n = match tokio::time::timeout(
                io_timeout,
                connection.stream.read(&mut buffer[total..]),
            )
            .await
            {
                Ok(Ok(n)) if n > 0 => n,
                _ => break,
            };

            // only the tail can contain a marker that was not there before
            let search_from = total.saturating_sub(ENVELOPE_END.len() - 1);
            total += n;

            if contains(&buffer[search_from..total], ENVELOPE_END.as_bytes()) {
                break;
            }
        }

        connection.close().await;

        if total == 0 {
            return Err(RfError::EmptyReply);
        }

        event!(Level::TRACE, "{} reply received ({} bytes)", action, total);

        Ok(String::from_utf8_lossy(&buffer[..total]).into_owned())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socketpool::PoolConfig;
    use crate::testserver::{http_reply, soap_reply, FakeRealFlight};

    fn client_for(server: &FakeRealFlight, pool_size: usize) -> SoapClient {
        SoapClient::new(Arc::new(ConnectionPool::start(PoolConfig::new(
            server.address(),
            pool_size,
        ))))
    }

    #[test]
    fn test_build_request_framing() {
        let request = build_request("ResetAircraft", "");
        let (head, envelope) = request.split_once("\r\n\r\n").unwrap();

        assert!(head.starts_with("POST / HTTP/1.1\r\n"));
        assert!(head.contains("Soapaction: 'ResetAircraft'"));
        assert!(head.contains("Content-Type: text/xml;charset=utf-8"));
        assert!(head.contains(&format!("Content-Length: {}", envelope.len())));
        assert!(envelope.contains("<soap:Body><ResetAircraft></ResetAircraft></soap:Body>"));
        assert!(envelope.ends_with("</soap:Envelope>"));
    }

    #[test]
    fn test_control_inputs_body() {
        let mut channels = [0.5; NUM_CHANNELS];
        channels[0] = 0.25;
        channels[7] = 0.0;

        let body = control_inputs_body(&channels);

        assert!(body.starts_with(
            "<pControlInputs><m-selectedChannels>4095</m-selectedChannels><m-channelValues-0to1>"
        ));
        assert!(body.ends_with("</m-channelValues-0to1></pControlInputs>"));
        assert_eq!(body.matches("<item>").count(), NUM_CHANNELS);
        assert!(body.contains("<item>0.25</item><item>0.5</item>"));
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let request = build_request("ExchangeData", "<x>\u{00e9}</x>");
        let (_, envelope) = request.split_once("\r\n\r\n").unwrap();
        assert!(request.contains(&format!("Content-Length: {}\r\n", envelope.len())));
    }

    #[tokio::test]
    async fn test_exchange_returns_full_reply() {
        let server =
            FakeRealFlight::start_replying(&soap_reply("<m-airspeed-MPS>3</m-airspeed-MPS>"))
                .await;
        let client = client_for(&server, 1);

        let reply = client
            .exchange(ACTION_EXCHANGE_DATA, "", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(is_success(&reply));
        assert!(reply.contains("<m-airspeed-MPS>3</m-airspeed-MPS>"));
        assert!(reply.ends_with(ENVELOPE_END));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("Soapaction: 'ExchangeData'"));

        client.pool().shutdown().await;
    }

    #[tokio::test]
    async fn test_reply_stops_at_buffer_size() {
        let huge = "x".repeat(REPLY_BUFFER_SIZE * 2);
        let server = FakeRealFlight::start_replying(&http_reply("200 OK", &huge)).await;
        let client = client_for(&server, 0);

        let reply = client
            .exchange(ACTION_EXCHANGE_DATA, "", Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(reply.len(), REPLY_BUFFER_SIZE);
        client.pool().shutdown().await;
    }

    #[tokio::test]
    async fn test_reply_without_envelope_ends_when_peer_closes() {
        let server = FakeRealFlight::start_replying("HTTP/1.1 500 Internal Server Error\r\n\r\n")
            .await;
        let client = client_for(&server, 0);

        let reply = client
            .exchange(ACTION_RESET_AIRCRAFT, "", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(reply.starts_with("HTTP/1.1 500"));
        assert!(!is_success(&reply));
        client.pool().shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let server = FakeRealFlight::start_replying("").await;
        let client = client_for(&server, 0);

        match client
            .exchange(ACTION_RESET_AIRCRAFT, "", Duration::from_secs(1))
            .await
        {
            Err(RfError::EmptyReply) => {}
            other => panic!("expected EmptyReply, got {:?}", other),
        }

        client.pool().shutdown().await;
    }

    #[tokio::test]
    async fn test_silent_server_times_out_and_connection_is_not_requeued() {
        let server = FakeRealFlight::start_silent().await;
        let client = client_for(&server, 2);

        let pending = client.send_request(ACTION_EXCHANGE_DATA, "").await.unwrap();
        let used_id = pending.connection_id();

        match pending.receive_reply(Duration::from_millis(100)).await {
            Err(RfError::Timeout(t)) => assert_eq!(t, Duration::from_millis(100)),
            other => panic!("expected Timeout, got {:?}", other),
        }

        // the timed out connection is closed, not leaked
        server.wait_for_closed(1).await;

        // the pool still hands out fresh connections, never the timed out one
        for _ in 0..5 {
            let c = client.pool().acquire().await.unwrap();
            assert_ne!(c.id(), used_id);
            c.close().await;
        }
        assert!(client.pool().ready_count() <= client.pool().target_size());

        client.pool().shutdown().await;
    }

    #[tokio::test]
    async fn test_stalled_write_is_send_failed_and_closes_connection() {
        // the server reads nothing for a while, so a large request fills the socket buffers
        let server = FakeRealFlight::start_deaf(Duration::from_millis(300)).await;
        let mut config = PoolConfig::new(server.address(), 0);
        config.io_timeout = Duration::from_millis(100);
        let client = SoapClient::new(Arc::new(ConnectionPool::start(config)));

        let body = "x".repeat(64 << 20);

        match client.send_request(ACTION_EXCHANGE_DATA, &body).await {
            Err(RfError::SendFailed { action, reason }) => {
                assert_eq!(action, "ExchangeData");
                assert_eq!(reason, "write timed out");
            }
            other => panic!("expected SendFailed, got {:?}", other),
        }

        server.wait_for_closed(1).await;
        assert_eq!(server.accepted(), 1);

        client.pool().shutdown().await;
    }

    #[tokio::test]
    async fn test_send_without_server_is_no_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = SoapClient::new(Arc::new(ConnectionPool::start(PoolConfig::new(
            address, 0,
        ))));

        match client.send_request(ACTION_EXCHANGE_DATA, "").await {
            Err(RfError::NoConnection { action, .. }) => assert_eq!(action, "ExchangeData"),
            other => panic!("expected NoConnection, got {:?}", other),
        }

        client.pool().shutdown().await;
    }
}
