//! Command/response session with the flight server.
//!
//! One command is in flight at a time: every [`Session::send_command`] call
//! writes a single frame and consumes exactly one reply before returning.

use crate::channel::Channel;
use crate::error::{ChannelError, SessionError};
use crate::messages::{CommandFrame, Greeting, Response, ResponseStatus};
use drone_core::models::{Command, FlightMetrics, TelemetrySnapshot};
use drone_core::telemetry;

const UNKNOWN_CRASH: &str = "Unknown crash";

/// Outcome of one round trip that did not lose the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    /// Server accepted the command.
    Success(Reply),
    /// Server reports the vehicle crashed. No further commands may be sent.
    Crash(CrashReport),
    /// Reply could not be interpreted. Ends the flight; there is no retry.
    DecodeFailure { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub telemetry: Option<String>,
    pub message: Option<String>,
}

impl Reply {
    /// Decoded telemetry, if the reply carried a non-empty telemetry string.
    pub fn snapshot(&self) -> Option<TelemetrySnapshot> {
        self.telemetry
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(telemetry::decode)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashReport {
    pub message: String,
    pub metrics: Option<FlightMetrics>,
    pub final_snapshot: Option<TelemetrySnapshot>,
}

/// An open session: the channel plus the server-assigned identity and the
/// command counter.
pub struct Session<C> {
    channel: C,
    connection_id: String,
    greeting: String,
    command_count: u64,
}

impl<C: Channel> Session<C> {
    /// Read the greeting and take ownership of the channel.
    pub async fn open(mut channel: C) -> Result<Self, SessionError> {
        let raw = channel
            .recv_text()
            .await
            .map_err(|err| SessionError::Handshake {
                reason: err.to_string(),
            })?;

        let greeting: Greeting =
            serde_json::from_str(&raw).map_err(|err| SessionError::Handshake {
                reason: format!("undecodable greeting: {}", err),
            })?;

        tracing::info!(connection_id = %greeting.connection_id, "Connected to flight server");
        if !greeting.message.is_empty() {
            tracing::info!("Server says: {}", greeting.message);
        }

        Ok(Self {
            channel,
            connection_id: greeting.connection_id,
            greeting: greeting.message,
            command_count: 0,
        })
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn greeting_message(&self) -> &str {
        &self.greeting
    }

    /// Commands sent so far, including ones whose round trip failed.
    pub fn command_count(&self) -> u64 {
        self.command_count
    }

    /// Send one command and wait for its reply.
    ///
    /// The counter advances before anything is written, so a failed round
    /// trip still consumes its number. Only channel loss is an `Err`.
    pub async fn send_command(&mut self, command: &Command) -> Result<Exchange, SessionError> {
        self.command_count += 1;
        let frame = CommandFrame::new(command, self.command_count);

        let payload = match serde_json::to_string(&frame) {
            Ok(payload) => payload,
            Err(err) => {
                return Ok(Exchange::DecodeFailure {
                    reason: format!("unencodable command: {}", err),
                })
            }
        };

        tracing::debug!(
            command_count = self.command_count,
            speed = command.speed,
            altitude = command.altitude,
            "Sending command"
        );

        if let Err(err) = self.channel.send_text(payload).await {
            return channel_failure(err);
        }

        match self.channel.recv_text().await {
            Ok(raw) => Ok(interpret_response(&raw)),
            Err(err) => channel_failure(err),
        }
    }

    /// Close the channel and drop the session identity.
    pub async fn close(mut self) {
        if let Err(err) = self.channel.close().await {
            tracing::debug!(connection_id = %self.connection_id, "Close failed: {}", err);
        }
    }
}

fn channel_failure(err: ChannelError) -> Result<Exchange, SessionError> {
    match err {
        ChannelError::Closed(reason) => Err(SessionError::ChannelClosed { reason }),
        ChannelError::Transport(reason) => Ok(Exchange::DecodeFailure { reason }),
    }
}

/// Classify a raw reply. Only an explicit `"crashed"` status is a crash.
pub fn interpret_response(raw: &str) -> Exchange {
    let response: Response = match serde_json::from_str(raw) {
        Ok(response) => response,
        Err(err) => {
            return Exchange::DecodeFailure {
                reason: format!("malformed response: {}", err),
            }
        }
    };

    match response.status {
        ResponseStatus::Success => Exchange::Success(Reply {
            telemetry: response.telemetry,
            message: response.message,
        }),
        ResponseStatus::Crashed => Exchange::Crash(CrashReport {
            message: response
                .message
                .unwrap_or_else(|| UNKNOWN_CRASH.to_string()),
            metrics: response
                .metrics
                .and_then(|value| serde_json::from_value(value).ok()),
            final_snapshot: response
                .final_telemetry
                .as_deref()
                .filter(|raw| !raw.is_empty())
                .map(telemetry::decode),
        }),
        ResponseStatus::Unknown => Exchange::DecodeFailure {
            reason: "unexpected response status".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use drone_core::models::SensorTier;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Replays scripted receive results; sends always succeed.
    struct ScriptedChannel {
        incoming: VecDeque<Result<String, ChannelError>>,
        sent: Vec<String>,
    }

    impl ScriptedChannel {
        fn new(incoming: Vec<Result<String, ChannelError>>) -> Self {
            Self {
                incoming: incoming.into(),
                sent: Vec::new(),
            }
        }
    }

    impl Channel for ScriptedChannel {
        async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
            self.sent.push(text);
            Ok(())
        }

        async fn recv_text(&mut self) -> Result<String, ChannelError> {
            self.incoming
                .pop_front()
                .unwrap_or_else(|| Err(ChannelError::Closed("script exhausted".to_string())))
        }

        async fn close(&mut self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    async fn open_session() -> (Session<MemoryChannel>, MemoryChannel) {
        let (client, mut server) = MemoryChannel::pair(4);
        server
            .send_text(json!({"connection_id": "conn-1", "message": "welcome"}).to_string())
            .await
            .unwrap();
        let session = Session::open(client).await.unwrap();
        (session, server)
    }

    #[tokio::test]
    async fn open_reads_greeting() {
        let (session, _server) = open_session().await;
        assert_eq!(session.connection_id(), "conn-1");
        assert_eq!(session.greeting_message(), "welcome");
        assert_eq!(session.command_count(), 0);
    }

    #[tokio::test]
    async fn open_rejects_bad_greeting() {
        let (client, mut server) = MemoryChannel::pair(1);
        server.send_text("not json".into()).await.unwrap();
        let err = Session::open(client).await.err().unwrap();
        assert!(matches!(err, SessionError::Handshake { .. }));
    }

    #[tokio::test]
    async fn open_fails_when_peer_is_gone() {
        let (client, server) = MemoryChannel::pair(1);
        drop(server);
        let err = Session::open(client).await.err().unwrap();
        assert!(matches!(err, SessionError::Handshake { .. }));
    }

    #[tokio::test]
    async fn send_command_writes_counter_and_reads_reply() {
        let (mut session, mut server) = open_session().await;
        server
            .send_text(json!({"status": "success", "telemetry": "X-1-Y-2-BAT-90"}).to_string())
            .await
            .unwrap();

        let exchange = session.send_command(&Command::initial()).await.unwrap();
        let sent: Value = serde_json::from_str(&server.recv_text().await.unwrap()).unwrap();
        assert_eq!(sent["command_count"], 1);
        assert_eq!(sent["movement"], "fwd");

        match exchange {
            Exchange::Success(reply) => {
                let snapshot = reply.snapshot().unwrap();
                assert_eq!(snapshot.y, 2.0);
                assert_eq!(snapshot.battery, 90.0);
            }
            other => panic!("unexpected exchange: {:?}", other),
        }
    }

    #[tokio::test]
    async fn channel_loss_is_an_error_and_still_counts() {
        let (mut session, server) = open_session().await;
        drop(server);
        let err = session.send_command(&Command::initial()).await.unwrap_err();
        assert!(matches!(err, SessionError::ChannelClosed { .. }));
        assert_eq!(session.command_count(), 1);
    }

    #[tokio::test]
    async fn transport_error_is_a_soft_failure_and_still_counts() {
        let channel = ScriptedChannel::new(vec![
            Ok(json!({"connection_id": "conn-2"}).to_string()),
            Err(ChannelError::Transport("non-text binary frame".to_string())),
            Ok(json!({"status": "success", "telemetry": "X-3"}).to_string()),
        ]);
        let mut session = Session::open(channel).await.unwrap();

        let exchange = session.send_command(&Command::initial()).await.unwrap();
        match exchange {
            Exchange::DecodeFailure { reason } => assert!(reason.contains("binary")),
            other => panic!("unexpected exchange: {:?}", other),
        }
        assert_eq!(session.command_count(), 1);

        // The channel is still usable and the next command gets the next number.
        let exchange = session.send_command(&Command::initial()).await.unwrap();
        assert!(matches!(exchange, Exchange::Success(_)));
        assert_eq!(session.command_count(), 2);

        let counts: Vec<u64> = session
            .channel
            .sent
            .iter()
            .map(|raw| serde_json::from_str::<Value>(raw).unwrap()["command_count"].as_u64().unwrap())
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[tokio::test]
    async fn closed_error_is_not_a_soft_failure() {
        let channel = ScriptedChannel::new(vec![
            Ok(json!({"connection_id": "conn-3"}).to_string()),
            Err(ChannelError::Closed("1000 bye".to_string())),
        ]);
        let mut session = Session::open(channel).await.unwrap();

        let err = session.send_command(&Command::initial()).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::ChannelClosed {
                reason: "1000 bye".to_string()
            }
        );
        assert_eq!(session.command_count(), 1);
    }

    #[test]
    fn crash_reply_carries_metrics_and_final_snapshot() {
        let raw = json!({
            "status": "crashed",
            "message": "Hit the ground",
            "metrics": {"total_distance": 420.5, "iterations": 37},
            "final_telemetry": "X-420-Y-0-BAT-12-SENS-RED"
        })
        .to_string();

        match interpret_response(&raw) {
            Exchange::Crash(report) => {
                assert_eq!(report.message, "Hit the ground");
                let metrics = report.metrics.unwrap();
                assert_eq!(metrics.total_distance, 420.5);
                assert_eq!(metrics.iterations, 37);
                let snapshot = report.final_snapshot.unwrap();
                assert_eq!(snapshot.x, 420.0);
                assert_eq!(snapshot.sensor_tier, SensorTier::Critical);
            }
            other => panic!("unexpected exchange: {:?}", other),
        }
    }

    #[test]
    fn crash_without_details_still_crashes() {
        let raw = json!({"status": "crashed", "metrics": "garbage"}).to_string();
        match interpret_response(&raw) {
            Exchange::Crash(report) => {
                assert_eq!(report.message, UNKNOWN_CRASH);
                assert!(report.metrics.is_none());
                assert!(report.final_snapshot.is_none());
            }
            other => panic!("unexpected exchange: {:?}", other),
        }
    }

    #[test]
    fn crash_is_only_inferred_from_status() {
        let raw = json!({"status": "success", "message": "crashed", "final_telemetry": "X-1"})
            .to_string();
        assert!(matches!(interpret_response(&raw), Exchange::Success(_)));
    }

    #[test]
    fn malformed_replies_are_soft_failures() {
        for raw in ["", "{", "[]", r#"{"telemetry": "X-1"}"#, r#"{"status": "exploded"}"#] {
            assert!(
                matches!(interpret_response(raw), Exchange::DecodeFailure { .. }),
                "{raw:?} should be a decode failure"
            );
        }
    }

    #[test]
    fn empty_telemetry_has_no_snapshot() {
        let reply = Reply {
            telemetry: Some(String::new()),
            message: None,
        };
        assert!(reply.snapshot().is_none());
    }
}
