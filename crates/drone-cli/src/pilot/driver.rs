//! Control loop driver.
//!
//! Lifecycle: `Connecting -> Active -> {EndedNormally, EndedCrash, EndedError}`.
//! Terminal states are absorbing. The policy never ends a flight on its own;
//! only a crash, a failure or an external shutdown does.

use crate::pilot::feed::TelemetryFeed;
use chrono::{DateTime, Utc};
use drone_core::models::{Command, FlightMetrics, TelemetrySnapshot};
use drone_core::policy;
use drone_sdk::{Channel, CrashReport, Exchange, Session, SessionError};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// Handshake and initial command in progress
    Connecting,
    /// Closed loop running
    Active,
    /// Stopped from outside between round trips
    EndedNormally,
    /// Server reported a crash
    EndedCrash,
    /// Channel loss or an uninterpretable reply
    EndedError,
}

impl FlightState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlightState::EndedNormally | FlightState::EndedCrash | FlightState::EndedError
        )
    }
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightState::Connecting => write!(f, "CONNECTING"),
            FlightState::Active => write!(f, "ACTIVE"),
            FlightState::EndedNormally => write!(f, "ENDED_NORMALLY"),
            FlightState::EndedCrash => write!(f, "ENDED_CRASH"),
            FlightState::EndedError => write!(f, "ENDED_ERROR"),
        }
    }
}

/// Per-flight state, owned by the pilot alone.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub connection_id: Option<String>,
    pub command_count: u64,
    pub last_snapshot: Option<TelemetrySnapshot>,
    /// Only filled in by a crash reply.
    pub metrics: Option<FlightMetrics>,
}

/// Summary handed back when the flight is over.
#[derive(Debug, Clone)]
pub struct FlightReport {
    pub state: FlightState,
    /// Cleared when the flight is cancelled from outside.
    pub connection_id: Option<String>,
    pub commands_sent: u64,
    pub last_snapshot: Option<TelemetrySnapshot>,
    pub metrics: Option<FlightMetrics>,
    pub crash_message: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl FlightReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}

enum Step {
    Telemetry(TelemetrySnapshot),
    Crashed,
    Failed,
}

/// Drives one flight from handshake to a terminal state.
pub struct Pilot {
    feed: TelemetryFeed,
    state: FlightState,
    session_state: SessionState,
    crash_message: Option<String>,
    error: Option<String>,
    started_at: DateTime<Utc>,
}

impl Pilot {
    pub fn new(feed: TelemetryFeed) -> Self {
        Self {
            feed,
            state: FlightState::Connecting,
            session_state: SessionState::default(),
            crash_message: None,
            error: None,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    /// Fly until the flight ends. `shutdown` is only checked between round
    /// trips; a command already on the wire always gets its reply.
    pub async fn fly<C: Channel>(
        mut self,
        channel: C,
        mut shutdown: broadcast::Receiver<()>,
    ) -> FlightReport {
        let mut session = match Session::open(channel).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!("Handshake failed: {}", err);
                self.error = Some(err.to_string());
                self.transition(FlightState::EndedError);
                return self.finish();
            }
        };
        self.session_state.connection_id = Some(session.connection_id().to_string());

        tracing::info!("Starting simulation...");
        match self.exchange(&mut session, &Command::initial()).await {
            Step::Telemetry(snapshot) => {
                self.accept(snapshot);
                self.transition(FlightState::Active);
            }
            Step::Crashed | Step::Failed => {
                tracing::error!("Failed to retrieve initial telemetry");
                if self.error.is_none() {
                    self.error = Some("crashed before initial telemetry".to_string());
                }
                self.transition(FlightState::EndedError);
            }
        }

        while self.state == FlightState::Active {
            if shutdown_requested(&mut shutdown) {
                tracing::info!("Shutdown requested, ending flight");
                self.session_state.connection_id = None;
                self.transition(FlightState::EndedNormally);
                break;
            }

            let Some(snapshot) = self.session_state.last_snapshot else {
                self.error = Some("no telemetry to act on".to_string());
                self.transition(FlightState::EndedError);
                break;
            };

            let command = policy::decide(&snapshot);
            match self.exchange(&mut session, &command).await {
                Step::Telemetry(snapshot) => {
                    self.accept(snapshot);
                    tracing::debug!(iteration = self.session_state.command_count, "Telemetry updated");
                }
                Step::Crashed => self.transition(FlightState::EndedCrash),
                Step::Failed => {
                    tracing::warn!("Simulation ended due to error");
                    self.transition(FlightState::EndedError);
                }
            }
        }

        session.close().await;
        self.finish()
    }

    async fn exchange<C: Channel>(&mut self, session: &mut Session<C>, command: &Command) -> Step {
        let result = session.send_command(command).await;
        self.session_state.command_count = session.command_count();

        match result {
            Ok(Exchange::Success(reply)) => match reply.snapshot() {
                Some(snapshot) => Step::Telemetry(snapshot),
                None => {
                    tracing::warn!(
                        command_count = self.session_state.command_count,
                        "Reply carried no telemetry"
                    );
                    self.error = Some("reply carried no telemetry".to_string());
                    Step::Failed
                }
            },
            Ok(Exchange::Crash(report)) => {
                self.record_crash(report);
                Step::Crashed
            }
            Ok(Exchange::DecodeFailure { reason }) => {
                tracing::warn!(command_count = self.session_state.command_count, "Bad reply: {}", reason);
                self.error = Some(reason);
                Step::Failed
            }
            Err(err) => {
                if let SessionError::ChannelClosed { reason } = &err {
                    report_channel_loss(reason);
                }
                self.error = Some(err.to_string());
                Step::Failed
            }
        }
    }

    fn accept(&mut self, snapshot: TelemetrySnapshot) {
        self.session_state.last_snapshot = Some(snapshot);
        self.feed.publish(snapshot);
    }

    fn record_crash(&mut self, report: CrashReport) {
        tracing::warn!("*** DRONE CRASHED: {} ***", report.message);

        if let Some(snapshot) = report.final_snapshot {
            self.accept(snapshot);
        }
        self.session_state.metrics = report.metrics;

        let metrics = report.metrics.unwrap_or_default();
        tracing::info!(
            total_distance = metrics.total_distance,
            iterations = metrics.iterations,
            "Final flight statistics"
        );
        self.crash_message = Some(report.message);
    }

    fn transition(&mut self, next: FlightState) {
        if self.state.is_terminal() {
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "Flight state change");
        self.state = next;
    }

    fn finish(self) -> FlightReport {
        FlightReport {
            state: self.state,
            connection_id: self.session_state.connection_id,
            commands_sent: self.session_state.command_count,
            last_snapshot: self.session_state.last_snapshot,
            metrics: self.session_state.metrics,
            crash_message: self.crash_message,
            error: self.error,
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    match shutdown.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
    }
}

fn report_channel_loss(reason: &str) {
    tracing::error!(
        "The connection was closed unexpectedly ({}). Possible reasons: \
         server crashed or restarted; keep-alive ping timed out; \
         server closed the connection due to inactivity",
        reason
    );
}
