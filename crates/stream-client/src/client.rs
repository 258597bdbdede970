//! Stream client event loop

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use alerting::{AlertConfig, AlertSink, AlertTransition, HazardAlert, HazardWarning};
use frame_renderer::{DrawingSurface, FrameRenderer, RenderOutcome};
use futures_util::{SinkExt, StreamExt};
use hazard_protocol::{
    decode_binary, decode_text, DetectionMode, InboundMessage, LaneHazards, Location,
    OutboundMessage, TelemetryMessage,
};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::backoff::{LogThrottle, ReconnectPolicy};
use crate::config::ClientConfig;
use crate::endpoint::resolve_stream_url;
use crate::event::ClientEvent;
use crate::session::{SessionReader, SessionWriter};
use crate::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = Result<WsStream, tungstenite::Error>> + Send>>;

/// Connection lifecycle
enum Link {
    Connecting(ConnectFuture),
    Open(WsStream),
    /// Closed, reconnect timer armed
    Waiting(Pin<Box<Sleep>>),
}

/// What the link produced
enum LinkEvent {
    Opened(WsStream),
    ConnectFailed(tungstenite::Error),
    Message(Message),
    Closed(Option<tungstenite::Error>),
    RetryDue,
}

impl Link {
    /// Cancel safe: in-progress connects and timers survive being dropped mid-poll.
    async fn next_event(&mut self) -> LinkEvent {
        match self {
            Link::Connecting(fut) => match fut.as_mut().await {
                Ok(ws) => LinkEvent::Opened(ws),
                Err(e) => LinkEvent::ConnectFailed(e),
            },
            Link::Open(ws) => match ws.next().await {
                Some(Ok(msg)) => LinkEvent::Message(msg),
                Some(Err(e)) => LinkEvent::Closed(Some(e)),
                None => LinkEvent::Closed(None),
            },
            Link::Waiting(sleep) => {
                sleep.as_mut().await;
                LinkEvent::RetryDue
            }
        }
    }

    fn is_open(&self) -> bool {
        matches!(self, Link::Open(_))
    }
}

/// Real-time hazard stream client.
///
/// Owns the connection, the drawing surface, the lane warning and both
/// timers (reconnect and warning clear) for one session.
pub struct StreamClient<S: DrawingSurface, A: AlertSink> {
    url: String,
    config: ClientConfig,
    policy: ReconnectPolicy,
    log_throttle: LogThrottle,
    renderer: FrameRenderer<S>,
    alert: HazardAlert,
    sink: A,
    session: SessionWriter,
    last_location: Option<Location>,
    location_warned: bool,
    retry: u32,
}

impl<S, A> StreamClient<S, A>
where
    S: DrawingSurface + 'static,
    A: AlertSink + 'static,
{
    pub fn new(
        config: ClientConfig,
        alert: AlertConfig,
        surface: S,
        sink: A,
    ) -> Result<Self, ClientError> {
        let url = resolve_stream_url(
            config.origin.as_deref(),
            &config.backend_url,
            &config.proxy_path,
        )?;
        info!("Creating stream client for {}", url);

        Ok(Self {
            url,
            policy: config.reconnect.clone(),
            log_throttle: LogThrottle::default(),
            renderer: FrameRenderer::new(surface, config.renderer.clone()),
            alert: HazardAlert::new(alert),
            sink,
            session: SessionWriter::new(),
            last_location: None,
            location_warned: false,
            retry: 0,
            config,
        })
    }

    /// Resolved stream URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> SessionReader {
        self.session.reader()
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> ClientHandle {
        let (events_tx, events_rx) = mpsc::channel(self.config.event_queue.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = self.session();
        let task = tokio::spawn(self.run(events_rx, shutdown_rx));

        ClientHandle {
            events: events_tx,
            shutdown: shutdown_tx,
            session,
            task,
        }
    }

    /// Drive the session until `shutdown` flips or its sender goes away
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ClientEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Starting stream client");
        let mut link = self.connect();
        let mut events_open = true;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let clear_at = self.alert.clear_deadline();
            let decoding = self.renderer.in_flight() > 0;

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event, &mut link).await,
                    None => {
                        debug!("Client event queue closed");
                        events_open = false;
                    }
                },
                link_event = link.next_event() => {
                    self.handle_link_event(link_event, &mut link).await;
                }
                Some(outcome) = self.renderer.next_outcome(), if decoding => {
                    self.handle_render(outcome);
                }
                _ = tokio::time::sleep_until(clear_at.unwrap_or_else(Instant::now)), if clear_at.is_some() => {
                    self.on_clear_timer();
                }
            }
        }

        self.teardown(link).await;
    }

    fn connect(&self) -> Link {
        debug!("Connecting to {} (retry {})", self.url, self.retry);
        let url = self.url.clone();
        Link::Connecting(Box::pin(async move {
            tokio_tungstenite::connect_async(url)
                .await
                .map(|(ws, _response)| ws)
        }))
    }

    async fn handle_link_event(&mut self, event: LinkEvent, link: &mut Link) {
        match event {
            LinkEvent::Opened(ws) => {
                self.retry = 0;
                *link = Link::Open(ws);
                info!("Connected to hazard stream at {}", self.url);
                self.session.update(|s| {
                    s.connected = true;
                    s.retry = 0;
                });

                if let Some(location) = self.last_location {
                    self.send_location(location, link).await;
                }
            }
            LinkEvent::ConnectFailed(e) => {
                *link = self.schedule_reconnect(Some(e.to_string()));
            }
            LinkEvent::Message(Message::Close(frame)) => {
                debug!("Stream close frame: {:?}", frame);
                *link = self.schedule_reconnect(None);
            }
            LinkEvent::Message(msg) => self.handle_message(msg),
            LinkEvent::Closed(e) => {
                *link = self.schedule_reconnect(e.map(|e| e.to_string()));
            }
            LinkEvent::RetryDue => {
                self.retry = self.retry.saturating_add(1);
                *link = self.connect();
            }
        }
    }

    /// Transport fault or close: mark disconnected and arm the reconnect timer.
    ///
    /// Telemetry from the dropped link is stale, so lane hazards and the
    /// hazard type are cleared and an active warning starts its clear delay.
    fn schedule_reconnect(&mut self, error: Option<String>) -> Link {
        let retry = self.retry;
        self.alert.on_lane_count(0, Instant::now());
        let alert_active = self.alert.is_active();
        self.session.update(|s| {
            s.connected = false;
            s.retry = retry;
            s.lane_hazards = LaneHazards::default();
            s.hazard_type = None;
            s.alert_active = alert_active;
        });

        if let Some(e) = error {
            if self.log_throttle.log_error(retry) {
                error!("Stream error ({}). Attempting to reconnect...", e);
            }
        }

        let delay = self.policy.next_delay(retry);
        if self.log_throttle.log_close(retry) {
            warn!(
                "Stream closed. Reconnecting in {}s...",
                delay.as_secs_f64().round()
            );
        }
        metrics::counter!("hazard_eye_reconnects_total").increment(1);

        Link::Waiting(Box::pin(tokio::time::sleep(delay)))
    }

    fn handle_message(&mut self, msg: Message) {
        let inbound = match msg {
            Message::Text(text) => match decode_text(&text) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!("Dropping telemetry: {}", e);
                    metrics::counter!("hazard_eye_telemetry_dropped_total").increment(1);
                    return;
                }
            },
            Message::Binary(bytes) => decode_binary(bytes),
            // Control frames are answered by tungstenite itself
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) | Message::Close(_) => return,
        };

        match inbound {
            InboundMessage::Keepalive => {}
            InboundMessage::Telemetry(telemetry) => self.apply_telemetry(telemetry),
            InboundMessage::Frame(payload) => {
                if !self.renderer.submit(payload) {
                    let dropped = self.renderer.dropped();
                    self.session.update(|s| s.frames_dropped = dropped);
                    metrics::counter!("hazard_eye_frames_dropped_total").increment(1);
                }
            }
        }
    }

    fn apply_telemetry(&mut self, telemetry: TelemetryMessage) {
        let hazards = telemetry.lane_hazards();
        let transition = self.alert.on_lane_count(hazards.count(), Instant::now());
        let alert_active = self.alert.is_active();

        if transition == Some(AlertTransition::Raised) {
            self.sink.warning_raised(&HazardWarning {
                message: self.alert.config().message.clone(),
                lane_hazard_count: hazards.count(),
                hazard_type: telemetry.hazard_type.clone(),
                nearest_m: hazards.nearest(),
            });
        }

        self.session.update(|s| {
            s.lane_hazards = hazards;
            s.hazard_type = telemetry.hazard_type;
            if let Some(mode) = telemetry.mode {
                s.mode = mode;
            }
            if let Some(progress) = telemetry.video_progress {
                s.video_progress = progress;
            }
            s.alert_active = alert_active;
        });
    }

    fn handle_render(&mut self, outcome: RenderOutcome) {
        match outcome {
            RenderOutcome::Painted(report) => {
                metrics::counter!("hazard_eye_frames_painted_total").increment(1);
                if report.resized || report.fps.is_some() {
                    self.session.update(|s| {
                        s.frame_size = Some((report.width, report.height));
                        if let Some(fps) = report.fps {
                            s.fps = fps;
                        }
                    });
                }
                if let Some(fps) = report.fps {
                    metrics::gauge!("hazard_eye_fps").set(fps as f64);
                }
            }
            RenderOutcome::Failed(_) => {
                metrics::counter!("hazard_eye_frames_failed_total").increment(1);
            }
        }
    }

    fn on_clear_timer(&mut self) {
        if self.alert.on_timer(Instant::now()) == Some(AlertTransition::Cleared) {
            self.sink.warning_cleared();
            self.session.update(|s| s.alert_active = false);
        }
    }

    async fn handle_event(&mut self, event: ClientEvent, link: &mut Link) {
        match event {
            ClientEvent::Location(location) => {
                self.last_location = Some(location);
                self.session.update(|s| s.location = Some(location));
                if link.is_open() {
                    self.send_location(location, link).await;
                } else {
                    debug!("Not connected, location cached for next open");
                }
            }
            ClientEvent::LocationError(reason) => {
                if self.location_warned {
                    debug!("Location still unavailable: {}", reason);
                    return;
                }
                self.location_warned = true;
                warn!(
                    "Location unavailable ({}). Hazard reporting needs location access",
                    reason
                );
                self.session.update(|s| s.location_warning = Some(reason));
            }
            ClientEvent::ModeChanged(mode) => {
                info!("Detection mode: {}", mode.label());
                self.session.update(|s| s.mode = mode);
            }
            ClientEvent::UploadStarted => {
                self.session.update(|s| s.uploading = true);
            }
            ClientEvent::UploadFinished { filename } => {
                self.session.update(|s| {
                    s.uploading = false;
                    if filename.is_some() {
                        s.mode = DetectionMode::Video;
                    }
                });
            }
            ClientEvent::VideoStopped => {
                self.session.update(|s| {
                    s.mode = DetectionMode::Live;
                    s.video_progress = 0.0;
                });
            }
        }
    }

    async fn send_location(&mut self, location: Location, link: &mut Link) {
        let Link::Open(ws) = link else {
            return;
        };

        let json = match OutboundMessage::gps(location).to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not encode location: {}", e);
                return;
            }
        };

        let sent = ws.send(Message::Text(json)).await;
        if let Err(e) = sent {
            *link = self.schedule_reconnect(Some(e.to_string()));
        }
    }

    async fn teardown(&mut self, link: Link) {
        info!("Stopping stream client");

        // Leaving the loop means no close can schedule a reconnect;
        // dropping the link cancels a pending connect or reconnect timer.
        if let Link::Open(mut ws) = link {
            let timeout = Duration::from_millis(self.config.close_timeout_ms);
            match tokio::time::timeout(timeout, ws.close(None)).await {
                Ok(Ok(())) => debug!("Stream closed cleanly"),
                Ok(Err(e)) => debug!("Stream close failed: {}", e),
                Err(_) => debug!("Stream close timed out"),
            }
        }

        if self.alert.dismiss() == Some(AlertTransition::Cleared) {
            self.sink.warning_cleared();
        }
        self.renderer.release();

        self.session.update(|s| {
            s.connected = false;
            s.alert_active = false;
            s.fps = 0;
            s.frame_size = None;
        });
    }
}

/// Handle to a spawned client
pub struct ClientHandle {
    events: mpsc::Sender<ClientEvent>,
    shutdown: watch::Sender<bool>,
    session: SessionReader,
    task: JoinHandle<()>,
}

impl ClientHandle {
    /// Queue an event for the client loop
    pub async fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ClientError::Stopped)
    }

    /// Sender for tasks that feed events independently
    pub fn events(&self) -> mpsc::Sender<ClientEvent> {
        self.events.clone()
    }

    pub fn session(&self) -> SessionReader {
        self.session.clone()
    }

    /// Stop the loop and wait for teardown to finish
    pub async fn shutdown(self) -> Result<(), ClientError> {
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|e| ClientError::Task(e.to_string()))
    }
}
