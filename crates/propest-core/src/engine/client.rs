use super::config::DEFAULT_SERVER_PORT;
use super::error::RequestError;
use super::forcefield::ForceFieldSource;
use super::options::RequestOptions;
use super::protocol::{self, ClientMessage, ProtocolError, ServerMessage};
use super::results::{RequestResult, RequestSnapshot, RequestStatus};
use super::server::EvaluatorServer;
use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::ids::RequestId;
use std::net::TcpStream;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_HOST: &str = "localhost";
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Where to find an evaluator server. Without an address the server is assumed to be on
/// this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub server_address: Option<String>,
    pub server_port: u16,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            server_address: None,
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

impl ConnectionOptions {
    pub fn new(server_address: Option<String>, server_port: u16) -> Self {
        Self {
            server_address,
            server_port,
        }
    }

    pub fn address(&self) -> String {
        format!(
            "{}:{}",
            self.server_address.as_deref().unwrap_or(DEFAULT_HOST),
            self.server_port
        )
    }
}

/// How an awaited request ended, as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Complete(RequestResult),
    Errored(String),
    TimedOut,
    Cancelled,
}

/// Cooperative cancellation for a client-side wait. Cancelling never aborts work on the
/// server; it only stops the local poll loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, signal) = &*self.state;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for up to `timeout`, returning early with `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, signal) = &*self.state;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = signal
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[derive(Clone)]
enum Transport {
    Tcp { address: String },
    InProcess(EvaluatorServer),
}

/// Submits datasets to an evaluator server and hands back [`Request`] handles.
#[derive(Clone)]
pub struct EvaluatorClient {
    transport: Transport,
}

impl EvaluatorClient {
    /// A client for a server reachable over TCP. No connection is made until the first call.
    pub fn connect(options: &ConnectionOptions) -> Self {
        Self {
            transport: Transport::Tcp {
                address: options.address(),
            },
        }
    }

    /// A client for a server running in this process.
    pub fn in_process(server: &EvaluatorServer) -> Self {
        Self {
            transport: Transport::InProcess(server.clone()),
        }
    }

    fn exchange(&self, message: ClientMessage) -> Result<ServerMessage, RequestError> {
        match &self.transport {
            Transport::InProcess(server) => Ok(server.handle(message)),
            Transport::Tcp { address } => {
                let mut stream =
                    TcpStream::connect(address).map_err(|source| RequestError::Connection {
                        address: address.clone(),
                        source,
                    })?;
                stream
                    .set_read_timeout(Some(RESPONSE_TIMEOUT))
                    .map_err(ProtocolError::from)?;
                protocol::write_frame(&mut stream, &message)?;
                Ok(protocol::read_frame(&mut stream)?)
            }
        }
    }

    /// Sends the dataset for estimation and returns without waiting for it to finish.
    /// Options are checked locally before anything is sent.
    pub fn request_estimate(
        &self,
        dataset: &PhysicalPropertyDataSet,
        force_field: &ForceFieldSource,
        options: &RequestOptions,
    ) -> Result<Request, RequestError> {
        options.validate()?;
        let response = self.exchange(ClientMessage::Submit {
            dataset: dataset.clone(),
            force_field: force_field.clone(),
            options: options.clone(),
        })?;
        match response {
            ServerMessage::Submitted { request_id } => {
                info!(%request_id, properties = dataset.len(), "Estimation request submitted");
                Ok(self.request(request_id))
            }
            ServerMessage::Error { message } => Err(RequestError::Server(message)),
            _ => Err(ProtocolError::UnexpectedResponse {
                expected: "submitted",
            }
            .into()),
        }
    }

    /// A handle to a request submitted earlier, possibly by another client.
    pub fn request(&self, request_id: RequestId) -> Request {
        Request {
            id: request_id,
            client: self.clone(),
            cancellation: CancellationToken::new(),
        }
    }
}

/// Client-side handle to a submitted request.
pub struct Request {
    id: RequestId,
    client: EvaluatorClient,
    cancellation: CancellationToken,
}

impl Request {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Replaces the request's token, e.g. with one wired to a Ctrl-C handler.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Queries the server once.
    pub fn poll(&self) -> Result<RequestSnapshot, RequestError> {
        match self.client.exchange(ClientMessage::Query {
            request_id: self.id,
        })? {
            ServerMessage::Snapshot { snapshot } => Ok(snapshot),
            ServerMessage::UnknownRequest { request_id } => {
                Err(RequestError::UnknownRequest(request_id))
            }
            ServerMessage::Error { message } => Err(RequestError::Server(message)),
            _ => Err(ProtocolError::UnexpectedResponse {
                expected: "snapshot",
            }
            .into()),
        }
    }

    pub fn status(&self) -> Result<RequestStatus, RequestError> {
        Ok(self.poll()?.status)
    }

    /// Returns the result of a complete request.
    ///
    /// With `synchronous` the call re-polls every `polling_interval` until the request is
    /// finished; otherwise it returns `None` straight away while the request is still pending
    /// or running. An errored request is returned as [`RequestError::Failed`].
    pub fn results(
        &self,
        synchronous: bool,
        polling_interval: Duration,
    ) -> Result<Option<RequestResult>, RequestError> {
        if !synchronous {
            let snapshot = self.poll()?;
            return match snapshot.status {
                RequestStatus::Complete => Self::complete_result(snapshot).map(Some),
                RequestStatus::Errored => Err(self.failed(snapshot)),
                RequestStatus::Pending | RequestStatus::Running => Ok(None),
            };
        }
        match self.await_completion(polling_interval, None)? {
            Completion::Complete(result) => Ok(Some(result)),
            Completion::Errored(message) => Err(RequestError::Failed(self.id, message)),
            Completion::TimedOut | Completion::Cancelled => Ok(None),
        }
    }

    /// Polls until the request finishes, the optional timeout expires or the request's
    /// cancellation token fires. `Err` is reserved for transport failures.
    pub fn await_completion(
        &self,
        polling_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<Completion, RequestError> {
        self.await_completion_with(polling_interval, timeout, |_| {})
    }

    /// Like [`await_completion`](Self::await_completion), calling `on_poll` with every
    /// snapshot received.
    pub fn await_completion_with<F>(
        &self,
        polling_interval: Duration,
        timeout: Option<Duration>,
        mut on_poll: F,
    ) -> Result<Completion, RequestError>
    where
        F: FnMut(&RequestSnapshot),
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.cancellation.is_cancelled() {
                return Ok(Completion::Cancelled);
            }
            let snapshot = self.poll()?;
            on_poll(&snapshot);
            debug!(
                request_id = %self.id,
                status = %snapshot.status,
                completed = snapshot.progress.completed,
                total = snapshot.progress.total,
                "Polled request"
            );
            match snapshot.status {
                RequestStatus::Complete => {
                    return Self::complete_result(snapshot).map(Completion::Complete);
                }
                RequestStatus::Errored => {
                    return Ok(Completion::Errored(
                        snapshot
                            .error
                            .unwrap_or_else(|| "request errored".to_string()),
                    ));
                }
                RequestStatus::Pending | RequestStatus::Running => {}
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Completion::TimedOut);
                    }
                    polling_interval.min(deadline - now)
                }
                None => polling_interval,
            };
            if self.cancellation.wait_timeout(wait) {
                return Ok(Completion::Cancelled);
            }
        }
    }

    /// Asks the server to forget this request.
    pub fn release(self) -> Result<(), RequestError> {
        match self.client.exchange(ClientMessage::Release {
            request_id: self.id,
        })? {
            ServerMessage::Released { .. } => Ok(()),
            ServerMessage::UnknownRequest { request_id } => {
                Err(RequestError::UnknownRequest(request_id))
            }
            ServerMessage::Error { message } => Err(RequestError::Server(message)),
            _ => Err(ProtocolError::UnexpectedResponse {
                expected: "released",
            }
            .into()),
        }
    }

    fn complete_result(snapshot: RequestSnapshot) -> Result<RequestResult, RequestError> {
        snapshot.result.ok_or_else(|| {
            ProtocolError::UnexpectedResponse {
                expected: "a result for a complete request",
            }
            .into()
        })
    }

    fn failed(&self, snapshot: RequestSnapshot) -> RequestError {
        RequestError::Failed(
            self.id,
            snapshot
                .error
                .unwrap_or_else(|| "request errored".to_string()),
        )
    }
}
