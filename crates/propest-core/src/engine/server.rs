use super::backend::{ComputeBackend, WorkerContext};
use super::config::ServerConfig;
use super::error::{ServerError, TaskError};
use super::forcefield::ForceFieldSource;
use super::layers::{LayerRegistry, SimulationJob};
use super::options::RequestOptions;
use super::protocol::{self, ClientMessage, ServerMessage};
use super::results::{
    PropertyFailure, RequestProgress, RequestResult, RequestSnapshot, RequestStatus,
};
use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::ids::{PropertyId, RequestId};
use crate::core::models::property::PhysicalProperty;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Serve on background threads and return immediately.
    Background,
    /// Serve on the calling thread until [`EvaluatorServer::shutdown`] is called.
    Blocking,
}

enum Outcome {
    Estimated(PhysicalProperty),
    Failed(PropertyFailure),
}

struct RequestRecord {
    status: RequestStatus,
    total: usize,
    completed: usize,
    outstanding: usize,
    properties: Vec<PhysicalProperty>,
    outcomes: Vec<Option<Outcome>>,
    result: Option<RequestResult>,
    error: Option<String>,
}

impl RequestRecord {
    fn errored(total: usize, message: String) -> Self {
        Self {
            status: RequestStatus::Errored,
            total,
            completed: 0,
            outstanding: 0,
            properties: Vec::new(),
            outcomes: Vec::new(),
            result: None,
            error: Some(message),
        }
    }

    fn fail(&mut self, request_id: RequestId, message: String) {
        error!(%request_id, %message, "Request errored");
        self.status = RequestStatus::Errored;
        self.error = Some(message);
        self.properties.clear();
        self.outcomes.clear();
    }

    /// Assembles the result in submission order once nothing is outstanding.
    fn finalize(&mut self, request_id: RequestId) {
        let properties = std::mem::take(&mut self.properties);
        let outcomes = std::mem::take(&mut self.outcomes);
        let mut result = RequestResult::default();

        for (property, outcome) in properties.into_iter().zip(outcomes) {
            let added = match outcome {
                Some(Outcome::Estimated(estimated)) => {
                    result.estimated_properties.add_property(estimated)
                }
                Some(Outcome::Failed(failure)) => {
                    result.exceptions.push(failure);
                    result.unsuccessful_properties.add_property(property)
                }
                None => continue,
            };
            if let Err(e) = added {
                self.fail(request_id, e.to_string());
                return;
            }
        }

        info!(
            %request_id,
            estimated = result.estimated_properties.len(),
            failed = result.unsuccessful_properties.len(),
            "Request complete"
        );
        self.status = RequestStatus::Complete;
        self.result = Some(result);
    }

    fn snapshot(&self, request_id: RequestId) -> RequestSnapshot {
        RequestSnapshot {
            request_id,
            status: self.status,
            progress: RequestProgress {
                total: self.total,
                completed: self.completed,
            },
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

#[derive(Default)]
struct ListenerState {
    started: bool,
    shutdown: bool,
    local_addr: Option<SocketAddr>,
    accept_thread: Option<JoinHandle<()>>,
}

struct ServerInner {
    config: ServerConfig,
    backend: Arc<ComputeBackend>,
    layers: LayerRegistry,
    requests: Mutex<HashMap<RequestId, RequestRecord>>,
    listener: Mutex<ListenerState>,
    stopped: Condvar,
    shutdown: AtomicBool,
}

/// Accepts estimation requests, fans each property out to the compute backend as one task,
/// and aggregates the outcomes into a per-request result that clients poll for.
///
/// The server is a cheap handle; clones share the same request table and listener.
#[derive(Clone)]
pub struct EvaluatorServer {
    inner: Arc<ServerInner>,
}

impl EvaluatorServer {
    pub fn new(backend: Arc<ComputeBackend>, layers: LayerRegistry, config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                backend,
                layers,
                requests: Mutex::new(HashMap::new()),
                listener: Mutex::new(ListenerState::default()),
                stopped: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.inner.layers
    }

    /// The address the TCP listener is bound to, once started with a port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.inner.listener).local_addr
    }

    pub fn start(&self, mode: StartMode) -> Result<(), ServerError> {
        let listener = {
            let mut state = lock(&self.inner.listener);
            if state.started {
                return Err(ServerError::AlreadyStarted);
            }
            let listener = match self.inner.config.port {
                Some(port) => {
                    let address = format!("{}:{}", self.inner.config.bind_address, port);
                    let listener = TcpListener::bind(&address)
                        .map_err(|source| ServerError::Bind { address, source })?;
                    listener
                        .set_nonblocking(true)
                        .map_err(ServerError::Listener)?;
                    state.local_addr = listener.local_addr().ok();
                    Some(listener)
                }
                None => None,
            };
            state.started = true;
            listener
        };

        match &listener {
            Some(l) => info!(address = ?l.local_addr().ok(), ?mode, "Evaluator server listening"),
            None => info!(?mode, "Evaluator server started (in-process only)"),
        }

        match (mode, listener) {
            (StartMode::Background, Some(listener)) => {
                let inner = Arc::clone(&self.inner);
                let handle = std::thread::Builder::new()
                    .name("propest-server".to_string())
                    .spawn(move || accept_loop(&inner, listener))
                    .map_err(ServerError::Listener)?;
                lock(&self.inner.listener).accept_thread = Some(handle);
            }
            (StartMode::Background, None) => {}
            (StartMode::Blocking, Some(listener)) => accept_loop(&self.inner, listener),
            (StartMode::Blocking, None) => {
                let mut state = lock(&self.inner.listener);
                while !state.shutdown {
                    state = self
                        .inner
                        .stopped
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        Ok(())
    }

    /// Stops the listener and wakes a blocking [`start`](Self::start). Requests already
    /// submitted keep running on the backend.
    pub fn shutdown(&self) {
        let handle = {
            let mut state = lock(&self.inner.listener);
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            self.inner.shutdown.store(true, Ordering::SeqCst);
            state.accept_thread.take()
        };
        self.inner.stopped.notify_all();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                error!("Server accept thread terminated abnormally");
            }
        }
        info!("Evaluator server shut down");
    }

    /// Registers a request and dispatches its properties. Request-level faults do not fail
    /// the call; they produce a request that is already errored.
    pub fn submit(
        &self,
        dataset: PhysicalPropertyDataSet,
        force_field: ForceFieldSource,
        options: RequestOptions,
    ) -> RequestId {
        let inner = &self.inner;
        let request_id = RequestId::generate();
        let total = dataset.len();
        info!(%request_id, properties = total, "Received estimation request");

        if let Err(e) = options.validate() {
            return inner.reject(request_id, total, format!("invalid request options: {}", e));
        }
        for layer in options.calculation_layers() {
            if !inner.layers.contains(layer) {
                warn!(
                    %request_id,
                    %layer,
                    "Calculation layer not available on this server, skipping"
                );
            }
        }
        if !options
            .calculation_layers()
            .iter()
            .any(|layer| inner.layers.contains(layer))
        {
            return inner.reject(
                request_id,
                total,
                format!(
                    "none of the requested calculation layers ({}) are available on this server",
                    options.calculation_layers().join(", ")
                ),
            );
        }
        if !inner.backend.is_running() {
            return inner.reject(
                request_id,
                total,
                "compute backend is not accepting work".to_string(),
            );
        }

        let properties = dataset.into_properties();
        let mut outcomes = Vec::with_capacity(properties.len());
        let mut dispatch = Vec::new();
        for (index, property) in properties.iter().enumerate() {
            match options.select_layer(&property.property_type, |l| inner.layers.contains(l)) {
                Some((layer, schema)) => {
                    outcomes.push(None);
                    dispatch.push((index, layer.to_string(), schema.clone(), property.clone()));
                }
                None => {
                    warn!(
                        %request_id,
                        property = %property.id,
                        property_type = %property.property_type,
                        "No applicable calculation layer"
                    );
                    outcomes.push(Some(Outcome::Failed(PropertyFailure::no_applicable_layer(
                        property.id.clone(),
                        &property.property_type,
                    ))));
                }
            }
        }

        {
            let mut record = RequestRecord {
                status: RequestStatus::Pending,
                total,
                completed: total - dispatch.len(),
                outstanding: dispatch.len(),
                properties,
                outcomes,
                result: None,
                error: None,
            };
            if record.outstanding == 0 {
                record.finalize(request_id);
            }
            lock(&inner.requests).insert(request_id, record);
        }

        // Workers may resolve tasks before this loop ends.
        if let Some(record) = lock(&inner.requests).get_mut(&request_id) {
            if record.status == RequestStatus::Pending {
                record.status = RequestStatus::Running;
            }
        }

        let force_field = Arc::new(force_field);
        for (index, layer_name, schema, property) in dispatch {
            let Some(layer) = inner.layers.get(&layer_name).cloned() else {
                continue;
            };
            debug!(%request_id, property = %property.id, layer = %layer_name, "Dispatching task");

            let force_field = Arc::clone(&force_field);
            let property_id = property.id.clone();
            let task = move |worker: &WorkerContext| -> Result<PhysicalProperty, TaskError> {
                let estimated = layer.execute(&SimulationJob {
                    property: &property,
                    schema: &schema,
                    force_field: &force_field,
                    resources: worker.resources(),
                })?;
                if estimated.id != property.id {
                    return Err(TaskError::InvalidOutput(format!(
                        "layer returned property '{}' for '{}'",
                        estimated.id, property.id
                    )));
                }
                Ok(estimated)
            };
            let server: Weak<ServerInner> = Arc::downgrade(&self.inner);
            let on_complete = move |outcome: Result<PhysicalProperty, TaskError>| {
                if let Some(server) = server.upgrade() {
                    server.record_outcome(request_id, index, &layer_name, property_id, outcome);
                }
            };

            if let Err(e) = inner.backend.submit_then(task, on_complete) {
                if let Some(record) = lock(&inner.requests).get_mut(&request_id) {
                    if !record.status.is_terminal() {
                        record.fail(request_id, format!("compute backend rejected work: {}", e));
                    }
                }
                return request_id;
            }
        }

        request_id
    }

    pub fn query(&self, request_id: RequestId) -> Result<RequestSnapshot, ServerError> {
        lock(&self.inner.requests)
            .get(&request_id)
            .map(|record| record.snapshot(request_id))
            .ok_or(ServerError::UnknownRequest(request_id))
    }

    /// Forgets a request. Tasks still running for it finish but their outcomes are dropped.
    pub fn release(&self, request_id: RequestId) -> Result<(), ServerError> {
        match lock(&self.inner.requests).remove(&request_id) {
            Some(_) => {
                debug!(%request_id, "Request released");
                Ok(())
            }
            None => Err(ServerError::UnknownRequest(request_id)),
        }
    }

    pub fn request_count(&self) -> usize {
        lock(&self.inner.requests).len()
    }

    pub(crate) fn handle(&self, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::Submit {
                dataset,
                force_field,
                options,
            } => ServerMessage::Submitted {
                request_id: self.submit(dataset, force_field, options),
            },
            ClientMessage::Query { request_id } => match self.query(request_id) {
                Ok(snapshot) => ServerMessage::Snapshot { snapshot },
                Err(_) => ServerMessage::UnknownRequest { request_id },
            },
            ClientMessage::Release { request_id } => match self.release(request_id) {
                Ok(()) => ServerMessage::Released { request_id },
                Err(_) => ServerMessage::UnknownRequest { request_id },
            },
        }
    }
}

impl ServerInner {
    fn reject(&self, request_id: RequestId, total: usize, message: String) -> RequestId {
        error!(%request_id, %message, "Request errored");
        lock(&self.requests).insert(request_id, RequestRecord::errored(total, message));
        request_id
    }

    fn record_outcome(
        &self,
        request_id: RequestId,
        index: usize,
        layer: &str,
        property_id: PropertyId,
        outcome: Result<PhysicalProperty, TaskError>,
    ) {
        let mut requests = lock(&self.requests);
        let Some(record) = requests.get_mut(&request_id) else {
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        let outcome = match outcome {
            Ok(estimated) => Outcome::Estimated(estimated),
            Err(e) => {
                warn!(
                    %request_id,
                    property = %property_id,
                    %layer,
                    error = %e,
                    "Property estimation failed"
                );
                Outcome::Failed(PropertyFailure::from_task_error(property_id, layer, &e))
            }
        };
        if let Some(slot) = record.outcomes.get_mut(index) {
            if slot.is_none() {
                *slot = Some(outcome);
                record.completed += 1;
                record.outstanding = record.outstanding.saturating_sub(1);
            }
        }
        if record.outstanding == 0 {
            record.finalize(request_id);
        }
    }
}

fn accept_loop(inner: &Arc<ServerInner>, listener: TcpListener) {
    let server = EvaluatorServer {
        inner: Arc::clone(inner),
    };
    while !inner.shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "Accepted connection");
                let server = server.clone();
                let spawned = std::thread::Builder::new()
                    .name("propest-connection".to_string())
                    .spawn(move || handle_connection(&server, stream));
                if let Err(e) = spawned {
                    error!(error = %e, "Failed to spawn connection thread");
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                warn!(error = %e, "Accept failed");
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    debug!("Accept loop finished");
}

fn handle_connection(server: &EvaluatorServer, mut stream: TcpStream) {
    if let Err(e) = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(CONNECTION_TIMEOUT)))
    {
        warn!(error = %e, "Failed to configure connection");
        return;
    }
    let response = match protocol::read_frame::<_, ClientMessage>(&mut stream) {
        Ok(message) => server.handle(message),
        Err(e) => {
            warn!(error = %e, "Rejected malformed request frame");
            ServerMessage::Error {
                message: e.to_string(),
            }
        }
    };
    if let Err(e) = protocol::write_frame(&mut stream, &response) {
        warn!(error = %e, "Failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::layers::{Estimate, SimulationEngine, SimulationLayer};
    use crate::engine::options::CalculationSchema;
    use crate::engine::results::FailureKind;
    use crate::engine::testing::{self, MockEngine};
    use std::time::Instant;

    fn server_with(engine: MockEngine, workers: usize) -> (EvaluatorServer, Arc<ComputeBackend>) {
        let backend = testing::started_backend(workers);
        let server = EvaluatorServer::new(
            Arc::clone(&backend),
            testing::layers(engine),
            ServerConfig::in_process(),
        );
        (server, backend)
    }

    fn force_field() -> ForceFieldSource {
        ForceFieldSource::new("openff-2.0.0.offxml", "<SMIRNOFF/>")
    }

    fn wait_terminal(server: &EvaluatorServer, id: RequestId) -> RequestSnapshot {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let snapshot = server.query(id).unwrap();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            assert!(Instant::now() < deadline, "request did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn matched_properties_complete_in_submission_order() {
        let (server, _backend) = server_with(MockEngine::new(), 3);
        let dataset = testing::density_and_mixing();
        let submitted: Vec<PropertyId> = dataset.identifiers().cloned().collect();

        let id = server.submit(
            dataset,
            force_field(),
            testing::simulation_options(&["Density", "EnthalpyOfMixing"]),
        );
        let snapshot = wait_terminal(&server, id);

        assert_eq!(snapshot.status, RequestStatus::Complete);
        assert_eq!(snapshot.error, None);
        assert_eq!(
            snapshot.progress,
            RequestProgress {
                total: 2,
                completed: 2
            }
        );
        let result = snapshot.result.unwrap();
        let estimated: Vec<PropertyId> =
            result.estimated_properties.identifiers().cloned().collect();
        assert_eq!(estimated, submitted);
        assert!(result.exceptions.is_empty());
        assert!(
            result
                .estimated_properties
                .iter()
                .all(|p| p.source.is_computed())
        );
    }

    #[test]
    fn property_without_schema_fails_without_erroring_request() {
        let (server, _backend) = server_with(MockEngine::new(), 1);
        let property = testing::osmotic_coefficient();
        let property_id = property.id.clone();
        let dataset = PhysicalPropertyDataSet::from_properties([property]).unwrap();

        let id = server.submit(
            dataset,
            force_field(),
            testing::simulation_options(&["Density"]),
        );
        let snapshot = wait_terminal(&server, id);

        assert_eq!(snapshot.status, RequestStatus::Complete);
        assert_eq!(snapshot.error, None);
        let result = snapshot.result.unwrap();
        assert!(result.estimated_properties.is_empty());
        assert_eq!(result.unsuccessful_properties.len(), 1);
        assert_eq!(result.exceptions.len(), 1);
        assert_eq!(result.exceptions[0].property_id, property_id);
        assert_eq!(result.exceptions[0].kind, FailureKind::NoApplicableLayer);
    }

    #[test]
    fn simulation_failures_and_panics_are_per_property() {
        let engine = MockEngine::new().panicking_on("O").failing_on("CCCO");
        let (server, backend) = server_with(engine, 2);
        let dataset = PhysicalPropertyDataSet::from_properties([
            testing::density("CCO", 0.785),
            testing::density("O", 0.997),
            testing::density("CCCO", 0.80),
        ])
        .unwrap();

        let id = server.submit(
            dataset,
            force_field(),
            testing::simulation_options(&["Density"]),
        );
        let result = wait_terminal(&server, id).result.unwrap();

        assert_eq!(result.estimated_properties.len(), 1);
        assert_eq!(result.unsuccessful_properties.len(), 2);
        let kinds: Vec<FailureKind> = result.exceptions.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            [FailureKind::WorkerFault, FailureKind::SimulationFailed]
        );
        assert!(backend.is_running());
    }

    #[test]
    fn repeated_queries_of_terminal_request_are_identical() {
        let (server, _backend) = server_with(MockEngine::new(), 2);
        let id = server.submit(
            testing::density_and_mixing(),
            force_field(),
            testing::simulation_options(&["Density", "EnthalpyOfMixing"]),
        );
        let first = wait_terminal(&server, id);
        let second = server.query(id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unavailable_layers_error_the_request() {
        let (server, _backend) = server_with(MockEngine::new(), 1);
        let mut options = RequestOptions::new();
        options
            .set_calculation_layers(["ReweightingLayer"])
            .unwrap();
        options
            .add_schema(
                "ReweightingLayer",
                "Density",
                CalculationSchema::simulation(128),
            )
            .unwrap();

        let id = server.submit(testing::density_and_mixing(), force_field(), options);
        let snapshot = server.query(id).unwrap();

        assert_eq!(snapshot.status, RequestStatus::Errored);
        assert!(snapshot.error.unwrap().contains("ReweightingLayer"));
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn stopped_backend_errors_the_request() {
        let (server, backend) = server_with(MockEngine::new(), 1);
        backend.stop();
        let id = server.submit(
            testing::density_and_mixing(),
            force_field(),
            testing::simulation_options(&["Density"]),
        );
        assert_eq!(server.query(id).unwrap().status, RequestStatus::Errored);
    }

    #[test]
    fn request_is_running_until_every_task_resolves() {
        let (engine, gate) = MockEngine::gated();
        let (server, _backend) = server_with(engine, 2);
        let id = server.submit(
            testing::density_and_mixing(),
            force_field(),
            testing::simulation_options(&["Density", "EnthalpyOfMixing"]),
        );

        let snapshot = server.query(id).unwrap();
        assert_eq!(snapshot.status, RequestStatus::Running);
        assert!(snapshot.result.is_none());

        gate.send(()).unwrap();
        gate.send(()).unwrap();
        assert_eq!(wait_terminal(&server, id).status, RequestStatus::Complete);
    }

    /// Records the status of every known request each time it runs a task.
    struct StatusRecorder {
        server: Arc<std::sync::OnceLock<EvaluatorServer>>,
        seen: Arc<Mutex<Vec<RequestStatus>>>,
    }

    impl SimulationEngine for StatusRecorder {
        fn estimate(&self, job: &SimulationJob<'_>) -> Result<Estimate, TaskError> {
            if let Some(server) = self.server.get() {
                let statuses = lock(&server.inner.requests)
                    .values()
                    .map(|record| record.status)
                    .collect::<Vec<_>>();
                lock(&self.seen).extend(statuses);
            }
            Ok(Estimate {
                value: job.property.value.clone(),
                uncertainty: None,
            })
        }
    }

    #[test]
    fn request_is_running_before_any_task_executes() {
        let slot = Arc::new(std::sync::OnceLock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = StatusRecorder {
            server: Arc::clone(&slot),
            seen: Arc::clone(&seen),
        };
        let backend = testing::started_backend(4);
        let server = EvaluatorServer::new(
            Arc::clone(&backend),
            LayerRegistry::new().with_layer(Arc::new(SimulationLayer::new(Arc::new(engine)))),
            ServerConfig::in_process(),
        );
        assert!(slot.set(server.clone()).is_ok());

        let dataset = PhysicalPropertyDataSet::from_properties(
            ["CCO", "O", "CCCO", "CO", "CCCCO", "CC(C)O"]
                .into_iter()
                .map(|smiles| testing::density(smiles, 0.8)),
        )
        .unwrap();
        let id = server.submit(
            dataset,
            force_field(),
            testing::simulation_options(&["Density"]),
        );
        assert_eq!(wait_terminal(&server, id).status, RequestStatus::Complete);

        let seen = lock(&seen);
        assert_eq!(seen.len(), 6);
        assert!(seen.iter().all(|status| *status == RequestStatus::Running));
    }

    #[test]
    fn release_forgets_the_request() {
        let (server, _backend) = server_with(MockEngine::new(), 1);
        let id = server.submit(
            PhysicalPropertyDataSet::new(),
            force_field(),
            RequestOptions::new(),
        );
        assert_eq!(server.query(id).unwrap().status, RequestStatus::Complete);

        server.release(id).unwrap();
        assert!(matches!(
            server.query(id),
            Err(ServerError::UnknownRequest(_))
        ));
        assert!(matches!(
            server.release(id),
            Err(ServerError::UnknownRequest(_))
        ));
    }

    #[test]
    fn blocking_start_returns_after_shutdown() {
        let (server, _backend) = server_with(MockEngine::new(), 1);
        let handle = {
            let server = server.clone();
            std::thread::spawn(move || server.start(StartMode::Blocking))
        };
        std::thread::sleep(Duration::from_millis(50));
        server.shutdown();
        assert!(handle.join().unwrap().is_ok());
        assert!(matches!(
            server.start(StartMode::Background),
            Err(ServerError::AlreadyStarted)
        ));
    }
}
