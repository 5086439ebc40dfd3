use super::config::BackendConfig;
use super::error::{BackendError, TaskError};
use super::resources::ComputeResources;
use crate::core::models::ids::WorkerId;
use slotmap::SlotMap;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What a running task sees of the worker it was assigned to.
pub struct WorkerContext {
    id: WorkerId,
    index: usize,
    resources: ComputeResources,
    pool: rayon::ThreadPool,
}

impl WorkerContext {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn resources(&self) -> &ComputeResources {
        &self.resources
    }
}

/// A queued unit of work. Called with the worker's context when it runs, or with `None` when
/// the backend shuts down before it was picked up.
type Job = Box<dyn FnOnce(Option<&WorkerContext>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolStatus {
    Idle,
    Running,
    Stopped,
}

struct QueueState {
    jobs: VecDeque<Job>,
    status: PoolStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Busy,
}

#[derive(Debug, Clone)]
struct WorkerSlot {
    index: usize,
    resources: ComputeResources,
    state: WorkerState,
    completed: usize,
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStatus {
    pub id: WorkerId,
    pub index: usize,
    pub resources: ComputeResources,
    pub state: WorkerState,
    pub completed: usize,
}

struct Shared {
    queue: Mutex<QueueState>,
    available: Condvar,
    slots: Mutex<SlotMap<WorkerId, WorkerSlot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A fixed-size pool of workers, each owning an independent copy of the configured
/// [`ComputeResources`].
///
/// Tasks are handed to idle workers in submission order; a worker runs one task at a time
/// inside its own rayon pool sized to its thread count. A task that fails or panics is
/// reported on its own handle only and the worker carries on.
pub struct ComputeBackend {
    config: BackendConfig,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ComputeBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                queue: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    status: PoolStatus::Idle,
                }),
                available: Condvar::new(),
                slots: Mutex::new(SlotMap::with_key()),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Provisions the workers. A stopped backend may be started again.
    pub fn start(&self) -> Result<(), BackendError> {
        if self.config.number_of_workers == 0 {
            return Err(BackendError::NoWorkers);
        }
        let mut workers = lock(&self.workers);
        {
            let queue = lock(&self.shared.queue);
            if queue.status == PoolStatus::Running {
                return Err(BackendError::AlreadyStarted);
            }
        }

        let resources = &self.config.resources_per_worker;
        let mut contexts = Vec::with_capacity(self.config.number_of_workers);
        {
            let mut slots = lock(&self.shared.slots);
            slots.clear();
            for index in 0..self.config.number_of_workers {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(resources.number_of_threads())
                    .thread_name(move |thread| format!("propest-worker-{}-{}", index, thread))
                    .build()
                    .map_err(|e| BackendError::ThreadPool {
                        worker: index,
                        message: e.to_string(),
                    })?;
                let id = slots.insert(WorkerSlot {
                    index,
                    resources: resources.clone(),
                    state: WorkerState::Idle,
                    completed: 0,
                });
                contexts.push(WorkerContext {
                    id,
                    index,
                    resources: resources.clone(),
                    pool,
                });
            }
        }

        lock(&self.shared.queue).status = PoolStatus::Running;

        for context in contexts {
            let shared = Arc::clone(&self.shared);
            let spawned = std::thread::Builder::new()
                .name(format!("propest-worker-{}", context.index))
                .spawn(move || worker_loop(shared, context));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(workers);
                    self.stop();
                    return Err(BackendError::Spawn(e));
                }
            }
        }

        info!(
            workers = self.config.number_of_workers,
            resources = %resources,
            "Compute backend started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.queue).status == PoolStatus::Running
    }

    /// Queues a task and runs `on_complete` with its outcome on the worker thread.
    ///
    /// If the backend shuts down before a worker picks the task up, `on_complete` receives
    /// [`TaskError::BackendShutdown`]. When the backend is not running the task is rejected
    /// and `on_complete` is dropped without being called.
    pub fn submit_then<T, F, C>(&self, task: F, on_complete: C) -> Result<(), BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&WorkerContext) -> Result<T, TaskError> + Send + 'static,
        C: FnOnce(Result<T, TaskError>) + Send + 'static,
    {
        let job: Job = Box::new(move |worker| {
            let outcome = match worker {
                Some(context) => run_guarded(context, task),
                None => Err(TaskError::BackendShutdown),
            };
            if panic::catch_unwind(AssertUnwindSafe(|| on_complete(outcome))).is_err() {
                error!("Task completion callback panicked");
            }
        });

        let mut queue = lock(&self.shared.queue);
        if queue.status != PoolStatus::Running {
            return Err(BackendError::NotRunning);
        }
        queue.jobs.push_back(job);
        debug!(queued = queue.jobs.len(), "Task queued");
        drop(queue);
        self.shared.available.notify_one();
        Ok(())
    }

    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&WorkerContext) -> Result<T, TaskError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        self.submit_then(task, move |outcome| {
            let _ = sender.send(outcome);
        })?;
        Ok(TaskHandle { receiver })
    }

    pub fn queued_tasks(&self) -> usize {
        lock(&self.shared.queue).jobs.len()
    }

    pub fn worker_states(&self) -> Vec<WorkerStatus> {
        let slots = lock(&self.shared.slots);
        let mut states: Vec<WorkerStatus> = slots
            .iter()
            .map(|(id, slot)| WorkerStatus {
                id,
                index: slot.index,
                resources: slot.resources.clone(),
                state: slot.state,
                completed: slot.completed,
            })
            .collect();
        states.sort_by_key(|s| s.index);
        states
    }

    /// Stops accepting work, fails every queued task with [`TaskError::BackendShutdown`], lets
    /// running tasks finish and joins the workers. Safe to call more than once.
    pub fn stop(&self) {
        let abandoned: Vec<Job> = {
            let mut queue = lock(&self.shared.queue);
            if queue.status != PoolStatus::Running {
                return;
            }
            queue.status = PoolStatus::Stopped;
            queue.jobs.drain(..).collect()
        };
        self.shared.available.notify_all();

        if !abandoned.is_empty() {
            warn!(
                count = abandoned.len(),
                "Abandoning queued tasks on shutdown"
            );
        }
        for job in abandoned {
            job(None);
        }

        let handles: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        let current = std::thread::current().id();
        for handle in handles {
            // A worker dropping the last reference to its own backend cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("Worker thread terminated abnormally");
            }
        }
        info!("Compute backend stopped");
    }
}

impl Drop for ComputeBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_guarded<T, F>(context: &WorkerContext, task: F) -> Result<T, TaskError>
where
    T: Send,
    F: FnOnce(&WorkerContext) -> Result<T, TaskError> + Send,
{
    context.pool.install(|| {
        panic::catch_unwind(AssertUnwindSafe(|| task(context))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(worker = context.index, %message, "Task panicked");
            Err(TaskError::WorkerFault(message))
        })
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn set_slot_state(shared: &Shared, id: WorkerId, state: WorkerState) {
    if let Some(slot) = lock(&shared.slots).get_mut(id) {
        if state == WorkerState::Idle && slot.state == WorkerState::Busy {
            slot.completed += 1;
        }
        slot.state = state;
    }
}

fn worker_loop(shared: Arc<Shared>, context: WorkerContext) {
    debug!(worker = context.index, "Worker started");
    loop {
        let job = {
            let mut queue = lock(&shared.queue);
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break Some(job);
                }
                if queue.status != PoolStatus::Running {
                    break None;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        let Some(job) = job else { break };

        set_slot_state(&shared, context.id, WorkerState::Busy);
        job(Some(&context));
        set_slot_state(&shared, context.id, WorkerState::Idle);
    }
    debug!(worker = context.index, "Worker exiting");
}

/// Resolves to the outcome of one submitted task.
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub fn wait(self) -> Result<T, TaskError> {
        self.receiver
            .recv()
            .unwrap_or(Err(TaskError::BackendShutdown))
    }

    /// `None` if the task is still running when the timeout expires.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(TaskError::BackendShutdown)),
        }
    }

    pub fn try_result(&self) -> Option<Result<T, TaskError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(TaskError::BackendShutdown)),
        }
    }
}
