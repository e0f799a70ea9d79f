//! The uniform worker contract: a long-running thread- or process-backed
//! task with a cooperative stop signal and a lifecycle event stream.
//! Grounded on `original_source/src/spoc/workers.py` (`AbstractWorker`,
//! `BaseThread`, `BaseProcess`), re-architected per the "Thread- vs
//! process-worker polymorphism" design note: a `StopSignal` capability and a
//! `BackingTask` capability, injected by the concrete constructor, instead of
//! multiple inheritance from `threading.Thread`/`multiprocessing.Process`.

use std::future::Future;
use std::pin::Pin;
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{NucleusError, Result};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A primitive observable from the worker's own execution context: a thread
/// worker uses an in-process flag, a process worker a cross-process one.
pub trait StopSignal: Send + Sync {
    fn set(&self);
    fn is_set(&self) -> bool;
}

/// In-process stop flag backing `ThreadWorker` (and, for this crate's
/// in-process process-simulation, `ProcessWorker` too — see the module docs
/// on the cross-process limitation this implies).
#[derive(Clone, Default)]
pub struct AtomicStopSignal(Arc<AtomicBool>);

impl AtomicStopSignal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StopSignal for AtomicStopSignal {
    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The handle a concrete worker subtype uses to join and, if supported,
/// forcefully terminate its backing execution context.
pub trait BackingTask: Send {
    /// Blocks up to `timeout`; returns true if the task finished in time.
    fn join(&mut self, timeout: Duration) -> bool;
    /// Forceful termination, if the backing mechanism supports it.
    fn terminate(&mut self);
}

struct ThreadTask(Option<thread::JoinHandle<()>>);

impl BackingTask for ThreadTask {
    fn join(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match &self.0 {
                Some(h) if h.is_finished() => {
                    let _ = self.0.take().unwrap().join();
                    return true;
                }
                Some(_) => {
                    if Instant::now() >= deadline {
                        return false;
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                None => return true,
            }
        }
    }

    fn terminate(&mut self) {
        // A std::thread cannot be forcefully killed; this is a documented
        // no-op, matching the source's `terminate()` being a no-op for
        // `threading.Thread`-backed workers (only `multiprocessing.Process`
        // exposes a real `terminate`).
    }
}

struct ProcessTask(Child);

impl BackingTask for ProcessTask {
    fn join(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.0.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return false;
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => return true,
            }
        }
    }

    fn terminate(&mut self) {
        let _ = self.0.kill();
    }
}

/// Events delivered to a worker's `lifecycle` callback.
pub enum LifecycleEvent {
    Startup,
    Shutdown,
    Error(NucleusError),
}

type SyncBody = Arc<dyn Fn(Arc<dyn StopSignal>) -> Result<()> + Send + Sync>;
type AsyncBody = Arc<dyn Fn(Arc<dyn StopSignal>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// The user-supplied worker body, sync or async, bridged at the call site
/// (never via `iscoroutine`-style introspection).
#[derive(Clone)]
pub enum Body {
    Sync(SyncBody),
    Async(AsyncBody),
}

impl Body {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Arc<dyn StopSignal>) -> Result<()> + Send + Sync + 'static,
    {
        Body::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<dyn StopSignal>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Body::Async(Arc::new(move |signal| Box::pin(f(signal))))
    }

    fn run(&self, signal: Arc<dyn StopSignal>) -> Result<()> {
        match self {
            Body::Sync(f) => f(signal),
            Body::Async(f) => {
                let fut = f(signal);
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => handle.block_on(fut),
                    Err(_) => tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed to start fallback runtime for worker body")
                        .block_on(fut),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Stopping,
    Stopped,
}

type SyncSink = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;
type AsyncSink = Arc<dyn Fn(LifecycleEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// The host's `lifecycle` callback, sync or async, bridged at the call site
/// the same way `Body` bridges a worker's `main`/`setup`/`teardown`.
#[derive(Clone)]
pub enum LifecycleSink {
    Sync(SyncSink),
    Async(AsyncSink),
}

impl LifecycleSink {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(LifecycleEvent) + Send + Sync + 'static,
    {
        LifecycleSink::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        LifecycleSink::Async(Arc::new(move |event| Box::pin(f(event))))
    }

    fn emit(&self, event: LifecycleEvent) {
        match self {
            LifecycleSink::Sync(f) => f(event),
            LifecycleSink::Async(f) => {
                let fut = f(event);
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => handle.block_on(fut),
                    Err(_) => tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed to start fallback runtime for lifecycle sink")
                        .block_on(fut),
                }
            }
        }
    }
}

type Spawner = Box<dyn FnOnce() -> Box<dyn BackingTask> + Send>;

/// A long-running task with a cooperative stop signal and a lifecycle event
/// stream. States transition monotonically Created -> Running -> Stopping ->
/// Stopped; once Stopped the worker is not reusable.
pub struct Worker {
    name: String,
    stop_signal: Arc<dyn StopSignal>,
    state: Mutex<WorkerState>,
    task: Mutex<Option<Box<dyn BackingTask>>>,
    spawner: Mutex<Option<Spawner>>,
}

fn run_body(
    stop_signal: Arc<dyn StopSignal>,
    main: Body,
    setup: Option<Body>,
    teardown: Option<Body>,
    lifecycle: Option<LifecycleSink>,
) {
    let emit = |event: LifecycleEvent| {
        if let Some(sink) = &lifecycle {
            sink.emit(event);
        }
    };

    emit(LifecycleEvent::Startup);

    if let Some(setup) = &setup {
        if let Err(e) = setup.run(stop_signal.clone()) {
            emit(LifecycleEvent::Error(e));
        }
    }

    if let Err(e) = main.run(stop_signal.clone()) {
        emit(LifecycleEvent::Error(e));
    }

    if let Some(teardown) = &teardown {
        let _ = teardown.run(stop_signal.clone());
    }

    emit(LifecycleEvent::Shutdown);
}

impl Worker {
    /// A thread-backed worker. `main`/`setup`/`teardown` run on a single
    /// spawned `std::thread`; the stop signal is an in-process atomic flag.
    pub fn thread(
        name: impl Into<String>,
        main: Body,
        setup: Option<Body>,
        teardown: Option<Body>,
        lifecycle: Option<LifecycleSink>,
    ) -> Self {
        let stop_signal = Arc::new(AtomicStopSignal::new());
        let signal_for_spawn: Arc<dyn StopSignal> = stop_signal.clone();
        let spawner: Spawner = Box::new(move || {
            let handle = thread::spawn(move || {
                run_body(signal_for_spawn, main, setup, teardown, lifecycle);
            });
            Box::new(ThreadTask(Some(handle)))
        });

        Worker {
            name: name.into(),
            stop_signal,
            state: Mutex::new(WorkerState::Created),
            task: Mutex::new(None),
            spawner: Mutex::new(Some(spawner)),
        }
    }

    /// A process-backed worker wrapping an already-spawned `std::process::Child`.
    /// The stop signal is still in-process (observed by the supervisor, not
    /// by the child itself); forceful termination kills the OS process.
    pub fn process(name: impl Into<String>, child: Child) -> Self {
        let stop_signal = Arc::new(AtomicStopSignal::new());
        let spawner: Spawner = Box::new(move || Box::new(ProcessTask(child)));
        Worker {
            name: name.into(),
            stop_signal,
            state: Mutex::new(WorkerState::Created),
            task: Mutex::new(None),
            spawner: Mutex::new(Some(spawner)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != WorkerState::Created {
            return;
        }
        let spawner = self.spawner.lock().unwrap().take();
        if let Some(spawner) = spawner {
            *self.task.lock().unwrap() = Some(spawner());
        }
        *state = WorkerState::Running;
    }

    /// Idempotent: sets the stop signal exactly once.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == WorkerState::Running {
            self.stop_signal.set();
            *state = WorkerState::Stopping;
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop_signal.is_set()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap()
    }

    /// Blocks up to `timeout`; terminates forcefully if still alive after.
    pub fn join(&self, timeout: Duration) {
        let finished = match self.task.lock().unwrap().as_mut() {
            Some(task) => task.join(timeout),
            None => true,
        };
        if !finished {
            if let Some(task) = self.task.lock().unwrap().as_mut() {
                task.terminate();
            }
        }
        *self.state.lock().unwrap() = WorkerState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn counter_worker_runs_until_stopped() {
        let counter = Arc::new(StdMutex::new(0u32));
        let events = Arc::new(StdMutex::new(Vec::new()));

        let counter_body = counter.clone();
        let main = Body::sync(move |signal| {
            while !signal.is_set() {
                *counter_body.lock().unwrap() += 1;
                thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        });

        let events_sink = events.clone();
        let lifecycle = LifecycleSink::sync(move |event| {
            let label = match event {
                LifecycleEvent::Startup => "startup",
                LifecycleEvent::Shutdown => "shutdown",
                LifecycleEvent::Error(_) => "error",
            };
            events_sink.lock().unwrap().push(label);
        });

        let worker = Worker::thread("counter", main, None, None, Some(lifecycle));
        worker.start();
        thread::sleep(Duration::from_millis(50));
        worker.stop();
        worker.join(Duration::from_secs(1));

        let count = *counter.lock().unwrap();
        assert!((3..=9).contains(&count), "count was {count}");
        assert_eq!(*events.lock().unwrap(), vec!["startup", "shutdown"]);
    }

    #[test]
    fn error_from_main_is_delivered_then_teardown_runs() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let teardown_ran = Arc::new(StdMutex::new(false));

        let main = Body::sync(|_signal| Err(NucleusError::Configuration("boom".into())));

        let teardown_flag = teardown_ran.clone();
        let teardown = Body::sync(move |_signal| {
            *teardown_flag.lock().unwrap() = true;
            Ok(())
        });

        let events_sink = events.clone();
        let lifecycle = LifecycleSink::sync(move |event| {
            let label = match event {
                LifecycleEvent::Startup => "startup".to_string(),
                LifecycleEvent::Shutdown => "shutdown".to_string(),
                LifecycleEvent::Error(e) => format!("error({e})"),
            };
            events_sink.lock().unwrap().push(label);
        });

        let worker = Worker::thread("failing", main, None, Some(teardown), Some(lifecycle));
        worker.start();
        worker.join(Duration::from_secs(1));

        assert!(*teardown_ran.lock().unwrap());
        let recorded = events.lock().unwrap().clone();
        assert_eq!(recorded[0], "startup");
        assert!(recorded[1].starts_with("error("));
        assert_eq!(recorded[2], "shutdown");
    }

    #[test]
    fn async_lifecycle_sink_is_driven_to_completion() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let events_sink = events.clone();
        let lifecycle = LifecycleSink::asynchronous(move |event| {
            let events_sink = events_sink.clone();
            async move {
                let label = match event {
                    LifecycleEvent::Startup => "startup",
                    LifecycleEvent::Shutdown => "shutdown",
                    LifecycleEvent::Error(_) => "error",
                };
                events_sink.lock().unwrap().push(label);
            }
        });

        let main = Body::sync(|_signal| Ok(()));
        let worker = Worker::thread("async-lifecycle", main, None, None, Some(lifecycle));
        worker.start();
        worker.join(Duration::from_secs(1));

        assert_eq!(*events.lock().unwrap(), vec!["startup", "shutdown"]);
    }

    #[test]
    fn stop_on_already_stopped_worker_is_a_no_op() {
        let main = Body::sync(|_signal| Ok(()));
        let worker = Worker::thread("quick", main, None, None, None);
        worker.start();
        worker.join(Duration::from_secs(1));
        worker.stop();
        worker.stop();
    }
}
