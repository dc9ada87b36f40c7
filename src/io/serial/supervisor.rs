// src/io/serial/supervisor.rs
//
// Connection supervisor for a push-only serial monitor.
//
// Owns the connection state machine, the discovered endpoint and the
// listener thread. Discovery and the open loop run on the caller's thread and
// block between attempts; records are read, decoded and delivered on a single
// listener thread per subscription. Any I/O fault on that thread closes the
// port and re-enters the open loop, so a subscribed supervisor keeps trying
// until it is closed.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use super::lines::LineSource;
use super::ports::{find_endpoint, port_names, DeviceEndpoint, PortBackend};
use super::utils::LineParams;
use crate::device::DeviceInfo;
use crate::io::codec::RecordCodec;
use crate::io::rad8::Rad8Codec;
use crate::io::retry::{Pacing, RetryPolicy};
use crate::io::{now_us, ConnectionState, EmissionSink, InvalidOperation, IoError};
use crate::logging::{init_file_logging, LogTarget};
use crate::settings::{BridgeSettings, DriverOptions};

// ============================================================================
// Types
// ============================================================================

/// Supervised serial connection to one monitor.
///
/// Dropping the supervisor closes it.
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn PortBackend>,
    shared: Mutex<Shared>,
    next_listener_id: AtomicU64,
    /// Time of the last line read from the port (0 = never)
    last_line_us: AtomicU64,
}

/// Everything the state machine mutates, behind one lock
struct Shared {
    state: ConnectionState,
    endpoint: Option<DeviceEndpoint>,
    device: DeviceInfo,
    settings: BridgeSettings,
    sink: Option<Arc<dyn EmissionSink>>,
    listener: Option<Listener>,
}

/// Handle to a running listener thread
struct Listener {
    id: u64,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Listener {
    /// Ask the thread to stop and wait for it, unless we are that thread.
    fn stop(self, port: &str) {
        self.stop.store(true, Ordering::SeqCst);
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            tlog!("[rad8:{}] Listener {} panicked", port, self.id);
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

impl Supervisor {
    /// Create a supervisor in the `Discovering` state.
    pub fn new(backend: Arc<dyn PortBackend>, device: DeviceInfo, settings: BridgeSettings) -> Self {
        if let Some(dir) = settings.log_dir.as_deref() {
            if let Err(e) = init_file_logging(&LogTarget::for_device(dir, &device)) {
                tlog!("[rad8] {}", e);
            }
        }
        Self {
            inner: Arc::new(Inner {
                backend,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Discovering,
                    endpoint: None,
                    device,
                    settings,
                    sink: None,
                    listener: None,
                }),
                next_listener_id: AtomicU64::new(1),
                last_line_us: AtomicU64::new(0),
            }),
        }
    }

    /// Create a supervisor and block until `endpoint_name` is discovered.
    pub fn connect(
        backend: Arc<dyn PortBackend>,
        device: DeviceInfo,
        settings: BridgeSettings,
        endpoint_name: &str,
    ) -> Result<Self, IoError> {
        let supervisor = Self::new(backend, device, settings);
        supervisor.discover(endpoint_name)?;
        Ok(supervisor)
    }

    /// Create a supervisor for the port named in `settings.port_name`.
    pub fn from_settings(
        backend: Arc<dyn PortBackend>,
        device: DeviceInfo,
        settings: BridgeSettings,
    ) -> Result<Self, IoError> {
        let name = settings
            .port_name
            .clone()
            .ok_or_else(|| IoError::config("no port_name configured"))?;
        Self::connect(backend, device, settings, &name)
    }

    /// Merge host options (e.g. `retry_interval`) into the running settings.
    pub fn init(&self, options: &DriverOptions) -> Result<(), IoError> {
        self.inner.lock().settings.apply_options(options)
    }

    /// Block until a port named `endpoint_name` (case-insensitive) shows up.
    ///
    /// Never gives up on its own; returns `Closed` only if the supervisor is
    /// closed while waiting. A second call after success returns the endpoint
    /// already held.
    pub fn discover(&self, endpoint_name: &str) -> Result<DeviceEndpoint, IoError> {
        let interval = {
            let shared = self.inner.lock();
            if shared.state.is_terminal() {
                return Err(InvalidOperation::Closed.into());
            }
            if let Some(endpoint) = &shared.endpoint {
                return Ok(endpoint.clone());
            }
            shared.settings.retry_interval()
        };

        tlog!("[discovery] Detecting port {}...", endpoint_name);
        let policy = RetryPolicy::new(interval, Pacing::AttemptFirst);
        let found = policy.run(
            || self.inner.is_closing(),
            |_| match self.inner.backend.available_ports() {
                Ok(ports) => match find_endpoint(&ports, endpoint_name) {
                    Some(endpoint) => ControlFlow::Break(endpoint.clone()),
                    None => {
                        let missing = IoError::EndpointNotFound {
                            name: endpoint_name.to_string(),
                            visible: port_names(&ports),
                        };
                        tlog!("[discovery] {}", missing);
                        tlog!("[discovery] Retrying in {:?}...", interval);
                        ControlFlow::Continue(())
                    }
                },
                Err(e) => {
                    tlog!("[discovery] Exception during detecting port: {}", e);
                    ControlFlow::Continue(())
                }
            },
        );

        let endpoint = found.ok_or(IoError::InvalidOperation(InvalidOperation::Closed))?;
        let mut shared = self.inner.lock();
        if shared.state.is_terminal() {
            return Err(InvalidOperation::Closed.into());
        }
        shared.endpoint = Some(endpoint.clone());
        if shared.state == ConnectionState::Discovering {
            shared.state = ConnectionState::Idle;
        }
        tlog!("[discovery] Found port {}", endpoint.port_name);
        Ok(endpoint)
    }

    /// Start delivering records to `sink`.
    ///
    /// Blocks in the open loop (one `retry_interval` before every attempt)
    /// until the port is open and a listener is running. No-op while already
    /// listening or while another thread is in the open loop.
    pub fn subscribe(
        &self,
        options: Option<&DriverOptions>,
        sink: Arc<dyn EmissionSink>,
    ) -> Result<(), IoError> {
        if let Some(options) = options {
            self.init(options)?;
        }
        {
            let mut shared = self.inner.lock();
            match shared.state {
                ConnectionState::Closing | ConnectionState::Closed => {
                    return Err(InvalidOperation::Closed.into())
                }
                ConnectionState::Discovering => return Err(InvalidOperation::NotDiscovered.into()),
                ConnectionState::Listening | ConnectionState::Opening => return Ok(()),
                ConnectionState::Idle => {}
            }
            if shared.endpoint.is_none() {
                return Err(InvalidOperation::NotDiscovered.into());
            }
            shared.state = ConnectionState::Opening;
            shared.sink = Some(sink);
        }
        self.inner.open_loop()
    }

    /// Stop listening and close the port. No-op unless `Listening`.
    ///
    /// When this returns the port is closed and the sink will not be called
    /// again (except when called from the sink itself, where the current
    /// delivery is the last one).
    ///
    /// A supervisor recovering from a fault is `Opening`, not `Listening`, so
    /// this is a no-op there too: recovery goes on, reopens the port and
    /// resumes delivery. Use [`Supervisor::close`] to stop a recovery.
    pub fn unsubscribe(&self) {
        self.inner.unsubscribe();
    }

    /// Alias for [`Supervisor::unsubscribe`]
    pub fn disconnect(&self) {
        self.unsubscribe();
    }

    /// Stop for good: no more retries, port closed, endpoint released.
    pub fn close(&self) {
        let (listener, port) = {
            let mut shared = self.inner.lock();
            if shared.state == ConnectionState::Closed {
                return;
            }
            shared.state = ConnectionState::Closing;
            (shared.listener.take(), self.inner.port_label(&shared))
        };
        if let Some(listener) = listener {
            tlog!("[rad8:{}] Closing port...", port);
            listener.stop(&port);
        }

        let mut shared = self.inner.lock();
        shared.endpoint = None;
        shared.sink = None;
        shared.state = ConnectionState::Closed;
        tlog!("[rad8:{}] Driver closed", port);
    }

    /// Replace the sink used by the next listener. A running listener keeps
    /// the sink it was started with.
    pub fn set_sink(&self, sink: Arc<dyn EmissionSink>) {
        let mut shared = self.inner.lock();
        if !shared.state.is_terminal() {
            shared.sink = Some(sink);
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ConnectionState::Listening
    }

    /// True from discovery until close, whether or not the port is open
    pub fn is_connected(&self) -> bool {
        let shared = self.inner.lock();
        shared.endpoint.is_some() && !shared.state.is_terminal()
    }

    pub fn endpoint(&self) -> Option<DeviceEndpoint> {
        self.inner.lock().endpoint.clone()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.inner.lock().device.clone()
    }

    pub fn set_device_info(&self, device: DeviceInfo) {
        self.inner.lock().device = device;
    }

    pub fn settings(&self) -> BridgeSettings {
        self.inner.lock().settings.clone()
    }

    /// Microsecond timestamp of the last line read, if any
    pub fn last_line_us(&self) -> Option<u64> {
        match self.inner.last_line_us.load(Ordering::Relaxed) {
            0 => None,
            us => Some(us),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// State machine internals
// ============================================================================

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closing(&self) -> bool {
        self.lock().state.is_terminal()
    }

    fn port_label(&self, shared: &Shared) -> String {
        shared
            .endpoint
            .as_ref()
            .map(|e| e.port_name.clone())
            .unwrap_or_else(|| "-".to_string())
    }

    fn unsubscribe(&self) {
        let (listener, port) = {
            let mut shared = self.lock();
            if shared.state != ConnectionState::Listening {
                return;
            }
            shared.state = ConnectionState::Idle;
            (shared.listener.take(), self.port_label(&shared))
        };
        if let Some(listener) = listener {
            tlog!("[rad8:{}] Closing port...", port);
            listener.stop(&port);
        }
    }

    /// Open the port and start a listener, retrying until it works or the
    /// supervisor is closed. Expects the state to be `Opening`.
    fn open_loop(self: &Arc<Self>) -> Result<(), IoError> {
        let (endpoint, settings, device) = {
            let shared = self.lock();
            let endpoint = shared
                .endpoint
                .clone()
                .ok_or(IoError::InvalidOperation(InvalidOperation::Closed))?;
            (endpoint, shared.settings.clone(), shared.device.clone())
        };
        let port = endpoint.port_name.as_str();
        let params = LineParams::RAD8;

        let policy = RetryPolicy::new(settings.retry_interval(), Pacing::WaitFirst);
        let outcome = policy.run(
            || self.is_closing(),
            |attempt| {
                tlog!(
                    "[rad8:{}] Opening port for {} (attempt {})...",
                    port,
                    device.label(),
                    attempt
                );
                let started = self
                    .backend
                    .open(&endpoint, &params, settings.read_timeout())
                    .and_then(|source| self.start_listener(source));
                match started {
                    Ok(()) => {
                        tlog!("[rad8:{}] Port is opened ({})! Listening for data...", port, params);
                        ControlFlow::Break(Ok(()))
                    }
                    Err(e) if e.is_transient() => {
                        tlog!("[rad8:{}] Cannot open port: {}", port, e);
                        ControlFlow::Continue(())
                    }
                    Err(e) => ControlFlow::Break(Err(e)),
                }
            },
        );
        outcome.unwrap_or(Err(InvalidOperation::Closed.into()))
    }

    /// Publish a listener for a freshly opened port. Refuses (dropping, and so
    /// closing, the port) once the supervisor is closing.
    fn start_listener(self: &Arc<Self>, source: Box<dyn LineSource>) -> Result<(), IoError> {
        let mut shared = self.lock();
        if shared.state.is_terminal() {
            return Err(InvalidOperation::Closed.into());
        }
        let sink = shared
            .sink
            .clone()
            .ok_or(IoError::InvalidOperation(InvalidOperation::Closed))?;

        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let stop = Arc::new(AtomicBool::new(false));
        let port = source.port_name().to_string();
        let inner = Arc::clone(self);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(format!("rad8-listener-{}", id))
            .spawn(move || inner.listen(id, source, sink, thread_stop))
            .map_err(|e| IoError::fault(port, format!("Failed to spawn listener: {}", e)))?;

        shared.listener = Some(Listener { id, stop, handle });
        shared.state = ConnectionState::Listening;
        Ok(())
    }

    /// Listener thread body: read, decode, deliver, strictly in order.
    fn listen(
        self: Arc<Self>,
        id: u64,
        mut source: Box<dyn LineSource>,
        sink: Arc<dyn EmissionSink>,
        stop: Arc<AtomicBool>,
    ) {
        let port = source.port_name().to_string();
        let fault = loop {
            if stop.load(Ordering::SeqCst) {
                break None;
            }
            match source.next_line() {
                Ok(None) => {}
                Ok(Some(line)) => {
                    self.last_line_us.store(now_us(), Ordering::Relaxed);
                    match Rad8Codec::decode(&line) {
                        Ok(record) => {
                            if stop.load(Ordering::SeqCst) {
                                break None;
                            }
                            sink.on_record(record);
                        }
                        Err(e) => tlog!("[rad8:{}] Dropped line: {} ({:?})", port, e, line),
                    }
                }
                Err(e) => break Some(e),
            }
        };
        // Close the port before any reopen attempt
        drop(source);

        if let Some(e) = fault {
            self.recover(id, &port, e);
        }
    }

    /// Fault path: detach the failed listener and, unless closing, go back
    /// into the open loop on this thread.
    fn recover(self: &Arc<Self>, id: u64, port: &str, fault: IoError) {
        tlog!("[rad8:{}] Failed to handle serial event: {}", port, fault);
        let interval = {
            let mut shared = self.lock();
            // A caller already unsubscribed or closed; nothing to restart
            if shared.listener.as_ref().map(|l| l.id) != Some(id) {
                return;
            }
            shared.listener = None;
            if shared.state.is_terminal() {
                return;
            }
            shared.state = ConnectionState::Opening;
            shared.settings.retry_interval()
        };

        tlog!("[rad8:{}] Retrying in {:?}...", port, interval);
        if let Err(e) = self.open_loop() {
            tlog!("[rad8:{}] Gave up reconnecting: {}", port, e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
