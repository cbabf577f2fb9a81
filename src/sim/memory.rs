//! In-process simulation source
//!
//! Holds variable values in memory and emits [`SimEvent`]s on a channel, in
//! the same shape a real connector would. Values are keyed by variable name,
//! so a write to `PLANE ALTITUDE` is visible to every handle registered for
//! that name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::source::{ConnectInfo, SimError, SimEvent, SimSource, VariableHandle};
use super::value::{DataType, SimValue};

/// Capacity of the event channel; `DataReady` is dropped when it is full
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A write performed through [`SimSource::write_value`]
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub data_type: DataType,
}

#[derive(Debug)]
struct RegisteredVar {
    name: String,
    data_type: DataType,
}

#[derive(Debug, Default)]
struct Inner {
    next_handle: u32,
    vars: HashMap<VariableHandle, RegisteredVar>,
    values: HashMap<String, Bytes>,
    writes: Vec<WriteRecord>,
    allocations: usize,
    frees: usize,
    refused_opens: u32,
}

/// Simulation source backed by memory
pub struct MemorySimSource {
    inner: Mutex<Inner>,
    connected: AtomicBool,
    open_attempts: AtomicU32,
    info: ConnectInfo,
    event_tx: mpsc::Sender<SimEvent>,
}

impl MemorySimSource {
    /// Create a source and the receiving end of its event stream
    pub fn new(info: ConnectInfo) -> (Self, mpsc::Receiver<SimEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let source = Self {
            inner: Mutex::new(Inner {
                next_handle: 1,
                ..Default::default()
            }),
            connected: AtomicBool::new(false),
            open_attempts: AtomicU32::new(0),
            info,
            event_tx,
        };
        (source, event_rx)
    }

    /// Fail the next `count` calls to `open`
    pub fn refuse_opens(&self, count: u32) {
        self.inner.lock().refused_opens = count;
    }

    /// Number of times `open` has been called
    pub fn open_attempts(&self) -> u32 {
        self.open_attempts.load(Ordering::Relaxed)
    }

    /// Set the current value of a variable by name
    pub fn set_value(&self, name: &str, value: SimValue) {
        self.inner
            .lock()
            .values
            .insert(name.to_string(), value.to_bytes());
    }

    /// Set a raw value, bypassing encoding
    pub fn set_raw(&self, name: &str, raw: Bytes) {
        self.inner.lock().values.insert(name.to_string(), raw);
    }

    /// Forget the current value of a variable
    pub fn clear_value(&self, name: &str) {
        self.inner.lock().values.remove(name);
    }

    /// Signal that new data is available
    pub fn notify_data_ready(&self) {
        self.emit(SimEvent::DataReady);
    }

    /// Simulate the simulator quitting
    ///
    /// Unlike data notifications, the quit is never dropped: this waits for
    /// room in the event queue.
    pub async fn quit(&self) {
        self.connected.store(false, Ordering::Relaxed);
        if self.event_tx.send(SimEvent::Disconnected).await.is_err() {
            tracing::debug!("Simulation event stream closed before quit");
        }
    }

    /// Push an arbitrary event onto the stream
    pub fn emit(&self, event: SimEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            tracing::debug!(error = %e, "Simulation event dropped");
        }
    }

    /// Writes performed so far
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    /// Total handles ever allocated
    pub fn allocation_count(&self) -> usize {
        self.inner.lock().allocations
    }

    /// Total handles ever freed
    pub fn free_count(&self) -> usize {
        self.inner.lock().frees
    }

    /// Whether a handle is currently allocated
    pub fn is_allocated(&self, handle: VariableHandle) -> bool {
        self.inner.lock().vars.contains_key(&handle)
    }

    /// Number of currently allocated handles
    pub fn live_handle_count(&self) -> usize {
        self.inner.lock().vars.len()
    }

    /// Spawn a task that emits `DataReady` every `interval` while connected
    pub fn spawn_ticker(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let source = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if source.is_connected() {
                            source.notify_data_ready();
                        }
                    }
                }
            }
        })
    }
}

impl SimSource for MemorySimSource {
    fn open(&self, name: &str) -> Result<(), SimError> {
        self.open_attempts.fetch_add(1, Ordering::Relaxed);
        {
            let mut inner = self.inner.lock();
            if inner.refused_opens > 0 {
                inner.refused_opens -= 1;
                return Err(SimError::OpenFailed("simulator not running".into()));
            }
        }

        self.connected.store(true, Ordering::Relaxed);
        tracing::debug!(name = name, "Memory simulation session opened");
        self.emit(SimEvent::Connected(self.info.clone()));
        Ok(())
    }

    fn close(&self) -> Result<(), SimError> {
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn allocate_variable(
        &self,
        name: &str,
        _unit: &str,
        data_type: DataType,
    ) -> Result<VariableHandle, SimError> {
        if name.is_empty() {
            return Err(SimError::AllocationFailed {
                name: String::new(),
                reason: "empty variable name".into(),
            });
        }

        let mut inner = self.inner.lock();
        let handle = VariableHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.allocations += 1;
        inner.vars.insert(
            handle,
            RegisteredVar {
                name: name.to_string(),
                data_type,
            },
        );
        Ok(handle)
    }

    fn free_variable(&self, handle: VariableHandle) {
        let mut inner = self.inner.lock();
        if inner.vars.remove(&handle).is_some() {
            inner.frees += 1;
        }
    }

    fn read_value(&self, handle: VariableHandle) -> Option<(Bytes, DataType)> {
        let inner = self.inner.lock();
        let var = inner.vars.get(&handle)?;
        let raw = inner.values.get(&var.name)?;
        Some((raw.clone(), var.data_type))
    }

    fn write_value(
        &self,
        name: &str,
        unit: &str,
        value: f64,
        data_type: DataType,
    ) -> Result<(), SimError> {
        if !self.is_connected() {
            return Err(SimError::NotConnected);
        }

        let mut inner = self.inner.lock();
        inner.writes.push(WriteRecord {
            name: name.to_string(),
            unit: unit.to_string(),
            value,
            data_type,
        });
        inner
            .values
            .insert(name.to_string(), SimValue::from_f64(data_type, value).to_bytes());
        Ok(())
    }
}
