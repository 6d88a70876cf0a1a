use std::sync::Arc;

use tracing::error;

use crate::Fault;

/// What the registry does when an observer panics during dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Report the fault to the fault sink and keep delivering to the remaining observers
    #[default]
    Isolate,
    /// Abort the dispatch pass and return `RegistryError::CallbackFault` from `notify`
    Propagate,
}

/// Where isolated observer faults are reported. A sink that panics is logged and ignored.
#[derive(Clone)]
pub struct FaultSink(Arc<dyn Fn(Fault) + Send + Sync + 'static>);

impl FaultSink {
    pub(crate) fn report(&self, fault: Fault) { (self.0)(fault) }

    /// The default sink: log the fault and move on
    pub fn log() -> Self { Self(Arc::new(|fault: Fault| error!("{fault}"))) }
}

impl Default for FaultSink {
    fn default() -> Self { Self::log() }
}

impl std::fmt::Debug for FaultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("FaultSink") }
}

pub trait IntoFaultSink {
    fn into_fault_sink(self) -> FaultSink;
}

impl<F> IntoFaultSink for F
where F: Fn(Fault) + Send + Sync + 'static
{
    fn into_fault_sink(self) -> FaultSink { FaultSink(Arc::new(self)) }
}

impl IntoFaultSink for FaultSink {
    fn into_fault_sink(self) -> FaultSink { self }
}

impl IntoFaultSink for std::sync::mpsc::Sender<Fault> {
    fn into_fault_sink(self) -> FaultSink {
        FaultSink(Arc::new(move |fault: Fault| {
            let _ = self.send(fault);
        }))
    }
}

#[cfg(feature = "tokio")]
impl IntoFaultSink for tokio::sync::mpsc::UnboundedSender<Fault> {
    fn into_fault_sink(self) -> FaultSink {
        FaultSink(Arc::new(move |fault: Fault| {
            let _ = self.send(fault);
        }))
    }
}

/// Runtime configuration for a [`crate::Registry`]
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub(crate) fault_policy: FaultPolicy,
    pub(crate) fault_sink: FaultSink,
    pub(crate) detect_dangling: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { fault_policy: FaultPolicy::default(), fault_sink: FaultSink::default(), detect_dangling: cfg!(debug_assertions) }
    }
}

impl RegistryConfig {
    pub fn new() -> Self { Self::default() }

    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn fault_sink(mut self, sink: impl IntoFaultSink) -> Self {
        self.fault_sink = sink.into_fault_sink();
        self
    }

    /// Warn about registrations whose observed object was dropped without unregistering.
    /// On by default in debug builds.
    pub fn detect_dangling(mut self, enabled: bool) -> Self {
        self.detect_dangling = enabled;
        self
    }
}
