use std::sync::Arc;

use crate::Change;

/// A registered observer callback. Cheap to clone so dispatch can snapshot callbacks and release the lock.
#[derive(Clone)]
pub struct ObserverCallback(Arc<dyn Fn(&Change) + Send + Sync + 'static>);

impl ObserverCallback {
    pub(crate) fn call(&self, change: &Change) { (self.0)(change) }
}

impl std::fmt::Debug for ObserverCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("ObserverCallback") }
}

/// Trait for types that can be registered as observer callbacks.
pub trait IntoObserverCallback {
    fn into_observer_callback(self) -> ObserverCallback;
}

impl<F> IntoObserverCallback for F
where F: Fn(&Change) + Send + Sync + 'static
{
    fn into_observer_callback(self) -> ObserverCallback { ObserverCallback(Arc::new(self)) }
}

impl IntoObserverCallback for ObserverCallback {
    fn into_observer_callback(self) -> ObserverCallback { self }
}

impl IntoObserverCallback for Arc<dyn Fn(&Change) + Send + Sync + 'static> {
    fn into_observer_callback(self) -> ObserverCallback { ObserverCallback(self) }
}

impl IntoObserverCallback for std::sync::mpsc::Sender<Change> {
    fn into_observer_callback(self) -> ObserverCallback {
        ObserverCallback(Arc::new(move |change: &Change| {
            let _ = self.send(change.clone()); // receiver gone is not our problem
        }))
    }
}

#[cfg(feature = "tokio")]
impl IntoObserverCallback for tokio::sync::mpsc::UnboundedSender<Change> {
    fn into_observer_callback(self) -> ObserverCallback {
        ObserverCallback(Arc::new(move |change: &Change| {
            let _ = self.send(change.clone());
        }))
    }
}
