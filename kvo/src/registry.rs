use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, error, trace, warn};

use crate::{
    Change, Fault, FaultPolicy, IntoObserverCallback, Key, ObjectHandle, ObjectId, ObserverCallback, ObserverId, RegistryConfig, RegistryError,
    Result, Value,
};

struct Registration {
    observer: ObserverId,
    callback: ObserverCallback,
    // Cleared on removal or replacement, so a dispatch pass holding a snapshot skips it
    active: AtomicBool,
}

impl Registration {
    fn new(observer: ObserverId, callback: ObserverCallback) -> Arc<Self> {
        Arc::new(Self { observer, callback, active: AtomicBool::new(true) })
    }

    fn deactivate(&self) { self.active.store(false, Ordering::Release) }

    fn is_active(&self) -> bool { self.active.load(Ordering::Acquire) }
}

struct ObjectEntry {
    // Keeps the allocation address reserved (not the object alive) so the ObjectId is not reused
    handle: ObjectHandle,
    keys: HashMap<Key, Vec<Arc<Registration>>>,
}

impl ObjectEntry {
    fn count(&self) -> usize { self.keys.values().map(Vec::len).sum() }

    fn deactivate_all(&self) {
        for registration in self.keys.values().flatten() {
            registration.deactivate();
        }
    }
}

struct Inner {
    config: RegistryConfig,
    objects: RwLock<HashMap<ObjectId, ObjectEntry>>,
}

/// The observer registry: maps (observed object, key) to the callbacks registered for it
/// and dispatches property changes to them.
///
/// Cloning a `Registry` shares the same registrations. The registry never owns observed
/// objects or observers; callers unregister before either side is destroyed.
///
/// Callbacks are invoked synchronously, in registration order, without any registry lock
/// held, so a callback may itself register, unregister or notify.
#[derive(Clone)]
pub struct Registry(Arc<Inner>);

impl Default for Registry {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let objects = self.0.objects.read().expect("registry lock poisoned");
        f.debug_struct("Registry")
            .field("objects", &objects.len())
            .field("registrations", &objects.values().map(ObjectEntry::count).sum::<usize>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self { Self::with_config(RegistryConfig::default()) }

    pub fn with_config(config: RegistryConfig) -> Self { Self(Arc::new(Inner { config, objects: RwLock::new(HashMap::new()) })) }

    /// Register `callback` for changes to `key` on `object`, on behalf of `observer`.
    ///
    /// Registering again for the same (object, key, observer) replaces the previous callback
    /// in place: it keeps its position in the dispatch order and the old callback never fires again.
    pub fn register<C>(&self, object: &ObjectHandle, key: impl Into<Key>, observer: ObserverId, callback: C) -> Result<()>
    where C: IntoObserverCallback {
        let key = key.into();
        if key.is_empty() {
            return Err(RegistryError::InvalidArgument("property key must not be empty"));
        }
        if !object.is_alive() {
            return Err(RegistryError::InvalidArgument("observed object has been dropped"));
        }
        if !object.declares(key.as_str()) {
            return Err(RegistryError::UnknownKey { object: object.id(), key });
        }

        let registration = Registration::new(observer, callback.into_observer_callback());
        let mut objects = self.0.objects.write().expect("registry lock poisoned");
        let entry = objects.entry(object.id()).or_insert_with(|| ObjectEntry { handle: object.clone(), keys: HashMap::new() });
        let registrations = entry.keys.entry(key.clone()).or_default();

        match registrations.iter_mut().find(|existing| existing.observer == observer) {
            Some(existing) => {
                existing.deactivate();
                *existing = registration;
                debug!("Replaced {observer} on {}.{key}", object.id());
            }
            None => {
                registrations.push(registration);
                debug!("Registered {observer} on {}.{key} ({} total)", object.id(), registrations.len());
            }
        }
        Ok(())
    }

    /// Register `callback` under a fresh observer identity, which is returned for later removal
    pub fn observe<C>(&self, object: &ObjectHandle, key: impl Into<Key>, callback: C) -> Result<ObserverId>
    where C: IntoObserverCallback {
        let observer = ObserverId::unique();
        self.register(object, key, observer, callback)?;
        Ok(observer)
    }

    /// Remove the registration of `observer` for (object, key). A no-op if there is none.
    pub fn unregister(&self, object: impl Into<ObjectId>, key: &str, observer: ObserverId) -> usize {
        let object: ObjectId = object.into();
        self.remove_where(object, key, |registration| registration.observer == observer)
    }

    /// Remove every registration for (object, key)
    pub fn unregister_key(&self, object: impl Into<ObjectId>, key: &str) -> usize {
        let object: ObjectId = object.into();
        self.remove_where(object, key, |_| true)
    }

    /// Remove every registration for `object`, typically right before it is destroyed
    pub fn unregister_object(&self, object: impl Into<ObjectId>) -> usize {
        let object: ObjectId = object.into();
        let mut objects = self.0.objects.write().expect("registry lock poisoned");
        match objects.remove(&object) {
            Some(entry) => {
                entry.deactivate_all();
                let removed = entry.count();
                debug!("Unregistered {removed} registrations on {object}");
                removed
            }
            None => 0,
        }
    }

    /// Remove every registration made by `observer` across all objects
    pub fn unregister_observer(&self, observer: ObserverId) -> usize {
        let mut objects = self.0.objects.write().expect("registry lock poisoned");
        let mut removed = 0;
        for entry in objects.values_mut() {
            for registrations in entry.keys.values_mut() {
                registrations.retain(|registration| {
                    let keep = registration.observer != observer;
                    if !keep {
                        registration.deactivate();
                        removed += 1;
                    }
                    keep
                });
            }
            entry.keys.retain(|_, registrations| !registrations.is_empty());
        }
        objects.retain(|_, entry| !entry.keys.is_empty());
        debug!("Unregistered {observer} from {removed} registrations");
        removed
    }

    fn remove_where(&self, object: ObjectId, key: &str, matches: impl Fn(&Registration) -> bool) -> usize {
        let mut objects = self.0.objects.write().expect("registry lock poisoned");
        let Some(entry) = objects.get_mut(&object) else { return 0 };
        let Some(registrations) = entry.keys.get_mut(key) else { return 0 };

        let mut removed = 0;
        registrations.retain(|registration| {
            if matches(&**registration) {
                registration.deactivate();
                removed += 1;
                false
            } else {
                true
            }
        });
        if registrations.is_empty() {
            entry.keys.remove(key);
        }
        if entry.keys.is_empty() {
            objects.remove(&object);
        }
        if removed > 0 {
            debug!("Unregistered {removed} on {object}.{key}");
        }
        removed
    }

    /// Dispatch a change of `key` on `object` to every registered callback.
    ///
    /// Called by the interception layer ([`crate::Property`], [`crate::Notifier`]) at the point of
    /// mutation. Equal old and new values are dispatched as-is; suppression is the caller's decision.
    pub fn notify(&self, object: impl Into<ObjectId>, key: impl Into<Key>, old: impl Into<Value>, new: impl Into<Value>) -> Result<()> {
        let change = Change::new(object.into(), key, old, new);
        self.dispatch(&change)
    }

    /// Dispatch an already constructed change
    pub fn dispatch(&self, change: &Change) -> Result<()> {
        let snapshot = self.snapshot(change.object, change.key.as_str());
        if snapshot.is_empty() {
            trace!("No observers for {}.{}", change.object, change.key);
            return Ok(());
        }

        trace!("Dispatching {change} to {} observers", snapshot.len());
        for registration in snapshot {
            // removed by an earlier callback in this same pass
            if !registration.is_active() {
                continue;
            }
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| registration.callback.call(change))) {
                let fault = Fault::from_panic(registration.observer, change, payload);
                match self.0.config.fault_policy {
                    FaultPolicy::Isolate => self.report(fault),
                    FaultPolicy::Propagate => return Err(RegistryError::CallbackFault(fault)),
                }
            }
        }
        Ok(())
    }

    fn report(&self, fault: Fault) {
        let observer = fault.observer;
        let sink = &self.0.config.fault_sink;
        if catch_unwind(AssertUnwindSafe(|| sink.report(fault))).is_err() {
            error!("Fault sink panicked while reporting a fault from {observer}");
        }
    }

    fn snapshot(&self, object: ObjectId, key: &str) -> Vec<Arc<Registration>> {
        let objects = self.0.objects.read().expect("registry lock poisoned");
        let Some(entry) = objects.get(&object) else { return Vec::new() };
        if self.0.config.detect_dangling && !entry.handle.is_alive() {
            warn!("{object} was dropped with {} registrations still in place", entry.count());
        }
        entry.keys.get(key).cloned().unwrap_or_default()
    }

    /// Whether anyone observes (object, key). Lets interception skip capturing the old value.
    pub fn has_observers(&self, object: impl Into<ObjectId>, key: &str) -> bool { self.observer_count(object, key) > 0 }

    pub fn observer_count(&self, object: impl Into<ObjectId>, key: &str) -> usize {
        let object: ObjectId = object.into();
        let objects = self.0.objects.read().expect("registry lock poisoned");
        objects.get(&object).and_then(|entry| entry.keys.get(key)).map_or(0, Vec::len)
    }

    /// Total number of registrations
    pub fn len(&self) -> usize { self.0.objects.read().expect("registry lock poisoned").values().map(ObjectEntry::count).sum() }

    pub fn is_empty(&self) -> bool { self.0.objects.read().expect("registry lock poisoned").is_empty() }

    /// Drop registrations whose observed object no longer exists. Returns how many were removed.
    pub fn prune_dangling(&self) -> usize {
        let mut objects = self.0.objects.write().expect("registry lock poisoned");
        let mut removed = 0;
        objects.retain(|object, entry| {
            if entry.handle.is_alive() {
                return true;
            }
            let count = entry.count();
            warn!("Pruning {count} dangling registrations on {object}");
            entry.deactivate_all();
            removed += count;
            false
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl Fn(&Change) + Send + Sync + 'static {
        let log = log.clone();
        move |_: &Change| log.lock().unwrap().push(name)
    }

    #[test]
    fn replace_keeps_dispatch_position() {
        let registry = Registry::new();
        let object = Arc::new(());
        let handle = ObjectHandle::new(&object);
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = ObserverId::unique();
        registry.register(&handle, "name", first, recorder(&log, "first")).unwrap();
        registry.register(&handle, "name", ObserverId::unique(), recorder(&log, "second")).unwrap();
        registry.register(&handle, "name", first, recorder(&log, "first-replaced")).unwrap();
        assert_eq!(registry.observer_count(&handle, "name"), 2);

        registry.notify(&handle, "name", "x", "y").unwrap();
        assert_eq!(*log.lock().unwrap(), ["first-replaced", "second"]);
    }

    #[test]
    fn removed_entries_are_dropped_from_the_map() {
        let registry = Registry::new();
        let object = Arc::new(());
        let handle = ObjectHandle::new(&object);
        let observer = ObserverId::unique();

        registry.register(&handle, "a", observer, |_: &Change| {}).unwrap();
        registry.register(&handle, "b", observer, |_: &Change| {}).unwrap();
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.unregister(&handle, "a", observer), 1);
        assert_eq!(registry.unregister(&handle, "a", observer), 0);
        assert_eq!(registry.unregister(&handle, "b", observer), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.0.objects.read().unwrap().len(), 0);
    }

    #[test]
    fn deactivated_registration_reports_inactive() {
        let registration = Registration::new(ObserverId::unique(), (|_: &Change| {}).into_observer_callback());
        registration.deactivate();
        assert!(!registration.is_active());
    }
}
