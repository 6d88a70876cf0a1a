use std::sync::{Condvar, Mutex, RwLock};
use std::thread::{self, ThreadId};

use crate::{IntoObserverCallback, Key, ObjectHandle, ObserverId, Registry, Result, Value};

/// The link between an observed object and the registry. An observed type stores one and
/// routes every property mutation through it.
#[derive(Clone, Debug)]
pub struct Notifier {
    registry: Registry,
    handle: ObjectHandle,
}

impl Notifier {
    pub fn new(registry: &Registry, handle: ObjectHandle) -> Self { Self { registry: registry.clone(), handle } }

    pub fn handle(&self) -> &ObjectHandle { &self.handle }

    pub fn registry(&self) -> &Registry { &self.registry }

    /// Register `observer` for changes to `key` on this object
    pub fn add_observer<C: IntoObserverCallback>(&self, observer: ObserverId, key: impl Into<Key>, callback: C) -> Result<()> {
        self.registry.register(&self.handle, key, observer, callback)
    }

    pub fn remove_observer(&self, observer: ObserverId, key: &str) -> usize { self.registry.unregister(&self.handle, key, observer) }

    pub fn has_observers(&self, key: &str) -> bool { self.registry.has_observers(&self.handle, key) }

    pub fn notify(&self, key: impl Into<Key>, old: impl Into<Value>, new: impl Into<Value>) -> Result<()> {
        self.registry.notify(&self.handle, key, old, new)
    }
}

impl Registry {
    /// Bind this registry to an observed object
    pub fn notifier(&self, handle: ObjectHandle) -> Notifier { Notifier::new(self, handle) }
}

/// Serializes store-then-notify per property so changes are delivered in write order.
/// Re-entrant for the thread that holds it: a callback may set the same property again.
#[derive(Debug, Default)]
struct DispatchLock {
    // owning thread and how many times it has entered
    state: Mutex<(Option<ThreadId>, usize)>,
    released: Condvar,
}

struct DispatchGuard<'a>(&'a DispatchLock);

impl DispatchLock {
    fn acquire(&self) -> DispatchGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock().expect("dispatch lock poisoned");
        loop {
            let owner = state.0;
            match owner {
                None => {
                    *state = (Some(me), 1);
                    break;
                }
                Some(owner) if owner == me => {
                    state.1 += 1;
                    break;
                }
                Some(_) => state = self.released.wait(state).expect("dispatch lock poisoned"),
            }
        }
        DispatchGuard(self)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state.lock().expect("dispatch lock poisoned");
        state.1 -= 1;
        if state.1 == 0 {
            state.0 = None;
            self.0.released.notify_one();
        }
    }
}

/// An observable property: a value cell bound to a key.
///
/// Mutating through [`Property::set`] captures the old value, stores the new one and then
/// notifies. The value lock is released before dispatch, but setters of the same property
/// are serialized until their notification has been delivered, so observers see changes
/// in the order they were stored and the last `new` value they see is the stored one.
/// A callback may set the same property again from within dispatch; that nested change is
/// delivered before the outer pass continues. Callbacks that set *other* properties from
/// several threads at once can deadlock and must not do so.
///
/// When nobody observes the key the value is stored without building a change at all.
#[derive(Debug)]
pub struct Property<T> {
    key: Key,
    value: RwLock<T>,
    dispatch: DispatchLock,
}

impl<T> Property<T> {
    pub fn new(key: impl Into<Key>, value: T) -> Self {
        Self { key: key.into(), value: RwLock::new(value), dispatch: DispatchLock::default() }
    }

    pub fn key(&self) -> &Key { &self.key }

    /// Calls a closure with a borrow of the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.read().expect("property lock poisoned");
        f(&*guard)
    }

    /// Store a value without notifying anyone. Returns the previous value.
    pub fn replace_silently(&self, value: T) -> T {
        let mut current = self.value.write().expect("property lock poisoned");
        std::mem::replace(&mut *current, value)
    }
}

impl<T: Clone> Property<T> {
    pub fn get(&self) -> T { self.value.read().expect("property lock poisoned").clone() }
}

impl<T: Clone + Into<Value>> Property<T> {
    /// Store `value` and notify observers of the key, even if the value did not change
    pub fn set(&self, notifier: &Notifier, value: T) -> Result<()> {
        let _dispatch = self.dispatch.acquire();
        if !notifier.has_observers(self.key.as_str()) {
            self.replace_silently(value);
            return Ok(());
        }
        let new: Value = value.clone().into();
        let old: Value = self.replace_silently(value).into();
        notifier.notify(&self.key, old, new)
    }
}

impl<T: Clone + PartialEq + Into<Value>> Property<T> {
    /// Store `value` and notify only if it differs from the current one. Returns whether observers were notified.
    pub fn set_if_changed(&self, notifier: &Notifier, value: T) -> Result<bool> {
        let _dispatch = self.dispatch.acquire();
        let old = {
            let mut current = self.value.write().expect("property lock poisoned");
            if *current == value {
                return Ok(false);
            }
            std::mem::replace(&mut *current, value.clone())
        };
        if !notifier.has_observers(self.key.as_str()) {
            return Ok(false);
        }
        notifier.notify(&self.key, old, value)?;
        Ok(true)
    }
}
