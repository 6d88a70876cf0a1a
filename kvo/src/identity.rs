use std::any::Any;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::change::Key;

/// Identity of an observed object, derived from the address of its allocation.
/// Cannot be forged from user data.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn of<T: ?Sized>(object: &Arc<T>) -> Self { ObjectId(Arc::as_ptr(object) as *const () as usize) }
}

impl From<&ObjectHandle> for ObjectId {
    fn from(handle: &ObjectHandle) -> Self { handle.id }
}

impl From<ObjectHandle> for ObjectId {
    fn from(handle: ObjectHandle) -> Self { handle.id }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "obj:{:#x}", self.0) }
}

/// A non-owning handle to an observed object.
///
/// The handle holds only a `Weak` reference, so it never keeps the object alive.
/// The allocation's address stays reserved until every `Weak` is dropped though,
/// which is what makes the address usable as an [`ObjectId`] for as long as a
/// registration still names it.
#[derive(Clone)]
pub struct ObjectHandle {
    id: ObjectId,
    target: Weak<dyn Any + Send + Sync>,
    keys: Option<Arc<BTreeSet<Key>>>,
}

impl ObjectHandle {
    pub fn new<T: Any + Send + Sync>(object: &Arc<T>) -> Self { Self::from_weak(Arc::downgrade(object)) }

    /// Create a handle from a weak reference. Useful from inside `Arc::new_cyclic`,
    /// where the object does not exist yet but its address is already fixed.
    pub fn from_weak<T: Any + Send + Sync>(weak: Weak<T>) -> Self {
        let id = ObjectId(weak.as_ptr() as *const () as usize);
        let target: Weak<dyn Any + Send + Sync> = weak;
        Self { id, target, keys: None }
    }

    /// Declare the set of keys this object exposes for observation.
    /// Once declared, registering for any other key fails with `UnknownKey`.
    pub fn with_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.keys = Some(Arc::new(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn id(&self) -> ObjectId { self.id }

    pub fn is_alive(&self) -> bool { self.target.strong_count() > 0 }

    /// Returns false only when a key set was declared and does not contain `key`
    pub fn declares(&self, key: &str) -> bool {
        match &self.keys {
            Some(keys) => keys.contains(key),
            None => true,
        }
    }

    /// Upgrade to a strong reference of the concrete type, if the object is still alive and is a `T`
    pub fn upgrade<T: Any + Send + Sync>(&self) -> Option<Arc<T>> { self.target.upgrade()?.downcast::<T>().ok() }
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle").field("id", &self.id).field("alive", &self.is_alive()).finish()
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}
impl Eq for ObjectHandle {}

static NEXT_OBSERVER: AtomicUsize = AtomicUsize::new(1);

/// Identity of an observer, used to replace or remove its registrations
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObserverId {
    /// Address identity of an `Arc` owned by the caller
    Object(usize),
    /// Identity minted by [`ObserverId::unique`]
    Unique(usize),
}

impl ObserverId {
    /// Identify an observer by the address of its allocation. Does not retain it.
    pub fn of<T: ?Sized>(observer: &Arc<T>) -> Self { ObserverId::Object(Arc::as_ptr(observer) as *const () as usize) }

    /// A fresh identity for observers that are nothing more than a closure
    pub fn unique() -> Self { ObserverId::Unique(NEXT_OBSERVER.fetch_add(1, Ordering::Relaxed)) }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObserverId::Object(addr) => write!(f, "observer:{addr:#x}"),
            ObserverId::Unique(n) => write!(f, "observer#{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_does_not_keep_object_alive() {
        let object = Arc::new(String::from("subject"));
        let handle = ObjectHandle::new(&object);
        assert!(handle.is_alive());
        assert_eq!(handle.upgrade::<String>().as_deref().map(String::as_str), Some("subject"));
        assert!(handle.upgrade::<u32>().is_none());

        drop(object);
        assert!(!handle.is_alive());
        assert!(handle.upgrade::<String>().is_none());
    }

    #[test]
    fn handles_to_the_same_object_share_an_id() {
        let object = Arc::new(5u8);
        let other = Arc::new(5u8);
        assert_eq!(ObjectHandle::new(&object).id(), ObjectHandle::new(&object.clone()).id());
        assert_ne!(ObjectHandle::new(&object).id(), ObjectHandle::new(&other).id());
        assert_eq!(ObjectId::of(&object), ObjectHandle::new(&object).id());
    }

    #[test]
    fn cyclic_handle_matches_outer_handle() {
        struct Node {
            handle: ObjectHandle,
        }
        let node = Arc::new_cyclic(|weak: &Weak<Node>| Node { handle: ObjectHandle::from_weak(weak.clone()) });
        assert_eq!(node.handle.id(), ObjectHandle::new(&node).id());
        assert!(node.handle.is_alive());
    }

    #[test]
    fn declared_keys() {
        let object = Arc::new(());
        let open = ObjectHandle::new(&object);
        assert!(open.declares("anything"));

        let closed = ObjectHandle::new(&object).with_keys(["name", "age"]);
        assert!(closed.declares("name"));
        assert!(!closed.declares("email"));
    }

    #[test]
    fn observer_ids() {
        let a = Arc::new(1);
        assert_eq!(ObserverId::of(&a), ObserverId::of(&a.clone()));
        assert_ne!(ObserverId::unique(), ObserverId::unique());
    }
}
