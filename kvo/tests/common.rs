use ankurah_kvo::*;
use std::sync::{Arc, Mutex, Weak};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().init(); }

#[allow(unused)]
pub fn change_watcher() -> (impl Fn(&Change) + Send + Sync + 'static, impl Fn() -> Vec<Change> + Send + Sync + 'static) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        move |change: &Change| changes.lock().unwrap().push(change.clone())
    };

    let check = move || {
        let changes: Vec<Change> = changes.lock().unwrap().drain(..).collect();
        changes
    };

    (watcher, check)
}

/// Shared call log for ordering assertions
#[allow(unused)]
pub fn call_log() -> Arc<Mutex<Vec<String>>> { Arc::new(Mutex::new(Vec::new())) }

#[allow(unused)]
pub fn logger(log: &Arc<Mutex<Vec<String>>>, name: &str) -> impl Fn(&Change) + Send + Sync + 'static {
    let log = log.clone();
    let name = name.to_string();
    move |change: &Change| log.lock().unwrap().push(format!("{name}: {} -> {}", change.old(), change.new_value()))
}

/// An observed model type that routes all mutation through its properties
#[allow(unused)]
pub struct Person {
    pub notifier: Notifier,
    pub name: Property<String>,
    pub age: Property<i64>,
}

#[allow(unused)]
impl Person {
    pub fn new(registry: &Registry, name: &str, age: i64) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Person>| Person {
            notifier: registry.notifier(ObjectHandle::from_weak(weak.clone()).with_keys(["name", "age"])),
            name: Property::new("name", name.to_string()),
            age: Property::new("age", age),
        })
    }

    pub fn handle(&self) -> &ObjectHandle { self.notifier.handle() }

    pub fn set_name(&self, name: &str) -> Result<()> { self.name.set(&self.notifier, name.to_string()) }

    pub fn set_age(&self, age: i64) -> Result<()> { self.age.set(&self.notifier, age) }
}
