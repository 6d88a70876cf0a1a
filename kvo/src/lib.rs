/*!
Manual key-value observing for ankurah

Observers register a callback for a named property of an observed object, and are called with
the object, the key, the old value and the new value whenever that property changes.

# Design requirements:
- No hidden global state. A [`Registry`] is an explicit value, shared by cloning, that both the
  observed objects and the observers hold.
- The registry never owns what it observes. Objects are identified through an [`ObjectHandle`],
  which holds only a weak reference. Callers unregister before either side is destroyed.
- Dispatch is explicit. Observed types route mutation through a [`Property`] (or call
  [`Notifier::notify`] themselves), which captures the old value, stores the new one and notifies.
- Registering the same (object, key, observer) twice replaces the first callback.
- A panicking observer does not break delivery to the others (see [`FaultPolicy`]).

# Basic usage

```rust
use ankurah_kvo::*;
use std::sync::{Arc, Weak};

struct Person {
    notifier: Notifier,
    name: Property<String>,
}

impl Person {
    fn new(registry: &Registry, name: &str) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Person>| Person {
            notifier: registry.notifier(ObjectHandle::from_weak(weak.clone()).with_keys(["name"])),
            name: Property::new("name", name.to_string()),
        })
    }

    fn set_name(&self, name: &str) -> Result<()> { self.name.set(&self.notifier, name.to_string()) }
}

let registry = Registry::new();
let buffy = Person::new(&registry, "Buffy");

let observer = registry
    .observe(buffy.notifier.handle(), "name", |change: &Change| println!("{change}"))
    .unwrap();
buffy.set_name("Willow").unwrap();
// Should print:
// obj:0x….name: "Buffy" -> "Willow"

registry.unregister(buffy.notifier.handle(), "name", observer);
buffy.set_name("Xander").unwrap(); // nobody is told
```
*/

mod callback;
mod change;
mod config;
mod error;
mod identity;
mod property;
mod registry;
mod value;

pub use callback::*;
pub use change::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use property::*;
pub use registry::*;
pub use value::*;
