//! Process-wide plugin slots keyed by type.
//!
//! The host copies the plugin table it receives, so callbacks can never find
//! their Rust state from the table address. Each plugin type instead owns one
//! leaked slot here; monomorphised trampolines look it up by `TypeId`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{PluginError, PluginResult};

type Slots = Mutex<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>;

fn slots() -> &'static Slots {
    static SLOTS: OnceLock<Slots> = OnceLock::new();
    SLOTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The slot of type `T`, if registered.
pub fn get<T: Any + Send + Sync>() -> Option<&'static T> {
    let slot = *slots().lock().get(&TypeId::of::<T>())?;
    slot.downcast_ref::<T>()
}

/// The slot of type `T`, building it with `make` on first use.
///
/// `make` runs without the registry lock held. If two threads race, the
/// first insert wins and the other value is dropped.
pub fn get_or_try_insert<T, F>(make: F) -> PluginResult<&'static T>
where
    T: Any + Send + Sync,
    F: FnOnce() -> PluginResult<T>,
{
    if let Some(existing) = get::<T>() {
        return Ok(existing);
    }
    let value = make()?;
    let mut map = slots().lock();
    let slot = *map.entry(TypeId::of::<T>()).or_insert_with(|| {
        debug!(slot = std::any::type_name::<T>(), "registered plugin slot");
        let leaked: &'static (dyn Any + Send + Sync) = Box::leak(Box::new(value));
        leaked
    });
    drop(map);
    slot.downcast_ref::<T>()
        .ok_or(PluginError::NotRegistered(std::any::type_name::<T>()))
}
