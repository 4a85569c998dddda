//! Change listener registration and dispatch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;

/// Error a listener may return; it is logged and otherwise ignored.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Invoked with the new value of a property after a reload changed it.
///
/// A removed property is reported as `None`.
pub trait ChangeListener: Send + Sync {
    fn value_changed(&self, new_value: Option<&str>) -> Result<(), ListenerError>;
}

impl<F> ChangeListener for F
where
    F: Fn(Option<&str>) -> Result<(), ListenerError> + Send + Sync,
{
    fn value_changed(&self, new_value: Option<&str>) -> Result<(), ListenerError> {
        self(new_value)
    }
}

/// Property name -> listeners, in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<String, Vec<Arc<dyn ChangeListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, property: &str, listener: Arc<dyn ChangeListener>) {
        self.listeners
            .entry(property.to_string())
            .or_default()
            .push(listener);
    }

    /// Number of listeners registered for `property`.
    pub fn count(&self, property: &str) -> usize {
        self.listeners.get(property).map_or(0, |l| l.len())
    }

    /// Run every listener for `property`. Returns how many failed.
    ///
    /// Listeners run on a copy of the list, so a listener may register
    /// further listeners without deadlocking. A failing or panicking
    /// listener does not stop the rest.
    pub fn notify(&self, property: &str, new_value: Option<&str>) -> usize {
        let listeners = match self.listeners.get(property) {
            Some(entry) => entry.value().clone(),
            None => return 0,
        };

        let mut failures = 0;
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.value_changed(new_value))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!(property = %property, error = %e, "Configuration change listener failed");
                }
                Err(_) => {
                    failures += 1;
                    tracing::error!(property = %property, "Configuration change listener panicked");
                }
            }
        }
        failures
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for entry in self.listeners.iter() {
            map.entry(entry.key(), &entry.value().len());
        }
        map.finish()
    }
}
