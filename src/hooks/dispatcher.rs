use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::function::arguments::Arguments;
use crate::function::metadata::FunctionMetadata;
use crate::function::result::FunctionResult;
use crate::function::types::FunctionError;

use super::events::{InvokedEvent, InvokingEvent};

// ハンドラの型
pub type InvokingHandler = Arc<dyn Fn(&mut InvokingEvent) + Send + Sync>;
pub type InvokedHandler = Arc<dyn Fn(&mut InvokedEvent) + Send + Sync>;

/// Opaque token identifying a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

/// Holds the two handler lists and runs them around every pipeline step.
///
/// Handlers run synchronously in registration order against a shared event.
/// Each list is snapshotted before dispatch, so a handler may register or
/// unregister others without deadlocking.
#[derive(Clone, Default)]
pub struct HookDispatcher {
    invoking: Arc<RwLock<Vec<(HookHandle, InvokingHandler)>>>,
    invoked: Arc<RwLock<Vec<(HookHandle, InvokedHandler)>>>,
    next_handle: Arc<AtomicU64>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_handle(&self) -> HookHandle {
        HookHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register_invoking<F>(&self, handler: F) -> HookHandle
    where
        F: Fn(&mut InvokingEvent) + Send + Sync + 'static,
    {
        let handle = self.allocate_handle();
        self.invoking
            .write()
            .unwrap()
            .push((handle, Arc::new(handler)));
        handle
    }

    pub fn register_invoked<F>(&self, handler: F) -> HookHandle
    where
        F: Fn(&mut InvokedEvent) + Send + Sync + 'static,
    {
        let handle = self.allocate_handle();
        self.invoked
            .write()
            .unwrap()
            .push((handle, Arc::new(handler)));
        handle
    }

    /// Removes the handler registered under `handle`, from whichever list
    /// holds it. Unknown or already-removed handles are a no-op.
    pub fn unregister(&self, handle: HookHandle) {
        self.invoking.write().unwrap().retain(|(h, _)| *h != handle);
        self.invoked.write().unwrap().retain(|(h, _)| *h != handle);
    }

    pub fn fire_invoking(
        &self,
        metadata: &FunctionMetadata,
        arguments: Arguments,
    ) -> InvokingEvent {
        let handlers: Vec<InvokingHandler> = self
            .invoking
            .read()
            .unwrap()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut event = InvokingEvent::new(metadata.clone(), arguments);
        for handler in handlers {
            handler(&mut event);
        }
        event
    }

    pub fn fire_invoked(
        &self,
        metadata: &FunctionMetadata,
        arguments: Arguments,
        result: Option<FunctionResult>,
        error: Option<FunctionError>,
    ) -> InvokedEvent {
        let handlers: Vec<InvokedHandler> = self
            .invoked
            .read()
            .unwrap()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut event = InvokedEvent::new(metadata.clone(), arguments, result, error);
        for handler in handlers {
            handler(&mut event);
        }
        event
    }

    pub fn invoking_count(&self) -> usize {
        self.invoking.read().unwrap().len()
    }

    pub fn invoked_count(&self) -> usize {
        self.invoked.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;

    fn metadata() -> FunctionMetadata {
        FunctionMetadata::new("math", "add")
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let dispatcher = HookDispatcher::new();
        dispatcher.register_invoking(|event| {
            event.arguments.set("trace", "first");
        });
        dispatcher.register_invoking(|event| {
            let trace = event
                .arguments
                .get("trace")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            event.arguments.set("trace", format!("{},second", trace));
        });

        let event = dispatcher.fire_invoking(&metadata(), Arguments::new());
        assert_eq!(
            event.into_arguments().get("trace"),
            Some(&json!("first,second"))
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let dispatcher = HookDispatcher::new();
        let handle = dispatcher.register_invoking(|event| event.cancel());
        assert_eq!(dispatcher.invoking_count(), 1);

        dispatcher.unregister(handle);
        dispatcher.unregister(handle);
        assert_eq!(dispatcher.invoking_count(), 0);

        let event = dispatcher.fire_invoking(&metadata(), Arguments::new());
        assert!(!event.cancel_requested());
    }

    #[test]
    fn test_handles_are_distinct_across_lists() {
        let dispatcher = HookDispatcher::new();
        let invoking = dispatcher.register_invoking(|_| {});
        let invoked = dispatcher.register_invoked(|_| {});
        assert_ne!(invoking, invoked);

        dispatcher.unregister(invoked);
        assert_eq!(dispatcher.invoking_count(), 1);
        assert_eq!(dispatcher.invoked_count(), 0);
    }

    #[test]
    fn test_fire_invoked_passes_result_and_error() {
        let dispatcher = HookDispatcher::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        dispatcher.register_invoked(move |event| {
            if event.error.is_some() {
                seen_clone.fetch_add(1, Ordering::SeqCst);
                event.error = None;
            }
        });

        let event = dispatcher.fire_invoked(
            &metadata(),
            Arguments::new(),
            None,
            Some(FunctionError::Execution("transient".to_string())),
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(event.error.is_none());
    }

    #[test]
    fn test_handler_may_register_during_dispatch() {
        let dispatcher = HookDispatcher::new();
        let inner = dispatcher.clone();
        dispatcher.register_invoking(move |_| {
            inner.register_invoked(|_| {});
        });

        dispatcher.fire_invoking(&metadata(), Arguments::new());
        assert_eq!(dispatcher.invoked_count(), 1);
    }

    #[test]
    fn test_no_handlers_returns_untouched_event() {
        let dispatcher = HookDispatcher::new();
        let event = dispatcher.fire_invoked(
            &metadata(),
            Arguments::new().with("a", 2),
            None,
            None,
        );
        assert!(!event.cancel_requested());
        assert!(!event.repeat_requested());
        assert_eq!(event.arguments.get("a"), Some(&json!(2)));
    }
}
