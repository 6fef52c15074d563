//! Start, update and destroy passes over the object registries
//!
//! Every pass works on a snapshot of the registry, so objects spawned or
//! destroyed by a hook take effect on the next pass. Failures are isolated
//! per object: a returned error or a panic is logged and the pass moves on.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::core::{EngineContext, EngineEvent};
use crate::objects::registry::lock_object;
use crate::objects::{GameObject, GameObjectHandle, HookResult, ObjectId};

/// Per-frame hook driven over a subscriber registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Update,
    LateUpdate,
    FixedUpdate,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::Update => "update",
            Hook::LateUpdate => "late_update",
            Hook::FixedUpdate => "fixed_update",
        }
    }
}

/// Start every pending object and subscribe it to the hooks it answers
pub(crate) fn init_pending(ctx: &mut EngineContext) {
    for handle in ctx.objects.take_pending() {
        let mut guard = lock_object(&handle);
        let object = &mut *guard;
        let id = object.state.id();
        if !ctx.objects.contains(id) {
            continue;
        }

        let (mut update, mut late_update, mut fixed_update) = (false, false, false);
        if let Some(behavior) = object.behavior.as_mut() {
            let state = &mut object.state;
            report(id, "start", catch_unwind(AssertUnwindSafe(|| behavior.start(state, ctx))));
            update = behavior.as_update().is_some();
            late_update = behavior.as_late_update().is_some();
            fixed_update = behavior.as_fixed_update().is_some();
        }

        ctx.objects.enroll(id, &handle, update, late_update, fixed_update);
        ctx.events.push(EngineEvent::ObjectStarted { object: id });
        log::debug!(
            "object {id} '{}' started (update: {update}, late: {late_update}, fixed: {fixed_update})",
            object.state.name
        );

        if object.state.is_destroy_requested() {
            retire(ctx, object);
        }
    }
}

/// Run one hook over its enabled subscribers
pub(crate) fn run_hook(ctx: &mut EngineContext, hook: Hook) {
    let snapshot = ctx.objects.subscribers(hook).live();

    for (_, handle) in snapshot {
        let mut guard = lock_object(&handle);
        let object = &mut *guard;
        let id = object.state.id();
        if !object.state.is_enabled() || object.state.is_destroy_requested() {
            continue;
        }

        let state = &mut object.state;
        let outcome = object.behavior.as_mut().and_then(|behavior| match hook {
            Hook::Update => behavior
                .as_update()
                .map(|h| catch_unwind(AssertUnwindSafe(|| h.update(state, ctx)))),
            Hook::LateUpdate => behavior
                .as_late_update()
                .map(|h| catch_unwind(AssertUnwindSafe(|| h.late_update(state, ctx)))),
            Hook::FixedUpdate => behavior
                .as_fixed_update()
                .map(|h| catch_unwind(AssertUnwindSafe(|| h.fixed_update(state, ctx)))),
        });

        match outcome {
            Some(result) => report(id, hook.name(), result),
            None => {
                log::debug!("object {id} no longer answers {}, unsubscribed", hook.name());
                ctx.objects.subscribers(hook).remove(id.0);
            }
        }

        if object.state.is_destroy_requested() {
            retire(ctx, object);
        }
    }
}

/// Fire `on_destroy` for objects destroyed through the registry
pub(crate) fn flush_destroyed(ctx: &mut EngineContext) {
    for handle in ctx.objects.take_graveyard() {
        finish_destroy(ctx, &handle);
    }
}

fn finish_destroy(ctx: &mut EngineContext, handle: &GameObjectHandle) {
    let mut guard = lock_object(handle);
    let object = &mut *guard;
    let id = object.state.id();
    if let Some(behavior) = object.behavior.as_mut() {
        let state = &mut object.state;
        report(
            id,
            "on_destroy",
            catch_unwind(AssertUnwindSafe(|| {
                behavior.on_destroy(state);
                Ok(())
            })),
        );
    }
    ctx.events.push(EngineEvent::ObjectDestroyed { object: id });
    log::debug!("object {id} destroyed");
}

/// Destroy an object whose own hook asked for it
fn retire(ctx: &mut EngineContext, object: &mut GameObject) {
    let id = object.state.id();
    if !ctx.objects.contains(id) {
        return;
    }
    ctx.objects.forget(id);
    if let Some(behavior) = object.behavior.as_mut() {
        let state = &mut object.state;
        report(
            id,
            "on_destroy",
            catch_unwind(AssertUnwindSafe(|| {
                behavior.on_destroy(state);
                Ok(())
            })),
        );
    }
    ctx.events.push(EngineEvent::ObjectDestroyed { object: id });
    log::debug!("object {id} destroyed itself");
}

fn report(id: ObjectId, hook: &str, result: std::thread::Result<HookResult>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(error)) => log::error!("object {id} failed in {hook}: {error}"),
        Err(payload) => log::error!("object {id} panicked in {hook}: {}", panic_message(&*payload)),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::core::EngineConfig;
    use crate::objects::{Behavior, FixedUpdate, LateUpdate, ObjectState, Update};

    fn context() -> EngineContext {
        EngineContext::new(&EngineConfig::default().with_size(8, 8))
    }

    #[derive(Default, Clone)]
    struct Counters {
        starts: Arc<AtomicUsize>,
        updates: Arc<AtomicUsize>,
        late: Arc<AtomicUsize>,
        fixed: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
    }

    /// Answers update and fixed update, but not late update
    struct Worker {
        counters: Counters,
        fail: bool,
        panic: bool,
        destroy_after: Option<usize>,
    }

    impl Worker {
        fn new(counters: &Counters) -> Self {
            Self {
                counters: counters.clone(),
                fail: false,
                panic: false,
                destroy_after: None,
            }
        }
    }

    impl Behavior for Worker {
        fn start(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_destroy(&mut self, _object: &mut ObjectState) {
            self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        }
        fn as_update(&mut self) -> Option<&mut dyn Update> {
            Some(self)
        }
        fn as_fixed_update(&mut self) -> Option<&mut dyn FixedUpdate> {
            Some(self)
        }
    }

    impl Update for Worker {
        fn update(&mut self, object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
            let count = self.counters.updates.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic {
                panic!("worker exploded");
            }
            if self.fail {
                return Err("worker failed".into());
            }
            if self.destroy_after == Some(count) {
                object.destroy();
            }
            Ok(())
        }
    }

    impl FixedUpdate for Worker {
        fn fixed_update(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
            self.counters.fixed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Answers late update only while `enabled` is set
    struct Fickle {
        enabled: Arc<AtomicBool>,
        counters: Counters,
    }

    impl Behavior for Fickle {
        fn as_late_update(&mut self) -> Option<&mut dyn LateUpdate> {
            if self.enabled.load(Ordering::SeqCst) {
                Some(self)
            } else {
                None
            }
        }
    }

    impl LateUpdate for Fickle {
        fn late_update(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
            self.counters.late.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_start_enrolls_by_capability() {
        let mut ctx = context();
        let counters = Counters::default();
        let handle = ctx.spawn(GameObject::new("worker").with_behavior(Worker::new(&counters)));
        let id = handle.lock().unwrap().id();

        init_pending(&mut ctx);

        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.objects.pending_count(), 0);
        assert_eq!(ctx.objects.update_count(), 1);
        assert_eq!(ctx.objects.late_update_count(), 0);
        assert_eq!(ctx.objects.fixed_update_count(), 1);
        ctx.events.swap();
        assert!(ctx
            .events
            .iter()
            .any(|e| *e == EngineEvent::ObjectStarted { object: id }));
    }

    #[test]
    fn test_object_without_behavior_only_lives_in_all() {
        let mut ctx = context();
        let _handle = ctx.spawn(GameObject::new("plain"));
        init_pending(&mut ctx);
        assert_eq!(ctx.objects.len(), 1);
        assert_eq!(ctx.objects.update_count(), 0);
    }

    #[test]
    fn test_first_update_in_same_frame_as_start() {
        let mut ctx = context();
        let counters = Counters::default();
        let _handle = ctx.spawn(GameObject::new("w").with_behavior(Worker::new(&counters)));

        init_pending(&mut ctx);
        run_hook(&mut ctx, Hook::Update);

        assert_eq!(counters.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_object_leaves_update_pass() {
        let mut ctx = context();
        let counters = Counters::default();
        let handle = ctx.spawn(GameObject::new("w").with_behavior(Worker::new(&counters)));
        init_pending(&mut ctx);
        run_hook(&mut ctx, Hook::Update);

        drop(handle);
        run_hook(&mut ctx, Hook::Update);

        assert_eq!(counters.updates.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.objects.update_count(), 0);
        assert!(ctx.objects.is_empty());
    }

    #[test]
    fn test_disabled_objects_are_skipped_not_removed() {
        let mut ctx = context();
        let counters = Counters::default();
        let handle = ctx.spawn(GameObject::new("w").with_behavior(Worker::new(&counters)));
        init_pending(&mut ctx);

        handle.lock().unwrap().set_enabled(false);
        run_hook(&mut ctx, Hook::Update);
        run_hook(&mut ctx, Hook::FixedUpdate);
        assert_eq!(counters.updates.load(Ordering::SeqCst), 0);
        assert_eq!(counters.fixed.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.objects.update_count(), 1);

        handle.lock().unwrap().set_enabled(true);
        run_hook(&mut ctx, Hook::Update);
        assert_eq!(counters.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_are_isolated_per_object() {
        let mut ctx = context();
        let counters = Counters::default();
        let mut failing = Worker::new(&counters);
        failing.fail = true;
        let mut panicking = Worker::new(&counters);
        panicking.panic = true;

        let _a = ctx.spawn(GameObject::new("a").with_behavior(Worker::new(&counters)));
        let _b = ctx.spawn(GameObject::new("b").with_behavior(failing));
        let _c = ctx.spawn(GameObject::new("c").with_behavior(panicking));
        let _d = ctx.spawn(GameObject::new("d").with_behavior(Worker::new(&counters)));

        init_pending(&mut ctx);
        run_hook(&mut ctx, Hook::Update);
        run_hook(&mut ctx, Hook::Update);

        assert_eq!(counters.updates.load(Ordering::SeqCst), 8);
        assert_eq!(ctx.objects.update_count(), 4);
    }

    #[test]
    fn test_capability_miss_prunes_only_that_hook() {
        let mut ctx = context();
        let counters = Counters::default();
        let enabled = Arc::new(AtomicBool::new(true));
        let _handle = ctx.spawn(GameObject::new("fickle").with_behavior(Fickle {
            enabled: Arc::clone(&enabled),
            counters: counters.clone(),
        }));

        init_pending(&mut ctx);
        run_hook(&mut ctx, Hook::LateUpdate);
        assert_eq!(counters.late.load(Ordering::SeqCst), 1);

        enabled.store(false, Ordering::SeqCst);
        run_hook(&mut ctx, Hook::LateUpdate);
        assert_eq!(counters.late.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.objects.late_update_count(), 0);
        assert_eq!(ctx.objects.len(), 1);
    }

    #[test]
    fn test_object_can_destroy_itself() {
        let mut ctx = context();
        let counters = Counters::default();
        let mut worker = Worker::new(&counters);
        worker.destroy_after = Some(2);
        let handle = ctx.spawn(GameObject::new("bullet").with_behavior(worker));
        let id = handle.lock().unwrap().id();

        init_pending(&mut ctx);
        for _ in 0..4 {
            run_hook(&mut ctx, Hook::Update);
        }

        assert_eq!(counters.updates.load(Ordering::SeqCst), 2);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
        assert!(!ctx.objects.contains(id));
        ctx.events.swap();
        assert!(ctx
            .events
            .iter()
            .any(|e| *e == EngineEvent::ObjectDestroyed { object: id }));
    }

    #[test]
    fn test_registry_destroy_fires_on_destroy_at_flush() {
        let mut ctx = context();
        let counters = Counters::default();
        let handle = ctx.spawn(GameObject::new("w").with_behavior(Worker::new(&counters)));
        let id = handle.lock().unwrap().id();
        init_pending(&mut ctx);

        assert!(ctx.destroy(id));
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 0);
        run_hook(&mut ctx, Hook::Update);
        assert_eq!(counters.updates.load(Ordering::SeqCst), 0);

        flush_destroyed(&mut ctx);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroyed_before_start_never_starts() {
        let mut ctx = context();
        let counters = Counters::default();
        let handle = ctx.spawn(GameObject::new("w").with_behavior(Worker::new(&counters)));
        let id = handle.lock().unwrap().id();

        ctx.destroy(id);
        init_pending(&mut ctx);

        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.objects.update_count(), 0);
    }

    #[test]
    fn test_spawn_from_hook_starts_next_pass() {
        struct Spawner {
            spawned: Arc<Mutex<Vec<crate::objects::GameObjectHandle>>>,
        }
        impl Behavior for Spawner {
            fn start(&mut self, _object: &mut ObjectState, ctx: &mut EngineContext) -> HookResult {
                let child = ctx.spawn(GameObject::new("child"));
                self.spawned.lock().unwrap().push(child);
                Ok(())
            }
        }

        let mut ctx = context();
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let _parent = ctx.spawn(GameObject::new("parent").with_behavior(Spawner {
            spawned: Arc::clone(&spawned),
        }));

        init_pending(&mut ctx);
        assert_eq!(ctx.objects.pending_count(), 1);
        init_pending(&mut ctx);
        assert_eq!(ctx.objects.pending_count(), 0);
        assert_eq!(ctx.objects.len(), 2);
    }
}
