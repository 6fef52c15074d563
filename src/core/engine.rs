//! Engine struct and the two game loops
//!
//! The variable loop ticks as fast as the configured frame cap allows and
//! runs, in this order: input, camera movement, draw, object start, update,
//! late update, delayed invocations, repaint. The fixed loop ticks at the
//! configured fixed step and only runs fixed update. Both loops share one
//! lock over the game and its [`EngineContext`], so a tick of one never
//! overlaps a tick of the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::core::{
    BackgroundTask, EngineConfig, EngineContext, EngineError, EngineEvent, EngineHandle, Host,
    init_logging,
};
use crate::input::{InputEvent, MouseClick};
use crate::objects::{Hook, flush_destroyed, init_pending, run_hook};

/// Set while an engine is running in this process
static ENGINE_RUNNING: AtomicBool = AtomicBool::new(false);

/// Game trait that users implement. Every hook is optional.
pub trait Game: Send + 'static {
    /// Called once before the loops start
    fn load(&mut self, _ctx: &mut EngineContext) {}

    /// Called every variable frame before the rendering queue paints
    fn draw(&mut self, _ctx: &mut EngineContext) {}

    /// Called every variable frame before object updates
    fn update(&mut self, _ctx: &mut EngineContext) {}

    /// Called every fixed tick after object fixed updates
    fn fixed_update(&mut self, _ctx: &mut EngineContext) {}

    /// Called for every input event, after it was folded into `ctx.input`
    fn on_input(&mut self, _ctx: &mut EngineContext, _event: &InputEvent) {}

    /// Called when the frame buffer was resized
    fn on_resize(&mut self, _ctx: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called once after both loops stopped
    fn shutdown(&mut self, _ctx: &mut EngineContext) {}
}

/// Everything a loop tick touches
struct LoopState<G> {
    game: G,
    ctx: EngineContext,
    inbox: mpsc::UnboundedReceiver<InputEvent>,
    loaded: bool,
    last_frame: Option<Instant>,
    last_fixed: Option<Instant>,
}

type SharedState<G> = Arc<Mutex<LoopState<G>>>;

fn lock_state<G>(state: &SharedState<G>) -> MutexGuard<'_, LoopState<G>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears [`ENGINE_RUNNING`] when dropped
struct RunGuard;

impl RunGuard {
    fn acquire() -> Result<Self, EngineError> {
        ENGINE_RUNNING
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| RunGuard)
            .map_err(|_| EngineError::AlreadyRunning)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        ENGINE_RUNNING.store(false, Ordering::SeqCst);
    }
}

/// Loops of a started engine
struct Running {
    runtime: Runtime,
    variable: BackgroundTask,
    fixed: BackgroundTask,
    _guard: RunGuard,
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    state: SharedState<G>,
    handle: EngineHandle,
    running: Option<Running>,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is invalid
    pub fn new(config: EngineConfig, game: G) -> Result<Self, EngineError> {
        config.validate()?;
        let (handle, inbox) = EngineHandle::channel();
        let state = LoopState {
            game,
            ctx: EngineContext::new(&config),
            inbox,
            loaded: false,
            last_frame: None,
            last_fixed: None,
        };
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(state)),
            handle,
            running: None,
        })
    }

    /// Configuration the engine was built with
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for dispatching input and requesting a close
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Whether the loops are running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Run `f` with the game and context locked
    pub fn with_game<R>(&self, f: impl FnOnce(&mut G, &mut EngineContext) -> R) -> R {
        let mut state = lock_state(&self.state);
        let LoopState { game, ctx, .. } = &mut *state;
        f(game, ctx)
    }

    /// Run `f` with the context locked
    pub fn with_context<R>(&self, f: impl FnOnce(&mut EngineContext) -> R) -> R {
        self.with_game(|_, ctx| f(ctx))
    }

    /// Call the game's `load` hook.
    ///
    /// [`Engine::start`] calls this if it has not happened yet.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyLoaded`] on a second call
    pub fn load(&self) -> Result<(), EngineError> {
        let mut state = lock_state(&self.state);
        if state.loaded {
            return Err(EngineError::AlreadyLoaded);
        }
        let LoopState { game, ctx, .. } = &mut *state;
        game.load(ctx);
        state.loaded = true;
        log::info!("Game loaded: {}", self.config.title);
        Ok(())
    }

    /// Run one variable frame now, timed by the wall clock
    pub fn variable_frame(&self) {
        let mut state = lock_state(&self.state);
        variable_tick(&mut state, None, None, &self.handle);
    }

    /// Run one variable frame with an explicit delta
    pub fn advance_frame(&self, delta: Duration) {
        let mut state = lock_state(&self.state);
        variable_tick(&mut state, Some(delta), None, &self.handle);
    }

    /// Run one fixed tick now
    pub fn fixed_frame(&self) {
        let mut state = lock_state(&self.state);
        fixed_tick(&mut state);
    }

    /// Start both loops on a fresh runtime and return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] if any engine in this process
    /// is running, or [`EngineError::Runtime`] if the runtime cannot be built
    pub fn start(&mut self, host: Arc<dyn Host>) -> Result<(), EngineError> {
        if self.running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let guard = RunGuard::acquire()?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("bee-engine-loop")
            .enable_time()
            .build()?;

        if !lock_state(&self.state).loaded {
            self.load()?;
        }
        self.handle.reset();
        {
            let (width, height) = host.size();
            lock_state(&self.state).ctx.resize(width, height);
        }

        let variable = {
            let state = Arc::clone(&self.state);
            let handle = self.handle.clone();
            let host = Arc::clone(&host);
            BackgroundTask::new("variable", self.config.variable_interval(), move || {
                let mut state = lock_state(&state);
                variable_tick(&mut state, None, Some(host.as_ref()), &handle);
            })
        };
        let fixed = {
            let state = Arc::clone(&self.state);
            BackgroundTask::new("fixed", self.config.fixed_interval(), move || {
                fixed_tick(&mut lock_state(&state));
            })
        };

        let mut running = Running {
            runtime,
            variable,
            fixed,
            _guard: guard,
        };
        running.variable.start(running.runtime.handle());
        running.fixed.start(running.runtime.handle());
        self.running = Some(running);

        log::info!(
            "Engine started: {} ({}x{}, frame every {:?}, fixed every {:?})",
            self.config.title,
            self.config.width,
            self.config.height,
            self.config.variable_interval(),
            self.config.fixed_interval()
        );
        Ok(())
    }

    /// Stop both loops, waiting for in-flight ticks, then shut the game down.
    ///
    /// Does nothing if the engine is not running.
    pub fn stop(&mut self) {
        let Some(Running {
            runtime,
            mut variable,
            mut fixed,
            _guard: guard,
        }) = self.running.take()
        else {
            return;
        };
        self.handle.request_close();
        runtime.block_on(async {
            variable.stop().await;
            fixed.stop().await;
        });

        let mut state = lock_state(&self.state);
        let LoopState { game, ctx, .. } = &mut *state;
        ctx.events.push(EngineEvent::GameClosing);
        game.shutdown(ctx);
        log::info!("Engine stopped after {} frames", ctx.time.frame_count());
        log::debug!("{}", ctx.stats.summary());
        drop(state);
        drop(runtime);
        drop(guard);
    }

    /// Install logging, start the loops and block in the host's event pump
    /// until it returns, then stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start or the host fails
    pub fn run(mut self, host: impl Host) -> Result<(), EngineError> {
        init_logging(self.config.log_filter.as_deref());
        let host: Arc<dyn Host> = Arc::new(host);
        self.start(Arc::clone(&host))?;
        let result = host.run(self.handle());
        self.stop();
        result
    }
}

impl<G: Game> Drop for Engine<G> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<G: Game> std::fmt::Debug for Engine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Loop bodies
// ============================================================================

fn variable_tick<G: Game>(
    state: &mut LoopState<G>,
    delta: Option<Duration>,
    host: Option<&dyn Host>,
    handle: &EngineHandle,
) {
    let started = Instant::now();
    let interval = state
        .last_frame
        .map_or(Duration::ZERO, |last| started.saturating_duration_since(last));
    state.last_frame = Some(started);

    let LoopState {
        game, ctx, inbox, ..
    } = state;

    ctx.events.swap();
    drain_input(game, ctx, inbox);

    match delta {
        Some(delta) => ctx.time.advance(delta),
        None => ctx.time.update(),
    }

    for (camera, snapshot) in ctx.cameras.tick_all(ctx.time.delta_seconds()) {
        ctx.events.push(EngineEvent::CameraMoved {
            camera,
            position: snapshot.position,
            scale: snapshot.scale,
        });
    }

    game.draw(ctx);
    let frame = ctx.frame().clone();
    let report = ctx.rendering.render(
        &frame,
        ctx.background,
        ctx.cameras.active().transform(),
        ctx.time.elapsed_seconds(),
    );
    ctx.events.extend(report.events);

    init_pending(ctx);
    game.update(ctx);
    run_hook(ctx, Hook::Update);
    run_hook(ctx, Hook::LateUpdate);
    flush_destroyed(ctx);
    ctx.run_due_invocations();
    ctx.input.end_frame();

    ctx.stats.frames.record(interval, started.elapsed());
    if ctx.stats.should_report(Instant::now()) {
        log::debug!("{}", ctx.stats.summary());
    }

    if let Some(host) = host {
        host.request_repaint(&frame);
    }
    if ctx.should_quit() {
        handle.request_close();
    }
}

fn drain_input<G: Game>(
    game: &mut G,
    ctx: &mut EngineContext,
    inbox: &mut mpsc::UnboundedReceiver<InputEvent>,
) {
    while let Ok(event) = inbox.try_recv() {
        ctx.input.apply(&event);
        match event {
            InputEvent::MouseUp { button, position } => {
                let world = ctx.cameras.active().screen_to_world(position);
                let click = MouseClick {
                    button,
                    screen: position,
                    world,
                };
                for sprite in ctx.rendering.dispatch_click(&click) {
                    ctx.events.push(EngineEvent::SpriteClicked {
                        sprite,
                        button,
                        position: world,
                    });
                }
            }
            InputEvent::Resized { width, height } => {
                if ctx.resize(width, height) {
                    game.on_resize(ctx, width, height);
                }
            }
            InputEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                ctx.quit();
            }
            _ => {}
        }
        game.on_input(ctx, &event);
    }
}

fn fixed_tick<G: Game>(state: &mut LoopState<G>) {
    let started = Instant::now();
    let interval = state
        .last_fixed
        .map_or(Duration::ZERO, |last| started.saturating_duration_since(last));
    state.last_fixed = Some(started);

    let LoopState { game, ctx, .. } = state;
    ctx.time.tick_fixed();
    run_hook(ctx, Hook::FixedUpdate);
    game.fixed_update(ctx);
    ctx.stats.fixed.record(interval, started.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Behavior, GameObject, HookResult, ObjectState, Update};
    use crate::renderer::{Bitmap, Color, Paintable, Sprite, SpriteHandle};
    use glam::Vec2;

    #[derive(Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Game for Recorder {
        fn load(&mut self, _ctx: &mut EngineContext) {
            self.log.lock().unwrap().push("load".into());
        }
        fn draw(&mut self, _ctx: &mut EngineContext) {
            self.log.lock().unwrap().push("draw".into());
        }
        fn update(&mut self, _ctx: &mut EngineContext) {
            self.log.lock().unwrap().push("update".into());
        }
        fn fixed_update(&mut self, _ctx: &mut EngineContext) {
            self.log.lock().unwrap().push("fixed".into());
        }
    }

    struct Tracer {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Behavior for Tracer {
        fn start(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
            self.log.lock().unwrap().push("start".into());
            Ok(())
        }
        fn as_update(&mut self) -> Option<&mut dyn Update> {
            Some(self)
        }
    }

    impl Update for Tracer {
        fn update(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
            self.log.lock().unwrap().push("object update".into());
            Ok(())
        }
    }

    fn engine() -> (Engine<Recorder>, Arc<Mutex<Vec<String>>>) {
        let game = Recorder::default();
        let log = Arc::clone(&game.log);
        let engine = Engine::new(EngineConfig::default().with_size(32, 32), game).unwrap();
        (engine, log)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::default().with_fixed_delta(0);
        assert!(matches!(
            Engine::new(config, Recorder::default()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_load_only_once() {
        let (engine, log) = engine();
        engine.load().unwrap();
        assert!(matches!(engine.load(), Err(EngineError::AlreadyLoaded)));
        assert_eq!(*log.lock().unwrap(), vec!["load"]);
    }

    #[test]
    fn test_variable_frame_order() {
        let (engine, log) = engine();
        let tracer = Tracer {
            log: Arc::clone(&log),
        };
        let _object = engine.with_context(|ctx| ctx.spawn(GameObject::new("t").with_behavior(tracer)));

        engine.advance_frame(Duration::from_millis(16));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["draw", "start", "update", "object update"]
        );

        engine.fixed_frame();
        assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("fixed"));
    }

    #[test]
    fn test_frame_paints_background_and_sprites() {
        let (engine, _log) = engine();
        let sprite = SpriteHandle::new(Sprite::new(Vec2::new(2.0, 2.0), Bitmap::filled(2, 2, Color::RED)));
        engine.with_context(|ctx| {
            ctx.background = Color::BLUE;
            ctx.show(&sprite).unwrap();
        });

        // the add is staged during the first frame and painted in the second
        engine.advance_frame(Duration::from_millis(16));
        engine.advance_frame(Duration::from_millis(16));

        engine.with_context(|ctx| {
            let frame = ctx.frame().lock();
            assert_eq!(frame.get_pixel(0, 0).unwrap(), Color::BLUE);
            // world origin sits at the viewport center
            assert_eq!(frame.get_pixel(18, 18).unwrap(), Color::RED);
        });
        assert!(sprite.is_shown());
    }

    #[test]
    fn test_close_request_input_sets_quit() {
        let (engine, _log) = engine();
        let handle = engine.handle();
        handle.dispatch(InputEvent::CloseRequested);
        engine.advance_frame(Duration::from_millis(1));
        assert!(handle.is_close_requested());
        assert!(engine.with_context(|ctx| ctx.should_quit()));
    }

    #[test]
    fn test_resize_input() {
        let (engine, _log) = engine();
        engine.handle().dispatch(InputEvent::Resized {
            width: 64,
            height: 48,
        });
        engine.advance_frame(Duration::from_millis(1));
        engine.with_context(|ctx| assert_eq!((ctx.width(), ctx.height()), (64, 48)));
    }

    #[test]
    fn test_camera_moves_are_reported_next_frame() {
        let (engine, _log) = engine();
        engine.advance_frame(Duration::from_millis(1));
        engine.advance_frame(Duration::from_millis(1));
        engine.with_context(|ctx| {
            assert!(ctx
                .events
                .iter()
                .any(|e| matches!(e, EngineEvent::CameraMoved { camera: 0, .. })));
        });
    }
}
