//! Engine loops driven by a headless host

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::sleep;
use std::time::Duration;

use bee_engine::prelude::*;

/// Only one engine may run per process
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Counting {
    loads: usize,
    draws: usize,
    updates: usize,
    fixed: usize,
    shutdowns: usize,
    clicked: Vec<u64>,
    quit_after: Option<usize>,
}

impl Game for Counting {
    fn load(&mut self, _ctx: &mut EngineContext) {
        self.loads += 1;
    }

    fn draw(&mut self, _ctx: &mut EngineContext) {
        self.draws += 1;
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        self.updates += 1;
        for event in ctx.events.iter() {
            if let EngineEvent::SpriteClicked { sprite, .. } = event {
                self.clicked.push(*sprite);
            }
        }
        if self.quit_after.is_some_and(|n| self.updates >= n) {
            ctx.quit();
        }
    }

    fn fixed_update(&mut self, _ctx: &mut EngineContext) {
        self.fixed += 1;
    }

    fn shutdown(&mut self, _ctx: &mut EngineContext) {
        self.shutdowns += 1;
    }
}

#[derive(Clone, Default)]
struct Ticks {
    updates: Arc<AtomicUsize>,
    fixed: Arc<AtomicUsize>,
}

struct Ticker(Ticks);

impl Behavior for Ticker {
    fn as_update(&mut self) -> Option<&mut dyn Update> {
        Some(self)
    }

    fn as_fixed_update(&mut self) -> Option<&mut dyn FixedUpdate> {
        Some(self)
    }
}

impl Update for Ticker {
    fn update(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
        self.0.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl FixedUpdate for Ticker {
    fn fixed_update(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
        self.0.fixed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_size(64, 64)
        .with_fps_limit(Some(200))
        .with_fixed_delta(10)
}

#[test]
fn test_run_drives_both_loops_until_host_closes() {
    let _serial = serial();
    let host = HeadlessHost::new(64, 64).with_run_duration(Duration::from_millis(200));
    let host = Arc::new(host);

    let mut engine = Engine::new(config(), Counting::default()).unwrap();
    engine.start(host.clone()).unwrap();
    host.run(engine.handle()).unwrap();
    engine.stop();

    engine.with_game(|game, ctx| {
        assert_eq!(game.loads, 1);
        assert_eq!(game.shutdowns, 1);
        assert!(game.draws > 0);
        assert_eq!(game.draws, game.updates);
        assert!(game.fixed > 0);
        assert_eq!(ctx.time.fixed_tick_count(), game.fixed as u64);
    });
    assert!(host.repaint_count() > 0);
    let frame = host.last_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 64));
}

#[test]
fn test_second_engine_cannot_start() {
    let _serial = serial();
    let host: Arc<dyn Host> = Arc::new(HeadlessHost::new(64, 64));

    let mut first = Engine::new(config(), Counting::default()).unwrap();
    first.start(host.clone()).unwrap();

    let mut second = Engine::new(config(), Counting::default()).unwrap();
    assert!(matches!(
        second.start(host.clone()),
        Err(EngineError::AlreadyRunning)
    ));
    assert!(matches!(first.start(host.clone()), Err(EngineError::AlreadyRunning)));

    first.stop();
    second.start(host).unwrap();
    assert!(second.is_running());
    second.stop();
    assert!(!second.is_running());
}

#[test]
fn test_game_quit_ends_run() {
    let _serial = serial();
    let game = Counting {
        quit_after: Some(5),
        ..Counting::default()
    };
    let engine = Engine::new(config(), game).unwrap();
    // no run duration: only the quit request ends the pump
    engine.run(HeadlessHost::new(64, 64)).unwrap();
}

#[test]
fn test_objects_tick_in_both_loops_and_leave_when_dropped() {
    let _serial = serial();
    let host: Arc<dyn Host> = Arc::new(HeadlessHost::new(64, 64));
    let ticks = Ticks::default();

    let mut engine = Engine::new(config(), Counting::default()).unwrap();
    let object = engine.with_context(|ctx| {
        ctx.spawn(GameObject::new("ticker").with_behavior(Ticker(ticks.clone())))
    });
    engine.start(host).unwrap();
    sleep(Duration::from_millis(100));

    assert!(ticks.updates.load(Ordering::SeqCst) > 0);
    assert!(ticks.fixed.load(Ordering::SeqCst) > 0);

    // hold the state lock so no tick runs between the drop and the snapshot
    let (updates, fixed) = engine.with_context(|_| {
        drop(object);
        (
            ticks.updates.load(Ordering::SeqCst),
            ticks.fixed.load(Ordering::SeqCst),
        )
    });
    sleep(Duration::from_millis(50));
    engine.stop();

    assert_eq!(ticks.updates.load(Ordering::SeqCst), updates);
    assert_eq!(ticks.fixed.load(Ordering::SeqCst), fixed);
    engine.with_context(|ctx| assert!(ctx.objects.is_empty()));
}

#[test]
fn test_click_reaches_shown_sprite() {
    let _serial = serial();
    let host: Arc<dyn Host> = Arc::new(HeadlessHost::new(64, 64));
    let hits = Arc::new(Mutex::new(Vec::new()));

    let sprite = SpriteHandle::new(Sprite::new(Vec2::ZERO, Bitmap::filled(10, 10, Color::RED)));
    {
        let hits = Arc::clone(&hits);
        sprite
            .lock()
            .set_on_click(move |click| hits.lock().unwrap().push(click.world));
    }

    let mut engine = Engine::new(config(), Counting::default()).unwrap();
    engine.with_context(|ctx| ctx.show(&sprite)).unwrap();
    engine.start(host).unwrap();
    sleep(Duration::from_millis(50));

    // world origin is at the viewport center (32, 32)
    engine.handle().dispatch(InputEvent::MouseUp {
        button: MouseButton::Left,
        position: Vec2::new(37.0, 37.0),
    });
    // outside the sprite
    engine.handle().dispatch(InputEvent::MouseUp {
        button: MouseButton::Left,
        position: Vec2::new(2.0, 2.0),
    });
    sleep(Duration::from_millis(50));
    engine.stop();

    assert_eq!(*hits.lock().unwrap(), vec![Vec2::new(5.0, 5.0)]);
    engine.with_game(|game, _| assert_eq!(game.clicked, vec![sprite.id()]));
}

#[test]
fn test_invalid_config_never_starts() {
    let config = EngineConfig::default().with_fps_limit(Some(5000));
    assert!(matches!(
        Engine::new(config, Counting::default()),
        Err(EngineError::Config(_))
    ));
}
