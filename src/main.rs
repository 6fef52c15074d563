//! Headless demo: a sprite walks a path across a weighted grid while the
//! camera follows it

use std::time::Duration;

use bee_engine::ai::{Grid, find_path};
use bee_engine::prelude::*;

const TILE: f32 = 16.0;

/// Follows a list of waypoints at a fixed speed
struct Walker {
    sprite: SpriteHandle,
    waypoints: Vec<Vec2>,
    next: usize,
    speed: f32,
}

impl Behavior for Walker {
    fn start(&mut self, object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
        log::info!("{} walking {} waypoints", object.name, self.waypoints.len());
        Ok(())
    }

    fn as_fixed_update(&mut self) -> Option<&mut dyn FixedUpdate> {
        Some(self)
    }
}

impl FixedUpdate for Walker {
    fn fixed_update(&mut self, object: &mut ObjectState, ctx: &mut EngineContext) -> HookResult {
        let Some(&target) = self.waypoints.get(self.next) else {
            log::info!("{} arrived", object.name);
            ctx.quit();
            return Ok(());
        };
        let position = object.transform.position_2d();
        let step = self.speed * ctx.time.fixed_delta_seconds();
        let offset = target - position;
        let moved = if offset.length() <= step {
            self.next += 1;
            target
        } else {
            position + offset.normalize() * step
        };
        object.transform.position = moved.extend(0.0);
        self.sprite.lock().change_position(moved);
        Ok(())
    }
}

#[derive(Default)]
struct Demo {
    walker: Option<GameObjectHandle>,
    sprite: Option<SpriteHandle>,
    backdrop: Option<SpriteHandle>,
    clicks: usize,
}

impl Game for Demo {
    fn load(&mut self, ctx: &mut EngineContext) {
        let mut grid = Grid::new(20, 12, TILE);
        for y in 0..9 {
            grid.set_walkable(10, y, false);
        }
        for x in 3..8 {
            grid.set_weight(x, 6, 5.0);
        }
        let path = find_path(&grid, Vec2::new(8.0, 8.0), Vec2::new(300.0, 8.0));
        log::info!("path: {} cells, cost {:.1}", path.waypoints.len(), path.cost);

        let bee = match Sprite::new(Vec2::ZERO, Bitmap::filled(12, 12, Color::rgb(240, 200, 40)))
            .with_name("bee")
            .with_priority(2)
        {
            Ok(bee) => bee,
            Err(error) => {
                log::error!("could not build the walker sprite: {error}");
                return;
            }
        };
        let sprite = SpriteHandle::new(bee);
        let backdrop = SpriteHandle::new(Sprite::new(
            Vec2::new(-200.0, -150.0),
            Bitmap::filled(400, 300, Color::rgb(30, 90, 40)),
        ));
        for handle in [&sprite, &backdrop] {
            if let Err(error) = ctx.show(handle) {
                log::error!("could not show sprite {}: {error}", handle.id());
            }
        }

        let walker = Walker {
            sprite: sprite.clone(),
            waypoints: path.waypoints,
            next: 0,
            speed: 120.0,
        };
        self.walker = Some(ctx.spawn(GameObject::new("bee").with_behavior(walker)));
        self.sprite = Some(sprite);
        self.backdrop = Some(backdrop);
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        if let Some(sprite) = &self.sprite {
            let position = sprite.lock().position();
            ctx.cameras.active_mut().set_new_position(-position);
        }
        for event in ctx.events.iter() {
            if let EngineEvent::SpriteClicked { .. } = event {
                self.clicks += 1;
            }
        }
        if ctx.input.is_key_just_pressed(KeyCode::Escape) {
            ctx.quit();
        }
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        log::info!(
            "demo finished after {} frames, {} clicks",
            ctx.time.frame_count(),
            self.clicks
        );
    }
}

fn main() -> Result<(), EngineError> {
    let config = EngineConfig::default()
        .with_title("BeeEngine demo")
        .with_size(320, 240)
        .with_fps_limit(Some(60))
        .with_log_filter("info");
    let host = HeadlessHost::new(config.width, config.height).with_run_duration(Duration::from_secs(10));

    Engine::new(config, Demo::default())?.run(host)
}
