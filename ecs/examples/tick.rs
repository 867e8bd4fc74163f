//! Spawns a handful of entities carrying `Position` and `Velocity`, then
//! drives one tick of a "movement" system through the dispatcher: the
//! system receives its query's resolved ranges, integrates velocity into
//! position in place, and forwards the number of rows it touched to a
//! "logger" system listening downstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rusty_ecs::query::Expr;
use rusty_ecs::system::{Dispatcher, Message, WorldHandle};
use rusty_ecs::world::World;
use rusty_ecs::ComponentDerive;

#[derive(Debug, Clone, Copy, ComponentDerive)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy, ComponentDerive)]
struct Velocity {
    dx: f64,
    dy: f64,
}

fn main() {
    env_logger::init();

    let mut world = World::new();
    let pos_id = world.register_component::<Position>().unwrap();
    let vel_id = world.register_component::<Velocity>().unwrap();

    for i in 0..5 {
        let e = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        world.attach(e, Velocity { dx: i as f64, dy: 1.0 }).unwrap();
    }

    let world = WorldHandle::new(world);
    let dispatcher = Dispatcher::new(64);

    let moved = dispatcher.new_system(move |world, msg| {
        let Message::Query(resolved) = msg else {
            return Ok(None);
        };
        let mut touched = 0usize;
        world.with(|world| {
            for r in resolved.iter() {
                for range in &r.ranges {
                    for row in range.live() {
                        let velocity = *world.get_component::<Velocity>().unwrap().get(row).unwrap();
                        let position = world.get_component_mut::<Position>().unwrap().get_mut(row).unwrap();
                        position.x += velocity.dx;
                        position.y += velocity.dy;
                        touched += 1;
                    }
                }
            }
        });
        Ok(Some(Arc::new(touched)))
    });

    let total_moved = Arc::new(AtomicUsize::new(0));
    let logger_total = Arc::clone(&total_moved);
    let logged = dispatcher.new_system(move |_world, msg| {
        if let Message::Value(value) = msg {
            if let Some(touched) = value.downcast_ref::<usize>() {
                logger_total.fetch_add(*touched, Ordering::SeqCst);
                log::info!("movement touched {touched} rows this tick");
            }
        }
        Ok(None)
    });

    let mut dispatcher = dispatcher;
    dispatcher.subscribe(&world, &moved, world.with(|w| w.query(Expr::has(pos_id) & Expr::has(vel_id))));
    dispatcher.listen_to(&moved, &logged).unwrap();

    dispatcher.run_system(&moved).unwrap();
    dispatcher.run_system(&logged).unwrap();

    dispatcher.dispatch(&world);
    dispatcher.blocker();

    // Give the logger's thread a moment to apply the forwarded value before
    // the process exits; in a long-running host this would just be the next
    // tick's dispatch instead.
    std::thread::sleep(std::time::Duration::from_millis(50));

    println!("entities moved this tick: {}", total_moved.load(Ordering::SeqCst));

    moved.stop();
    logged.stop();
}
