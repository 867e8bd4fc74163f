//! ECS microbenchmarks using Criterion.
//!
//! These benchmarks measure individual operations in isolation:
//! - Entity spawn (single and batch, via `create_entity`/`request_entity`)
//! - Query resolution and iteration
//! - Component add/remove (archetype migration)
//! - Entity despawn
//! - Dispatcher throughput (subscribe, dispatch, blocker)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rusty_bench::components::*;
use rusty_ecs::query::Expr;
use rusty_ecs::system::{Dispatcher, Message, WorldHandle};
use rusty_ecs::world::World;

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("single_component", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..n {
                    black_box(world.create_entity(Position::default()).unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("four_components", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..n {
                    black_box(
                        world
                            .create_entity((Transform::default(), Position::default(), Rotation::default(), Velocity::default()))
                            .unwrap(),
                    );
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("batch_single", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                black_box(world.request_entity(Position::default(), n, None).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_simple_iter(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_iter");

    for count in [1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("pos_vel", count), &count, |b, &n| {
            let mut world = World::new();
            let pos_id = world.register_component::<Position>().unwrap();
            let vel_id = world.register_component::<Velocity>().unwrap();
            world
                .request_entity((Position { x: 0.0, y: 0.0, z: 0.0 }, Velocity { x: 1.0, y: 0.0, z: 0.0 }), n, None)
                .unwrap();

            let query = world.query(Expr::has(pos_id) & Expr::has(vel_id));
            b.iter(|| {
                let resolved = query.resolve(world.table());
                for r in &resolved {
                    for range in &r.ranges {
                        for row in range.live() {
                            let velocity = *world.get_component::<Velocity>().unwrap().get(row).unwrap();
                            let pos = world.get_component::<Position>().unwrap().get(row).copied().unwrap();
                            black_box(pos.x + velocity.x);
                        }
                    }
                }
            });
        });
    }

    group.finish();
}

fn bench_fragmented_iter(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragmented_iter");

    let archetypes = 8;
    let entities_per_archetype = 20;
    let total = archetypes * entities_per_archetype;
    group.throughput(Throughput::Elements(total as u64));

    group.bench_function("eight_archetypes", |b| {
        let mut world = World::new();
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerA)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerB)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerC)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerD)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerE)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerF)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerG)).unwrap();
        }
        for _ in 0..entities_per_archetype {
            world.create_entity((Data { value: 1.0 }, MarkerH)).unwrap();
        }

        let data_id = world.components().get::<Data>().unwrap();
        let query = world.query(Expr::has(data_id));

        b.iter(|| {
            query.for_each_range(world.table(), |_, r| {
                for row in r.live() {
                    if let Some(data) = world.get_component::<Data>().unwrap().get(row) {
                        black_box(data.value * 2.0);
                    }
                }
            });
        });
    });

    group.finish();
}

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("add_component", count), &count, |b, &n| {
            b.iter_batched(
                || {
                    let mut world = World::new();
                    let entities: Vec<_> = (0..n).map(|_| world.create_entity(Position::default()).unwrap()).collect();
                    (world, entities)
                },
                |(mut world, entities)| {
                    for entity in entities {
                        world.attach(entity, Velocity::default()).unwrap();
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("remove_component", count), &count, |b, &n| {
            b.iter_batched(
                || {
                    let mut world = World::new();
                    let entities: Vec<_> = (0..n)
                        .map(|_| world.create_entity((Position::default(), Velocity::default())).unwrap())
                        .collect();
                    (world, entities)
                },
                |(mut world, entities)| {
                    for entity in entities {
                        world.detach::<Velocity>(entity).unwrap();
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_despawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("despawn");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("single_component", count), &count, |b, &n| {
            b.iter_batched(
                || {
                    let mut world = World::new();
                    let entities: Vec<_> = (0..n).map(|_| world.create_entity(Position::default()).unwrap()).collect();
                    (world, entities)
                },
                |(mut world, entities)| {
                    for entity in entities {
                        world.remove_entity(entity).unwrap();
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for count in [1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("one_system_tick", count), &count, |b, &n| {
            let mut world = World::new();
            let pos_id = world.register_component::<Position>().unwrap();
            let vel_id = world.register_component::<Velocity>().unwrap();
            world
                .request_entity((Position::default(), Velocity { x: 1.0, y: 0.0, z: 0.0 }), n, None)
                .unwrap();

            let world = WorldHandle::new(world);
            let mut dispatcher = Dispatcher::new(8);
            let system = dispatcher.new_system(|world, msg| {
                let Message::Query(resolved) = msg else {
                    return Ok(None);
                };
                world.with(|world| {
                    for r in resolved.iter() {
                        for range in &r.ranges {
                            for row in range.live() {
                                let velocity = *world.get_component::<Velocity>().unwrap().get(row).unwrap();
                                let pos = world.get_component_mut::<Position>().unwrap().get_mut(row).unwrap();
                                pos.x += velocity.x;
                            }
                        }
                    }
                });
                Ok(None)
            });

            let query = world.with(|w| w.query(Expr::has(pos_id) & Expr::has(vel_id)));
            dispatcher.subscribe(&world, &system, query);
            dispatcher.run_system(&system).unwrap();

            b.iter(|| {
                dispatcher.dispatch(&world);
                dispatcher.blocker();
            });

            system.stop();
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spawn,
    bench_simple_iter,
    bench_fragmented_iter,
    bench_add_remove,
    bench_despawn,
    bench_dispatch,
);

criterion_main!(benches);
