//! Representative component types shared across the microbenchmarks.

use rusty_ecs_macros::Component;

#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Rotation {
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Transform {
    pub scale: f32,
}

/// A single `f32` payload, used to benchmark iteration over a fragmented
/// table spread across many small archetypes.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct Data {
    pub value: f32,
}

macro_rules! marker {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Default, Component)]
        pub struct $name;
    };
}

marker!(MarkerA);
marker!(MarkerB);
marker!(MarkerC);
marker!(MarkerD);
marker!(MarkerE);
marker!(MarkerF);
marker!(MarkerG);
marker!(MarkerH);
