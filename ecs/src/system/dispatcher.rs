//! The system dispatcher: subscribes systems to queries, wires dataflow
//! edges between them, and runs each as its own OS thread.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{EcsError, EcsResult};
use crate::query::{Query, Resolved};
use crate::system::barrier::Barrier;
use crate::system::handle::{WeakWorld, WorldHandle};

/// Identifies one system within a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(u32);

/// A value a system forwards downstream after processing a message. Type
/// erased so the dispatcher doesn't need a generic parameter per dataflow
/// edge - the receiving system's closure is responsible for downcasting.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// What a running system's thread pulls off its input channel.
#[derive(Clone)]
pub enum Message {
    /// The result of resolving this system's query against the world for
    /// the current tick, sent by [`Dispatcher::dispatch`].
    Query(Arc<[Resolved]>),
    /// A value forwarded from an upstream system via a `listen_to` edge.
    Value(Payload),
}

type Logic = dyn FnMut(&WorldHandle, &Message) -> EcsResult<Option<Payload>> + Send;

struct Inner {
    id: SystemId,
    active: AtomicBool,
    world: Mutex<WeakWorld>,
    children: Mutex<Vec<System>>,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    logic: Mutex<Box<Logic>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    barrier: Arc<Barrier>,
}

/// A handle to one system's channel, active flag, and dataflow children.
///
/// Cheaply cloneable; every clone refers to the same running (or stopped)
/// system. Carries a single [`WeakWorld`], set the first time it is
/// subscribed or wired as a `listen_to` target of an already-subscribed
/// system - it never holds an owning reference to the world it reacts to.
#[derive(Clone)]
pub struct System(Arc<Inner>);

impl System {
    pub fn id(&self) -> SystemId {
        self.0.id
    }

    /// Whether this system's thread is currently running its loop.
    pub fn is_active(&self) -> bool {
        self.0.active.load(Ordering::SeqCst)
    }

    /// Clear the active flag. The system's thread notices within one poll
    /// interval and exits; in-flight message handling completes first.
    pub fn stop(&self) {
        self.0.active.store(false, Ordering::SeqCst);
    }

    fn world(&self) -> WeakWorld {
        self.0.world.lock().unwrap().clone()
    }

    fn set_world_if_unset(&self, world: &WeakWorld) {
        let mut guard = self.0.world.lock().unwrap();
        if guard.is_none() {
            *guard = world.clone();
        }
    }

    fn send(&self, message: Message) {
        let _ = self.0.sender.send(message);
    }
}

/// Wires systems into a reactive dataflow graph and drives them.
///
/// Every system owns its own OS thread once [`run_system`](Self::run_system)
/// starts it; `dispatch` only ever writes into bounded channels, so a slow
/// or stalled system applies backpressure to whoever feeds it rather than
/// stalling the whole world.
pub struct Dispatcher {
    subscriptions: HashMap<SystemId, (System, Query)>,
    next_id: AtomicU32,
    barrier: Arc<Barrier>,
    channel_bound: usize,
}

impl Dispatcher {
    pub fn new(channel_bound: usize) -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: AtomicU32::new(0),
            barrier: Arc::new(Barrier::new()),
            channel_bound,
        }
    }

    /// Block until every currently-live system has drained its channel for
    /// the round in progress. Returns immediately if no system is live.
    pub fn blocker(&self) {
        self.barrier.wait_for_drain();
    }

    /// Create a new, unsubscribed system running `logic` whenever a message
    /// arrives on its input channel. `logic` receives the world and the
    /// message, and may return a value to forward to any `listen_to` child.
    pub fn new_system<F>(&self, logic: F) -> System
    where
        F: FnMut(&WorldHandle, &Message) -> EcsResult<Option<Payload>> + Send + 'static,
    {
        let id = SystemId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = channel::bounded(self.channel_bound);
        System(Arc::new(Inner {
            id,
            active: AtomicBool::new(false),
            world: Mutex::new(WeakWorld::none()),
            children: Mutex::new(Vec::new()),
            sender,
            receiver,
            logic: Mutex::new(Box::new(logic)),
            handle: Mutex::new(None),
            barrier: Arc::clone(&self.barrier),
        }))
    }

    /// Subscribe `system` to `query`: every [`dispatch`](Self::dispatch) call
    /// resolves `query` against the world and sends the result to `system`.
    pub fn subscribe(&mut self, world: &WorldHandle, system: &System, query: Query) {
        system.set_world_if_unset(&world.downgrade());
        self.subscriptions.insert(system.id(), (system.clone(), query));
    }

    /// Remove `system` from the query→system map. Does not stop an already
    /// running system; call [`System::stop`] for that.
    pub fn unsubscribe(&mut self, system: &System) {
        self.subscriptions.remove(&system.id());
    }

    /// Wire `listener` to receive every value `source` forwards.
    ///
    /// Fails with [`EcsError::CycleDetected`] if the edge would let a value
    /// flow back to `source` through `listener`'s existing descendants.
    pub fn listen_to(&mut self, source: &System, listener: &System) -> EcsResult<()> {
        if source.id() == listener.id() || Self::reaches(listener, source.id()) {
            return Err(EcsError::CycleDetected);
        }
        listener.set_world_if_unset(&source.world());
        source.0.children.lock().unwrap().push(listener.clone());
        Ok(())
    }

    /// Splice `mid` between `source` and whatever `source` already forwards
    /// to: `source`'s existing children become `mid`'s children, and `mid`
    /// becomes `source`'s sole child. An empty child list on `source` is not
    /// an error - `mid` simply ends up with no children either.
    pub fn get_into_flow(&mut self, source: &System, mid: &System) {
        mid.set_world_if_unset(&source.world());
        let mut source_children = source.0.children.lock().unwrap();
        let previous = std::mem::take(&mut *source_children);
        *mid.0.children.lock().unwrap() = previous;
        source_children.push(mid.clone());
    }

    /// Whether `target` is reachable from `from` by following `children`
    /// edges, including `from` itself.
    fn reaches(from: &System, target: SystemId) -> bool {
        let mut stack = vec![from.clone()];
        let mut visited = std::collections::HashSet::new();
        while let Some(node) = stack.pop() {
            if node.id() == target {
                return true;
            }
            if !visited.insert(node.id()) {
                continue;
            }
            stack.extend(node.0.children.lock().unwrap().iter().cloned());
        }
        false
    }

    /// Start `system` on its own thread. The system must already have a
    /// world reference (via [`subscribe`](Self::subscribe) or
    /// [`listen_to`](Self::listen_to)) or this fails with
    /// [`EcsError::NotSubscribed`]. Restarts a previously stopped system.
    pub fn run_system(&self, system: &System) -> EcsResult<()> {
        if system.world().upgrade().is_none() {
            return Err(EcsError::NotSubscribed);
        }
        system.0.active.store(true, Ordering::SeqCst);
        self.barrier.add_live();

        let task = system.clone();
        let join = thread::spawn(move || run_loop(task));
        *system.0.handle.lock().unwrap() = Some(join);
        Ok(())
    }

    /// Resolve every subscribed system's query against the world and send
    /// the result into its channel. Blocks if a system's channel is full.
    pub fn dispatch(&self, world: &WorldHandle) {
        for (system, query) in self.subscriptions.values() {
            let resolved: Arc<[Resolved]> = world.with(|w| query.resolve(w.table())).into();
            system.send(Message::Query(resolved));
        }
    }
}

fn run_loop(system: System) {
    loop {
        if !system.is_active() {
            break;
        }
        let message = match system.0.receiver.recv_timeout(Duration::from_millis(25)) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let Some(world) = system.world().upgrade() else {
            break;
        };

        let outcome = {
            let mut logic = system.0.logic.lock().unwrap();
            logic(&world, &message)
        };

        match outcome {
            Ok(forwarded) => {
                if let Some(value) = forwarded {
                    for child in system.0.children.lock().unwrap().iter() {
                        child.send(Message::Value(Arc::clone(&value)));
                    }
                }
                if system.0.receiver.is_empty() {
                    system.0.barrier.mark_done();
                }
            }
            Err(err) => {
                let failure = EcsError::SystemRunFailed(format!("{:?}: {err}", system.id()));
                log::error!("{failure}");
                system.0.active.store(false, Ordering::SeqCst);
                break;
            }
        }
    }
    system.0.barrier.remove_live();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component;
    use crate::query::Expr;
    use crate::world::World;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn wait_until(mut predicate: impl FnMut() -> bool) {
        for _ in 0..200 {
            if predicate() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("condition never became true");
    }

    #[test]
    fn subscribe_then_unsubscribe_restores_the_query_map() {
        let dispatcher = Dispatcher::new(8);
        let mut dispatcher = dispatcher;
        let world = WorldHandle::new(World::new());
        let system = dispatcher.new_system(|_, _| Ok(None));

        dispatcher.subscribe(&world, &system, Query::new(Expr::Has(component::Id::new(0))));
        assert_eq!(dispatcher.subscriptions.len(), 1);

        dispatcher.unsubscribe(&system);
        assert!(dispatcher.subscriptions.is_empty());
    }

    #[test]
    fn listen_to_refuses_an_edge_that_would_close_a_cycle() {
        let mut dispatcher = Dispatcher::new(8);
        let a = dispatcher.new_system(|_, _| Ok(None));
        let b = dispatcher.new_system(|_, _| Ok(None));
        let c = dispatcher.new_system(|_, _| Ok(None));

        dispatcher.listen_to(&a, &b).unwrap();
        dispatcher.listen_to(&b, &c).unwrap();

        assert!(matches!(dispatcher.listen_to(&c, &a), Err(EcsError::CycleDetected)));
    }

    #[test]
    fn get_into_flow_splices_a_system_between_source_and_its_children() {
        let mut dispatcher = Dispatcher::new(8);
        let source = dispatcher.new_system(|_, _| Ok(None));
        let leaf = dispatcher.new_system(|_, _| Ok(None));
        let mid = dispatcher.new_system(|_, _| Ok(None));

        dispatcher.listen_to(&source, &leaf).unwrap();
        dispatcher.get_into_flow(&source, &mid);

        assert_eq!(source.0.children.lock().unwrap().len(), 1);
        assert_eq!(source.0.children.lock().unwrap()[0].id(), mid.id());
        assert_eq!(mid.0.children.lock().unwrap()[0].id(), leaf.id());
    }

    #[test]
    fn get_into_flow_on_a_childless_source_is_not_an_error() {
        let mut dispatcher = Dispatcher::new(8);
        let source = dispatcher.new_system(|_, _| Ok(None));
        let mid = dispatcher.new_system(|_, _| Ok(None));

        dispatcher.get_into_flow(&source, &mid);

        assert_eq!(source.0.children.lock().unwrap().len(), 1);
        assert!(mid.0.children.lock().unwrap().is_empty());
    }

    #[test]
    fn run_system_without_a_world_reference_fails() {
        let dispatcher = Dispatcher::new(8);
        let system = dispatcher.new_system(|_, _| Ok(None));
        assert!(matches!(dispatcher.run_system(&system), Err(EcsError::NotSubscribed)));
    }

    #[test]
    fn dispatch_drives_a_subscribed_system_and_forwards_to_its_listener() {
        let mut dispatcher = Dispatcher::new(8);
        let world = WorldHandle::new(World::new());

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let source = dispatcher.new_system(move |_, msg| {
            if let Message::Query(resolved) = msg {
                let total: usize = resolved.iter().map(|r| r.ranges.iter().map(|rg| rg.len()).sum::<usize>()).sum();
                seen_clone.store(total, Ordering::SeqCst);
            }
            Ok(Some(Arc::new(42_u32)))
        });

        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = Arc::clone(&received);
        let listener = dispatcher.new_system(move |_, msg| {
            if let Message::Value(value) = msg {
                if let Some(v) = value.downcast_ref::<u32>() {
                    received_clone.store(*v as usize, Ordering::SeqCst);
                }
            }
            Ok(None)
        });

        dispatcher.subscribe(&world, &source, Query::new(Expr::Has(component::Id::new(0))));
        dispatcher.listen_to(&source, &listener).unwrap();

        dispatcher.run_system(&source).unwrap();
        dispatcher.run_system(&listener).unwrap();

        dispatcher.dispatch(&world);
        dispatcher.blocker();

        wait_until(|| received.load(Ordering::SeqCst) == 42);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        source.stop();
        listener.stop();
    }
}
