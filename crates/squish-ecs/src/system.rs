use tracing::trace;

use crate::query_state::QueryState;
use crate::world::World;

/// A system that operates on the world once per frame.
///
/// `C` is the context owned by the frame driver and handed to every call;
/// `E` is the error type systems report back through the schedule.
pub trait System<C, E>: Send {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once before the first frame this system takes part in.
    fn init(&mut self, _world: &mut World, _ctx: &mut C) -> Result<(), E> {
        Ok(())
    }

    /// Queries the schedule refreshes before each run.
    fn queries_mut(&mut self) -> &mut [QueryState] {
        &mut []
    }

    /// Work carried over from an earlier frame. A system reporting pending
    /// work runs even while its mandatory queries are unsatisfied.
    fn has_deferred_work(&self) -> bool {
        false
    }

    fn run(&mut self, world: &mut World, ctx: &mut C) -> Result<(), E>;
}

/// Blanket implementation so closures can be used as systems.
impl<C, E, F> System<C, E> for F
where
    F: FnMut(&mut World, &mut C) -> Result<(), E> + Send,
{
    fn run(&mut self, world: &mut World, ctx: &mut C) -> Result<(), E> {
        (self)(world, ctx)
    }
}

/// What happened during one pass of the schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Systems that executed.
    pub ran: usize,
    /// Systems skipped because a mandatory query had nothing to offer.
    pub dormant: usize,
}

struct Scheduled<C, E> {
    system: Box<dyn System<C, E>>,
    initialized: bool,
}

/// An ordered list of systems, run in registration order each frame.
pub struct SystemSchedule<C, E> {
    systems: Vec<Scheduled<C, E>>,
}

impl<C, E> SystemSchedule<C, E> {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System<C, E> + 'static>(&mut self, system: S) {
        self.systems.push(Scheduled {
            system: Box::new(system),
            initialized: false,
        });
    }

    /// Run every system once, in order.
    ///
    /// Systems that have not been initialized yet are all initialized before
    /// any of them runs, so a system may rely on state set up by the `init`
    /// of a system registered after it.
    pub fn run_all(&mut self, world: &mut World, ctx: &mut C) -> Result<FrameReport, E> {
        for scheduled in self.systems.iter_mut().filter(|s| !s.initialized) {
            scheduled.system.init(world, ctx)?;
            scheduled.initialized = true;
        }

        let mut report = FrameReport::default();
        for scheduled in &mut self.systems {
            let system = &mut scheduled.system;
            let mut satisfied = true;
            for query in system.queries_mut() {
                query.update(world);
                satisfied &= query.is_satisfied();
            }
            if !satisfied && !system.has_deferred_work() {
                trace!(system = system.name(), "dormant");
                report.dormant += 1;
                continue;
            }
            system.run(world, ctx)?;
            report.ran += 1;
        }
        Ok(report)
    }

    /// Names of the scheduled systems in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.system.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl<C, E> Default for SystemSchedule<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_state::QueryDescriptor;

    type Log = Vec<&'static str>;

    #[test]
    fn test_closure_systems_run_in_order() {
        let mut world = World::new();
        let mut log = Log::new();

        let mut schedule = SystemSchedule::<Log, ()>::new();
        schedule.add_system(|_: &mut World, log: &mut Log| {
            log.push("first");
            Ok(())
        });
        schedule.add_system(|_: &mut World, log: &mut Log| {
            log.push("second");
            Ok(())
        });

        let report = schedule.run_all(&mut world, &mut log).unwrap();
        assert_eq!(log, vec!["first", "second"]);
        assert_eq!(report, FrameReport { ran: 2, dormant: 0 });
    }

    struct Marker;

    /// Records its lifecycle in the log; dormant unless a `Marker` was added.
    struct Recorder {
        queries: Vec<QueryState>,
        tag: &'static str,
    }

    impl Recorder {
        fn new(world: &mut World, tag: &'static str) -> Self {
            let descriptor = QueryDescriptor::new("markers")
                .with::<Marker>()
                .mandatory()
                .listen_added();
            Self {
                queries: vec![QueryState::new(world, descriptor).unwrap()],
                tag,
            }
        }
    }

    impl System<Log, ()> for Recorder {
        fn init(&mut self, _world: &mut World, log: &mut Log) -> Result<(), ()> {
            log.push(self.tag);
            Ok(())
        }

        fn queries_mut(&mut self) -> &mut [QueryState] {
            &mut self.queries
        }

        fn run(&mut self, _world: &mut World, log: &mut Log) -> Result<(), ()> {
            log.push("run");
            Ok(())
        }
    }

    #[test]
    fn test_all_inits_happen_before_first_run() {
        let mut world = World::new();
        let mut log = Log::new();
        let mut schedule = SystemSchedule::<Log, ()>::new();
        schedule.add_system(|_: &mut World, log: &mut Log| {
            log.push("closure");
            Ok(())
        });
        let recorder = Recorder::new(&mut world, "init");
        schedule.add_system(recorder);

        schedule.run_all(&mut world, &mut log).unwrap();
        assert_eq!(log, vec!["init", "closure"]);

        log.clear();
        schedule.run_all(&mut world, &mut log).unwrap();
        assert_eq!(log, vec!["closure"]);
    }

    #[test]
    fn test_mandatory_listener_goes_dormant() {
        let mut world = World::new();
        let mut log = Log::new();
        let mut schedule = SystemSchedule::<Log, ()>::new();
        let recorder = Recorder::new(&mut world, "init");
        schedule.add_system(recorder);

        let report = schedule.run_all(&mut world, &mut log).unwrap();
        assert_eq!(report, FrameReport { ran: 0, dormant: 1 });

        let e = world.spawn();
        world.insert(e, Marker);
        let report = schedule.run_all(&mut world, &mut log).unwrap();
        assert_eq!(report.ran, 1);

        let report = schedule.run_all(&mut world, &mut log).unwrap();
        assert_eq!(report.dormant, 1);
        assert_eq!(log, vec!["init", "run"]);
    }

    /// Dormant by query, but holds one retry for the next frame.
    struct Retrying {
        queries: Vec<QueryState>,
        pending: bool,
    }

    impl System<Log, ()> for Retrying {
        fn queries_mut(&mut self) -> &mut [QueryState] {
            &mut self.queries
        }

        fn has_deferred_work(&self) -> bool {
            self.pending
        }

        fn run(&mut self, _world: &mut World, log: &mut Log) -> Result<(), ()> {
            log.push("retry");
            self.pending = false;
            Ok(())
        }
    }

    #[test]
    fn test_deferred_work_overrides_dormancy() {
        let mut world = World::new();
        let mut log = Log::new();
        let descriptor = QueryDescriptor::new("markers").with::<Marker>().mandatory();
        let retrying = Retrying {
            queries: vec![QueryState::new(&mut world, descriptor).unwrap()],
            pending: true,
        };
        let mut schedule = SystemSchedule::<Log, ()>::new();
        schedule.add_system(retrying);

        assert_eq!(schedule.run_all(&mut world, &mut log).unwrap().ran, 1);
        assert_eq!(schedule.run_all(&mut world, &mut log).unwrap().dormant, 1);
        assert_eq!(log, vec!["retry"]);
    }

    #[test]
    fn test_errors_stop_the_frame() {
        let mut world = World::new();
        let mut log = Log::new();
        let mut schedule = SystemSchedule::<Log, &'static str>::new();
        schedule.add_system(|_: &mut World, _: &mut Log| Err("boom"));
        schedule.add_system(|_: &mut World, log: &mut Log| {
            log.push("unreachable");
            Ok(())
        });

        assert_eq!(schedule.run_all(&mut world, &mut log), Err("boom"));
        assert!(log.is_empty());
    }
}
