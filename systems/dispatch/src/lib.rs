#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Single-flight path request dispatcher.
//!
//! Requests are queued in arrival order and resolved one at a time when the
//! owner pumps the dispatcher at the start of a logic tick. A request never
//! completes during the tick that submitted it, and callbacks always fire in
//! submission order.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
};

use glam::Vec2;
use harbor_patrol_core::{Algorithm, PathOutcome, RequestTicket};
use harbor_patrol_system_pathfinding::{resolve, solver_for, PathSolver};
use harbor_patrol_world::GridMap;

/// Completion hook invoked exactly once with the search result.
pub type PathCallback = Box<dyn FnOnce(PathOutcome)>;

/// A queued path search.
pub struct PathRequest {
    ticket: RequestTicket,
    start: Vec2,
    goal: Vec2,
    algorithm: Algorithm,
    accepted_frame: u64,
    on_complete: PathCallback,
}

impl PathRequest {
    /// Ticket assigned when the request was accepted.
    #[must_use]
    pub const fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    /// World position the search starts from.
    #[must_use]
    pub const fn start(&self) -> Vec2 {
        self.start
    }

    /// World position the search aims for.
    #[must_use]
    pub const fn goal(&self) -> Vec2 {
        self.goal
    }

    /// Solver selected for the request.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequest")
            .field("ticket", &self.ticket)
            .field("start", &self.start)
            .field("goal", &self.goal)
            .field("algorithm", &self.algorithm)
            .field("accepted_frame", &self.accepted_frame)
            .finish_non_exhaustive()
    }
}

/// Counters describing dispatcher activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Requests accepted.
    pub requested: u64,
    /// Requests whose callback has fired.
    pub resolved: u64,
    /// Resolved requests that produced no route.
    pub failed: u64,
    /// Failed requests whose solver was missing or disabled.
    pub unavailable: u64,
}

#[derive(Debug)]
struct SolverSlot {
    solver: Box<dyn PathSolver>,
    enabled: bool,
}

/// Serializes path requests so at most one search runs at a time.
#[derive(Debug)]
pub struct PathRequestDispatcher {
    queue: VecDeque<PathRequest>,
    in_flight: Option<PathRequest>,
    solvers: BTreeMap<Algorithm, SolverSlot>,
    frame: u64,
    next_ticket: u64,
    stats: DispatchStats,
}

impl Default for PathRequestDispatcher {
    fn default() -> Self {
        let mut dispatcher = Self::without_solvers();
        for algorithm in Algorithm::ALL {
            dispatcher.install_solver(solver_for(algorithm));
        }
        dispatcher
    }
}

impl PathRequestDispatcher {
    /// Creates a dispatcher with the stock solver for every algorithm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher with no solvers installed.
    #[must_use]
    pub fn without_solvers() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
            solvers: BTreeMap::new(),
            frame: 0,
            next_ticket: 0,
            stats: DispatchStats::default(),
        }
    }

    /// Installs a solver for its algorithm, replacing any previous one.
    pub fn install_solver(&mut self, solver: Box<dyn PathSolver>) {
        let algorithm = solver.algorithm();
        let _ = self.solvers.insert(
            algorithm,
            SolverSlot {
                solver,
                enabled: true,
            },
        );
    }

    /// Removes the solver for an algorithm, returning whether one existed.
    pub fn remove_solver(&mut self, algorithm: Algorithm) -> bool {
        self.solvers.remove(&algorithm).is_some()
    }

    /// Enables or disables the solver for an algorithm.
    pub fn set_solver_enabled(&mut self, algorithm: Algorithm, enabled: bool) {
        if let Some(slot) = self.solvers.get_mut(&algorithm) {
            slot.enabled = enabled;
        }
    }

    /// Reports whether requests for the algorithm can currently be served.
    #[must_use]
    pub fn is_available(&self, algorithm: Algorithm) -> bool {
        self.solvers
            .get(&algorithm)
            .is_some_and(|slot| slot.enabled)
    }

    /// Accepts a path request and returns its ticket.
    ///
    /// The callback fires during a later [`Self::pump`], never during the
    /// current one.
    pub fn request<F>(
        &mut self,
        start: Vec2,
        goal: Vec2,
        algorithm: Algorithm,
        on_complete: F,
    ) -> RequestTicket
    where
        F: FnOnce(PathOutcome) + 'static,
    {
        let ticket = RequestTicket::new(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.stats.requested += 1;
        tracing::debug!(
            ticket = ticket.get(),
            algorithm = algorithm.label(),
            pending = self.queue.len(),
            "path request accepted"
        );

        self.queue.push_back(PathRequest {
            ticket,
            start,
            goal,
            algorithm,
            accepted_frame: self.frame,
            on_complete: Box::new(on_complete),
        });
        self.dispatch_next();
        ticket
    }

    /// Resolves every request accepted before this call, in order.
    ///
    /// Returns the number of callbacks fired.
    pub fn pump(&mut self, grid: &GridMap) -> usize {
        self.frame = self.frame.wrapping_add(1);
        let mut resolved = 0;

        loop {
            self.dispatch_next();
            let (ticket, start, goal, algorithm) = match self.in_flight.as_ref() {
                Some(request) if request.accepted_frame < self.frame => (
                    request.ticket,
                    request.start,
                    request.goal,
                    request.algorithm,
                ),
                _ => break,
            };

            let outcome = self.run(ticket, start, goal, algorithm, grid);
            if let Some(request) = self.in_flight.take() {
                (request.on_complete)(outcome);
                resolved += 1;
            }
        }

        resolved
    }

    /// Number of requests waiting behind the in-flight one.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Ticket of the request currently holding the search slot.
    #[must_use]
    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight.as_ref().map(PathRequest::ticket)
    }

    /// Requests waiting behind the in-flight one, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &PathRequest> {
        self.queue.iter()
    }

    /// Activity counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }

    fn dispatch_next(&mut self) {
        if self.in_flight.is_none() {
            self.in_flight = self.queue.pop_front();
        }
    }

    fn run(
        &mut self,
        ticket: RequestTicket,
        start: Vec2,
        goal: Vec2,
        algorithm: Algorithm,
        grid: &GridMap,
    ) -> PathOutcome {
        self.stats.resolved += 1;
        let Some(slot) = self
            .solvers
            .get_mut(&algorithm)
            .filter(|slot| slot.enabled)
        else {
            tracing::warn!(
                ticket = ticket.get(),
                algorithm = algorithm.label(),
                "solver unavailable, failing path request"
            );
            self.stats.failed += 1;
            self.stats.unavailable += 1;
            return PathOutcome::failed();
        };

        let outcome = resolve(slot.solver.as_mut(), grid, start, goal);

        if !outcome.success {
            self.stats.failed += 1;
        }
        outcome
    }
}
