#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Agent behavior for Harbor Patrol.
//!
//! Each agent is an [`AgentBehaviorController`] that walks a patrol tour,
//! notices targets, pursues them along searched paths and closes in for a
//! direct attack. Partners coordinate through a [`Squad`] owned by the
//! simulation instead of referencing one another.

pub mod config;
pub mod controller;
pub mod navigation;
pub mod squad;

pub use config::BehaviorConfig;
pub use controller::{AgentBehaviorController, AgentSnapshot, TickContext};
pub use navigation::{FixedTarget, Navigation, NavigationSource, PatrolTour};
pub use squad::{Alert, CooperativeTarget, MemberStatus, Squad};
