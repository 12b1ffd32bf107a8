//! pack-planner core
//!
//! Single-day route planning for one dog walker: groups compatible
//! appointments into pack walks, orders walk units against their pickup
//! windows and interleaves pickups and drop-offs inside each pack.

pub mod config;
pub mod error;
pub mod grouping;
pub mod haversine;
pub mod model;
pub mod pack;
pub mod polyline;
pub mod solver;
pub mod time;
pub mod trace;
pub mod traits;
