//! Per-cycle controllers consulted by the state handlers.
//!
//! | Controller | Decides                                        |
//! |------------|------------------------------------------------|
//! | `charging` | charge permission, end-of-charge cutoff        |
//! | `balancing`| balancing permission, per-cell discharge plan  |
//! | `boost`    | advertised discharge limit (burst / recovery)  |

pub mod balancing;
pub mod boost;
pub mod charging;
