// ── State store ──
//
// `OrchestrationState` is the single mutable root; `StateStore` swaps
// snapshots and broadcasts transitions; `wait_for` suspends on them.

mod export;
mod reactive;
mod state;
mod wait;

pub use export::ExportedState;
pub use reactive::{StateChange, StateStore};
pub use state::OrchestrationState;
pub use wait::Waited;
