mod link_task;
mod negotiation_state;
mod peer_link;
mod pending_candidates;

pub use link_task::*;
pub use negotiation_state::*;
pub use peer_link::*;
pub use pending_candidates::*;
