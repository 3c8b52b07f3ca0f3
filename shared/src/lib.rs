pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod participation;
pub mod tally;
pub mod validation;
pub mod view;

pub use error::{Result, ErrorCode, ErrorResponse, VoteError};
pub use identity::*;
pub use lifecycle::{can_view, resolve_viewable, Entry};
pub use models::*;
pub use tally::{compute_tally, OptionTally, Tally};
pub use validation::*;
pub use view::*;
