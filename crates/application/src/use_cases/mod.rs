pub mod handle_query;
pub mod refresh_blocklists;

pub use handle_query::{HandleQueryUseCase, QueryOutcome};
pub use refresh_blocklists::RefreshBlocklistsUseCase;
