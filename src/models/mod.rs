pub mod quote;
pub mod symbol;
pub mod sync_run;

pub use quote::{change_percent, Quote};
pub use symbol::{Symbol, SymbolKind};
pub use sync_run::{AbortReason, FailureStage, RunStatus, SymbolFailure, SyncRun};
