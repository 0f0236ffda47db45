//! Transaction lifecycle: fee estimation, drafting, submission and confirmation

mod builder;
mod confirm;
mod gas;
mod sender;

pub use builder::{TransactionBuilder, TransactionDraft};
pub use confirm::{ConfirmationOutcome, ConfirmationPoller};
pub use sender::TransactionSubmitter;
