pub mod launcher;
pub mod ledger;
pub mod lifecycle;
pub mod poller;

pub use launcher::JobLauncher;
pub use ledger::ResourceLedger;
pub use lifecycle::{BoardLists, CardOutcome, LifecycleController};
pub use poller::{BoardPoller, TaskManager};
