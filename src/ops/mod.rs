pub mod apply;
pub mod batch;
pub mod check;
pub mod decode;
pub mod gate;
pub mod indent;
pub mod index;
pub mod planner;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{BatchEngine, BatchError, BatchReport};
pub use store::{DeleteCommand, DeletionQueue, Store, StoreError};
