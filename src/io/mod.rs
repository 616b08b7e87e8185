pub mod catalog_store;
pub mod config_io;
pub mod deletion_journal;
pub mod lock;
pub mod workspace_io;
