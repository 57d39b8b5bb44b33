pub mod master_sync;
