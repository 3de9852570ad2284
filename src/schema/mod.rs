pub mod event;
pub mod phase;
pub mod side;
pub mod state;
pub mod summary;
