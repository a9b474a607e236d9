pub mod model;
pub mod scheduler;
pub mod sound;
pub mod store;
