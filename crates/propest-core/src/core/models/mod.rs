pub mod dataset;
pub mod ids;
pub mod property;
pub mod state;
pub mod substance;
