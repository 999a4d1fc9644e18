pub mod actors;
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod monitors;
pub mod notify;
pub mod pairs;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::Engine;
