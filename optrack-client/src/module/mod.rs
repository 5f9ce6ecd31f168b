pub mod draft;
pub mod export;
pub mod handler;
pub mod renderer;
pub mod scheduled;
pub mod stats;
pub mod suggest;
pub mod workflow;
