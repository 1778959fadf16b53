pub mod analysis;
pub mod app;
pub mod audio;
pub mod config;
pub mod exchange;
pub mod parallel;
pub mod pipeline;
pub mod render;
pub mod telemetry;
pub mod terminal;
pub mod visual;
