pub mod adapters;
pub mod config;
pub mod error;
pub mod mindmap;
pub mod playback;
pub mod workflow;
