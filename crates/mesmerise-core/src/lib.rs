pub mod compositor;
pub mod config;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod kernels;
pub mod layer;
pub mod pipeline;
pub mod raster;
pub mod scheduler;
pub mod session;
