// src/lib.rs
pub mod materialize;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod xlsx;
