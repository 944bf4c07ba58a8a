// Library exports for choromap

pub mod color;
pub mod csv_reader;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod palette;
pub mod runtime;
pub mod schemes;

// Engine stages
pub mod centroid;
pub mod compiler;
pub mod config;
pub mod domain;
pub mod ir;
pub mod join;
pub mod resolve;
pub mod scale;
pub mod tooltip;
