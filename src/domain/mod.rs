// Domain layer - Core types of the compression pipeline

pub mod model;
