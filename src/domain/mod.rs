// Domain layer: models and ports. Adapters live under `crate::adapters`.

pub mod model;
pub mod ports;
pub mod topology;
