// Domain layer: core models and ports (interfaces). No AWS SDK types cross this boundary.

pub mod model;
pub mod ports;
