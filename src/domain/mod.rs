// Domain layer: reply/route/request models and ports. No HTTP stack types here.

pub mod model;
pub mod ports;
