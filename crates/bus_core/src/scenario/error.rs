#[derive(thiserror::Error, Debug)]
pub enum LevelConfigError {
    #[error("I/O while reading level config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed level config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("level has no route control points")]
    MissingRoute,
    #[error("route needs at least 2 control points, got {0}")]
    RouteTooShort(usize),
    #[error("bus capacity must be at least 1")]
    ZeroCapacity,
    #[error("admission cap must be at least 1")]
    ZeroAdmissionCap,
    #[error("level defines no waiting slots")]
    NoWaitingSlots,
    #[error("tick length must be positive")]
    ZeroTick,
    #[error("bus speed must be positive, got {0}")]
    NonPositiveSpeed(f32),
    #[error("node {node} links to node {target} but the level has {count} nodes")]
    DanglingJunction {
        node: usize,
        target: usize,
        count: usize,
    },
}
