pub mod boarding;
pub mod bus_spawner;
pub mod departure;
pub mod exit;
pub mod fleet_view;
pub mod level_status;
pub mod loading;
pub mod merging;
pub mod presentation_sync;
pub mod queued;
pub mod route_follow;
pub mod spatial_index;
pub mod telemetry_snapshot;
