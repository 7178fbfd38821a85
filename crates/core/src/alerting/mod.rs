pub mod alert_cooldown;
pub mod snapshot_recorder;
