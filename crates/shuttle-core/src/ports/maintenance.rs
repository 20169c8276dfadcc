//! MaintenanceMode port.

/// System-wide "down for maintenance" flag.
pub trait MaintenanceMode: Send + Sync {
    fn is_down(&self) -> bool;
}

/// Never in maintenance mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUp;

impl MaintenanceMode for AlwaysUp {
    fn is_down(&self) -> bool {
        false
    }
}
