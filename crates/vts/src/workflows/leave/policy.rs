use serde::{Deserialize, Serialize};

/// Organization-level switches for behavior that differs between deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePolicy {
    /// Credit hours back to the balance on withdrawal and cancellation.
    /// A rejected request keeps its hours debited whatever this is set to.
    pub restore_hours_on_release: bool,
    /// Restrictions that name locations only bind employees at those locations.
    pub scope_restrictions_by_location: bool,
    /// Approvals and rejections must come from one of the employee's direct managers.
    pub require_direct_manager: bool,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            restore_hours_on_release: true,
            scope_restrictions_by_location: true,
            require_direct_manager: true,
        }
    }
}
