/// Authorization seam
///
/// Public service operations check access explicitly through this trait
/// before touching any state, instead of relying on interception. Batch
/// tasks run as the platform robot user, which is allowed everything.
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Resource an operation wants to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Case(Uuid),
    Booking(Uuid),
    CaptureSession(Uuid),
    Recording(Uuid),
}

#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Returns `AppError::PermissionDenied` when the current identity may
    /// not act on the resource
    async fn ensure_access(&self, resource: Resource) -> Result<()>;
}

/// Policy used by cron-style batch tasks
pub struct RobotAccessPolicy;

#[async_trait]
impl AccessPolicy for RobotAccessPolicy {
    async fn ensure_access(&self, _resource: Resource) -> Result<()> {
        Ok(())
    }
}
