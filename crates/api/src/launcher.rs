//! Target-app launching.

use async_trait::async_trait;

/// Optional host callback used by own-app recovery: bring the target app to
/// the foreground. Returns whether the launch intent was dispatched.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn launch_target_app(&self) -> bool;
}
