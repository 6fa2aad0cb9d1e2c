//! Live-reload notification.

/// Receives the paths a build step just rewrote so connected browsers can
/// reload them.
pub trait LiveReload: Send + Sync {
    /// Notify clients that `paths` changed. Paths are relative to the served
    /// root, using forward slashes.
    fn notify(&self, paths: &[String]);
}
