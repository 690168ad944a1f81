//! Device identification type.

use std::sync::Arc;

/// Unique identifier for an output device.
///
/// `DeviceId` is a lightweight, cloneable identifier a [`DriverHost`] hands
/// out during discovery and accepts back when opening a driver. It uses
/// `Arc<str>` internally for efficient cloning and comparison; the string
/// itself is opaque to this crate (a registry class identifier, a card index,
/// whatever the host uses).
///
/// [`DriverHost`]: crate::driver::DriverHost
///
/// # Example
///
/// ```
/// use render_audio::DeviceId;
///
/// let fireface = DeviceId::new("fireface-ucx");
/// let onboard = DeviceId::new("onboard");
///
/// assert_ne!(fireface, onboard);
/// assert_eq!(fireface, DeviceId::new("fireface-ucx"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(Arc<str>);

impl DeviceId {
    /// Creates a new device ID from a string.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
