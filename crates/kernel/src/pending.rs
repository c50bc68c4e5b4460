/// Single-slot deferred load request. The last request before the frame boundary wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingLoad {
    name: Option<String>,
}

impl PendingLoad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, name: impl Into<String>) {
        let name = name.into();
        if let Some(previous) = self.name.replace(name.clone()) {
            tracing::debug!(%previous, replacement = %name, "pending load replaced");
        } else {
            tracing::debug!(map = %name, "load requested");
        }
    }

    /// Hand over the request, leaving the slot empty.
    pub fn take(&mut self) -> Option<String> {
        self.name.take()
    }

    pub fn peek(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.name.is_some()
    }
}
