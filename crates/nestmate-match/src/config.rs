//! Match-protocol configuration.

/// Configuration for the group lifecycle service.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Upper bound on confirmed + pending members per group (default: 8).
    pub max_members: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { max_members: 8 }
    }
}
