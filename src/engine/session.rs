//! Session generations and the stale-callback guard.
//!
//! Every subscription and lookup is tagged with the generation that was
//! current when it started. Starting a new session or unmounting advances
//! the generation, so anything still carrying the old one is discarded.

/// Generation tag handed to the host's location subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(pub(crate) u64);

impl SessionToken {
    /// Raw generation number, for passing across FFI.
    pub fn generation(&self) -> u64 {
        self.0
    }

    /// Rebuild a token from a raw generation number.
    pub fn from_generation(generation: u64) -> Self {
        Self(generation)
    }
}

/// Tracks the current generation and whether the host is still mounted.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    generation: u64,
    mounted: bool,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGuard {
    pub fn new() -> Self {
        Self {
            generation: 1,
            mounted: true,
        }
    }

    /// Token for the current generation.
    pub fn current(&self) -> SessionToken {
        SessionToken(self.generation)
    }

    /// Invalidate every outstanding token and return the new one.
    pub fn advance(&mut self) -> SessionToken {
        self.generation += 1;
        self.current()
    }

    /// Host went away; nothing is accepted afterwards.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether a callback tagged with `token` may still mutate state.
    pub fn accepts(&self, token: SessionToken) -> bool {
        self.mounted && token.0 == self.generation
    }
}
