//! Access-control overlay capability
//!
//! The integrity monitor and the gate depend only on this abstract
//! presence-query plus show/hide capability; any concrete rendering layer
//! (DOM paywall modal, native view, test double) can implement it.

/// Visible access-control surface owned by an external collaborator
pub trait AccessOverlay: Send + Sync {
    /// Show the access-control overlay (paywall prompt)
    fn show(&self);

    /// Hide the overlay
    fn hide(&self);

    /// Whether the overlay is still present in the rendering layer
    ///
    /// Returning `false` while the gate is latched is treated as tampering.
    fn is_present(&self) -> bool;

    /// Replace the overlay with an unmistakable, terminal lockout message
    fn show_lockout(&self, message: &str);
}
