//! Interrupt request polling.

/// What the interrupt source wants from the CPU at a poll point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntRequest {
    /// Nothing pending.
    #[default]
    None,
    /// Maskable interrupt (/INT).
    Int,
    /// Non-maskable interrupt (/NMI).
    Nmi,
}

/// Something the CPU polls once per instruction period.
///
/// The CPU counts down T-states and calls [`poll_interrupt`] each time the
/// count crosses zero. The source is free to advance its own timing on each
/// poll (the CPC Gate Array counts scanlines this way).
///
/// [`poll_interrupt`]: InterruptSource::poll_interrupt
pub trait InterruptSource {
    fn poll_interrupt(&mut self) -> IntRequest;
}
