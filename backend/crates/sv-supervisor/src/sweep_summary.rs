/// Counts from one periodic sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Running workers probed
    pub probed: usize,
    /// Probes that came back healthy and were recorded
    pub healthy: usize,
    /// Probes that failed and moved the worker to Error
    pub failed: usize,
    /// Results discarded because the worker changed while probing
    pub skipped: usize,
}
