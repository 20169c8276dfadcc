//! MemoryProbe port - プロセスのメモリ使用量

/// Reports how much memory the current process uses.
pub trait MemoryProbe: Send + Sync {
    /// Resident memory in megabytes, or `None` when it cannot be determined.
    fn resident_megabytes(&self) -> Option<u64>;
}
