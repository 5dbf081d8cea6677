use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique connection id for log correlation. Starts at 1 so 0 can
/// never be confused with a real connection in log searches.
pub fn next_conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
