//! Count-then-allocate-then-fetch helper for variable-length kernel query
//! results.
//!
//! Several platforms size a mount-table or disk-statistics query with one
//! call, then fill a caller-allocated buffer with a second. Other processes
//! mount and unmount concurrently, so the population can change between the
//! two calls. This helper owns that dance once: a result that shrank is
//! valid (the returned count wins over the requested one); a result that
//! filled the buffer completely may have been truncated by growth, so the
//! fetch is retried once against a fresh count before accepting truncation.

/// Runs a sized two-phase kernel query.
///
/// `zero` is the element the buffer is pre-filled with (typically a zeroed
/// C struct). `count` asks the kernel for the current element count; `fill`
/// writes into the provided buffer and returns how many elements it wrote.
///
/// # Errors
///
/// Propagates the first error either closure returns.
pub fn fetch_sized<T: Clone, E>(
    zero: T,
    mut count: impl FnMut() -> Result<usize, E>,
    mut fill: impl FnMut(&mut [T]) -> Result<usize, E>,
) -> Result<Vec<T>, E> {
    let mut buf = vec![zero.clone(); count()?];
    let mut filled = fill(&mut buf)?;

    if filled == buf.len() && !buf.is_empty() {
        // An exact fit can hide entries added between the sizing call and
        // the fetch; retry once with a fresh count.
        let recount = count()?;
        if recount > buf.len() {
            buf = vec![zero; recount];
            filled = fill(&mut buf)?;
        }
    }

    buf.truncate(filled);
    Ok(buf)
}
