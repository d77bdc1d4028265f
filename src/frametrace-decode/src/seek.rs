//! Binary-search seekability recovery.
//!
//! Used when a direct seek to the requested timestamp fails — some
//! containers only expose a sparse set of seekable positions (e.g. a coarse
//! keyframe index). `recover` narrows `[min, max]` until it finds the
//! highest position the container will actually seek to, falling back to
//! `last_working` once the interval can no longer be bisected.

/// Attempt to land the container on the highest seekable position in
/// `[min, max]`, calling `seek` with candidate targets and treating `true` as
/// success. `last_working` is a position already known to be seekable (e.g.
/// the start of the file) and is always the final fallback.
pub fn recover<F: FnMut(i64) -> bool>(min: i64, max: i64, last_working: i64, seek: &mut F) {
    if max == 0 {
        seek(last_working);
        return;
    }
    if seek(max) {
        return;
    }

    let mid = min + (max - min) / 2;
    if mid == min || mid == max {
        seek(last_working);
        return;
    }

    if seek(mid) {
        recover(mid, max, mid, seek);
    } else {
        recover(min, mid, last_working, seek);
    }
}
