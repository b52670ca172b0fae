//! `Range: bytes=<start>-<end>` handling for media responses.
//!
//! Narrower than RFC 9110: one range per request, a missing or non-numeric
//! start means `0`, and the end never exceeds `start + chunk_size`.

use crate::application_port::RangeError;
use crate::domain_model::ByteWindow;

const RANGE_UNIT: &str = "bytes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    pub chunk_size: u64,
}

impl RangePolicy {
    pub fn new(chunk_size: u64) -> Self {
        RangePolicy { chunk_size }
    }

    /// Computes the inclusive window to serve.
    ///
    /// On success `0 <= start <= end <= file_size - 1` always holds.
    pub fn compute_window(
        &self,
        range_header: Option<&str>,
        file_size: u64,
    ) -> Result<ByteWindow, RangeError> {
        let value = range_header.ok_or(RangeError::MissingRange)?.trim();

        let (unit, ranges) = value.split_once('=').ok_or(RangeError::MalformedRange)?;
        if !unit.trim().eq_ignore_ascii_case(RANGE_UNIT) || ranges.contains(',') {
            return Err(RangeError::MalformedRange);
        }

        let (start, end) = ranges.split_once('-').unwrap_or((ranges, ""));
        let start = start.trim().parse::<u64>().unwrap_or(0);
        let requested_end = end.trim().parse::<u64>().ok();

        if file_size == 0 || start >= file_size {
            return Err(RangeError::Unsatisfiable { size: file_size });
        }

        let cap = start.saturating_add(self.chunk_size);
        let end = requested_end
            .map_or(cap, |end| end.min(cap))
            .min(file_size - 1);
        if end < start {
            return Err(RangeError::MalformedRange);
        }

        Ok(ByteWindow { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: u64 = 1_000_000;

    fn policy() -> RangePolicy {
        RangePolicy::new(CHUNK)
    }

    #[test]
    fn open_end_is_capped_by_chunk_and_size() {
        let window = policy().compute_window(Some("bytes=0-"), 100_000).unwrap();
        assert_eq!(window, ByteWindow { start: 0, end: CHUNK.min(100_000 - 1) });

        let big = 10 * CHUNK;
        let window = policy().compute_window(Some("bytes=0-"), big).unwrap();
        assert_eq!(window, ByteWindow { start: 0, end: CHUNK });
    }

    #[test]
    fn end_is_clamped_near_end_of_file() {
        let window = policy().compute_window(Some("bytes=900-"), 1000).unwrap();
        assert_eq!(window, ByteWindow { start: 900, end: 999 });
    }

    #[test]
    fn explicit_end_is_honoured_within_bounds() {
        let window = policy().compute_window(Some("bytes=10-19"), 1000).unwrap();
        assert_eq!(window, ByteWindow { start: 10, end: 19 });
        assert_eq!(window.len(), 10);

        let window = policy().compute_window(Some("bytes=5-5000"), 1000).unwrap();
        assert_eq!(window, ByteWindow { start: 5, end: 999 });
    }

    #[test]
    fn explicit_end_is_capped_by_chunk() {
        let size = 10 * CHUNK;
        let window = policy()
            .compute_window(Some("bytes=0-9999999"), size)
            .unwrap();
        assert_eq!(window.end, CHUNK);
    }

    #[test]
    fn non_numeric_start_is_zero() {
        let window = policy().compute_window(Some("bytes=-"), 2000).unwrap();
        assert_eq!(window, ByteWindow { start: 0, end: 1999 });

        let window = policy().compute_window(Some("bytes=abc-99"), 2000).unwrap();
        assert_eq!(window, ByteWindow { start: 0, end: 99 });
    }

    #[test]
    fn missing_header_is_an_error() {
        assert_eq!(
            policy().compute_window(None, 1000),
            Err(RangeError::MissingRange)
        );
    }

    #[test]
    fn foreign_units_and_multi_ranges_are_malformed() {
        for header in ["items=0-1", "0-1", "bytes=0-1,5-9", "bytes=50-10"] {
            assert_eq!(
                policy().compute_window(Some(header), 1000),
                Err(RangeError::MalformedRange),
                "header={header}"
            );
        }
    }

    #[test]
    fn start_past_end_of_file_is_unsatisfiable() {
        assert_eq!(
            policy().compute_window(Some("bytes=1000-"), 1000),
            Err(RangeError::Unsatisfiable { size: 1000 })
        );
        assert_eq!(
            policy().compute_window(Some("bytes=0-"), 0),
            Err(RangeError::Unsatisfiable { size: 0 })
        );
    }

    #[test]
    fn window_stays_inside_the_file() {
        let headers = [
            "bytes=0-", "bytes=1-", "bytes=-", "bytes=0-0", "bytes=7-3000000",
            "bytes=999-", "bytes=x-y", "bytes=18446744073709551615-",
        ];
        for size in [1u64, 2, 999, 1000, 1_000_001, u64::MAX] {
            for header in headers {
                if let Ok(w) = RangePolicy::new(7).compute_window(Some(header), size) {
                    assert!(w.start <= w.end && w.end <= size - 1, "{header} size={size} {w:?}");
                    assert!(w.len() <= 8);
                }
            }
        }
    }
}
