use std::ops::{Range, RangeInclusive};

use http::StatusCode;

const MIN_STATUS: u16 = 100;
const MAX_STATUS: u16 = 599;

/// The status codes a call treats as a success.
///
/// A response whose status is not expected is a *failure carrying a
/// response*: the implicit-lifecycle client resolves it anyway, the clients
/// given to combinators reject it with
/// [`RequestError::UnexpectedStatus`](crate::RequestError::UnexpectedStatus).
///
/// The default is the `2xx` class. See the
/// [`expected_status_codes!`](crate::expected_status_codes) macro for a
/// compact syntax.
///
/// ```rust
/// use httptestify_core::ExpectedStatusCodes;
///
/// let codes = ExpectedStatusCodes::default().add_single(304);
/// assert!(codes.contains(204));
/// assert!(codes.contains(304));
/// assert!(!codes.contains(404));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedStatusCodes {
    // every range is normalized to an inclusive one
    ranges: Vec<RangeInclusive<u16>>,
}

impl ExpectedStatusCodes {
    /// The `2xx` class.
    pub fn new() -> Self {
        Self::from_inclusive_range(200..=299)
    }

    /// Every status, only failures without response remain failures.
    pub fn any() -> Self {
        Self::from_inclusive_range(MIN_STATUS..=MAX_STATUS)
    }

    /// Only the given status code.
    ///
    /// # Panics
    ///
    /// Panics if the status is outside 100-599.
    pub fn from_single(status: u16) -> Self {
        Self {
            ranges: vec![checked_single(status)],
        }
    }

    /// Only the given inclusive range.
    ///
    /// # Panics
    ///
    /// Panics if a bound is outside 100-599 or if the range is empty.
    pub fn from_inclusive_range(range: RangeInclusive<u16>) -> Self {
        Self {
            ranges: vec![checked_inclusive(range)],
        }
    }

    /// Only the given exclusive range, its end may be `600`.
    ///
    /// # Panics
    ///
    /// Panics if a bound is out of range or if the range is empty.
    pub fn from_exclusive_range(range: Range<u16>) -> Self {
        Self {
            ranges: vec![checked_exclusive(range)],
        }
    }

    /// Also accept a single status code.
    ///
    /// # Panics
    ///
    /// Same as [`ExpectedStatusCodes::from_single`].
    #[must_use]
    pub fn add_single(mut self, status: u16) -> Self {
        self.ranges.push(checked_single(status));
        self
    }

    /// Also accept an inclusive range.
    ///
    /// # Panics
    ///
    /// Same as [`ExpectedStatusCodes::from_inclusive_range`].
    #[must_use]
    pub fn add_inclusive_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.ranges.push(checked_inclusive(range));
        self
    }

    /// Also accept an exclusive range.
    ///
    /// # Panics
    ///
    /// Same as [`ExpectedStatusCodes::from_exclusive_range`].
    #[must_use]
    pub fn add_exclusive_range(mut self, range: Range<u16>) -> Self {
        self.ranges.push(checked_exclusive(range));
        self
    }

    /// Whether the status is a success.
    pub fn contains(&self, status: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(&status))
    }

    /// Whether the status is a success.
    pub fn contains_status_code(&self, status: StatusCode) -> bool {
        self.contains(status.as_u16())
    }
}

impl Default for ExpectedStatusCodes {
    fn default() -> Self {
        Self::new()
    }
}

impl From<StatusCode> for ExpectedStatusCodes {
    fn from(status: StatusCode) -> Self {
        Self {
            ranges: vec![status.as_u16()..=status.as_u16()],
        }
    }
}

fn checked_single(status: u16) -> RangeInclusive<u16> {
    assert!(
        (MIN_STATUS..=MAX_STATUS).contains(&status),
        "status code {status} is outside {MIN_STATUS}-{MAX_STATUS}"
    );
    status..=status
}

fn checked_inclusive(range: RangeInclusive<u16>) -> RangeInclusive<u16> {
    let (start, end) = range.into_inner();
    assert!(
        MIN_STATUS <= start && end <= MAX_STATUS,
        "status code range {start}..={end} is outside {MIN_STATUS}-{MAX_STATUS}"
    );
    assert!(start <= end, "status code range {start}..={end} is empty");
    start..=end
}

fn checked_exclusive(range: Range<u16>) -> RangeInclusive<u16> {
    let Range { start, end } = range;
    assert!(start < end, "status code range {start}..{end} is empty");
    checked_inclusive(start..=end - 1)
}
