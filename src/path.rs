//! Feed path construction.

use crate::error::StreamError;
use crate::types::{Direction, StreamVersion, Take, DEFAULT_PAGE_SIZE, HEAD};

/// Build the path of one feed page.
///
/// `version` is either a non-negative event number or [`HEAD`]. Head is only
/// meaningful when reading backward.
///
/// ```
/// use atomstore::{build_feed_path, HEAD};
///
/// assert_eq!(
///     build_feed_path("foostream", "forward", 0, 10).unwrap(),
///     "/streams/foostream/0/forward/10"
/// );
/// assert_eq!(
///     build_feed_path("foostream", "backward", HEAD, 20).unwrap(),
///     "/streams/foostream/head/backward/20"
/// );
/// ```
pub fn build_feed_path(
    stream: &str,
    direction: &str,
    version: i64,
    page_size: u32,
) -> Result<String, StreamError> {
    let direction: Direction = direction.parse()?;

    let segment = match version {
        HEAD if direction == Direction::Forward => {
            return Err(StreamError::InvalidDirectionVersionCombination {
                direction: direction.to_string(),
            })
        }
        HEAD => "head".to_string(),
        n if n < 0 => return Err(StreamError::InvalidVersion(n)),
        n => n.to_string(),
    };

    Ok(format!("/streams/{stream}/{segment}/{direction}/{page_size}"))
}

/// Build the path of the first page of a read.
///
/// - No version means head for backward reads and 0 for forward reads.
/// - The page size is the take when it is below [`DEFAULT_PAGE_SIZE`], else
///   the default. It bounds one round trip, not the total read.
pub fn build_feed_url(
    stream: &str,
    direction: Direction,
    version: Option<StreamVersion>,
    take: Option<Take>,
) -> Result<String, StreamError> {
    let version = match version {
        Some(v) if v.number < 0 => return Err(StreamError::InvalidVersion(v.number)),
        Some(v) => v.number,
        None => match direction {
            Direction::Backward => HEAD,
            Direction::Forward => 0,
        },
    };

    build_feed_path(stream, direction.as_str(), version, page_size(take))
}

/// Page size used for requests made on behalf of `take`.
pub(crate) fn page_size(take: Option<Take>) -> u32 {
    match take {
        Some(t) if t.number < DEFAULT_PAGE_SIZE => t.number.max(1),
        _ => DEFAULT_PAGE_SIZE,
    }
}
