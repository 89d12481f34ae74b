//! Display intervals encoded in file names.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

#[allow(clippy::expect_used)]
fn interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-(\d+)sec\.[A-Za-z]+(?:\?.*)?$").expect("interval pattern is valid")
    })
}

/// Parse a trailing `-<N>sec` marker, e.g. `trip/sunset-5sec.png?1700000000`.
///
/// Returns `None` when there is no marker or it is zero or out of range.
pub fn parse_interval(uri: &str) -> Option<Duration> {
    let captures = interval_pattern().captures(uri)?;
    let secs: u64 = captures.get(1)?.as_str().parse().ok()?;
    (secs > 0).then_some(Duration::from_secs(secs))
}

/// The display time for `uri`, falling back to `default`.
pub fn interval_for(uri: &str, default: Duration) -> Duration {
    parse_interval(uri).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("slide-5sec.png"), Some(Duration::from_secs(5)));
        assert_eq!(
            parse_interval("/Images/a/slide-30sec.JPG?1700000000"),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_interval("trip/sunset-5sec.png?1700000000.25"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(parse_interval("plain.png?17"), None);
        assert_eq!(parse_interval("slide-5sec-copy.png"), None);
        assert_eq!(parse_interval("slide5sec.png"), None);
    }

    #[test]
    fn test_malformed_markers_use_default() {
        let default = Duration::from_secs(10);
        assert_eq!(interval_for("zero-0sec.png", default), default);
        assert_eq!(
            interval_for("huge-99999999999999999999999sec.png", default),
            default
        );
        assert_eq!(interval_for("plain.png", default), default);
    }
}
