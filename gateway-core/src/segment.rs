//! Segment Parser.
//!
//! Normalizes a path string into an ordered sequence of [`Segment`]s and
//! classifies each one. No percent-decoding happens here — matching is
//! byte-exact on segments, by design.

/// A single classified path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal segment matched exactly.
    Static(String),
    /// A `{name}` segment; binds `name` to whatever value occupies this
    /// position during a match.
    Param(String),
    /// The literal `*`; binds under the fixed key `"wildcard"`.
    Wildcard,
}

impl Segment {
    /// Classifies a single already-split path component.
    ///
    /// A segment is a parameter iff it has length > 2 and its first and
    /// last bytes are `{` and `}`. A segment is a wildcard iff it equals
    /// `*`. Everything else is static.
    pub fn classify(raw: &str) -> Segment {
        if raw == "*" {
            Segment::Wildcard
        } else if raw.len() > 2 && raw.as_bytes()[0] == b'{' && raw.as_bytes()[raw.len() - 1] == b'}' {
            Segment::Param(raw[1..raw.len() - 1].to_string())
        } else {
            Segment::Static(raw.to_string())
        }
    }

    /// The literal form of this segment, as it appears on the wire.
    pub fn render(&self) -> String {
        match self {
            Segment::Static(s) => s.clone(),
            Segment::Param(name) => format!("{{{name}}}"),
            Segment::Wildcard => "*".to_string(),
        }
    }
}

/// Strips leading and trailing `/`, splits on `/`, and classifies each
/// component. Empty input yields the empty sequence.
pub fn parse_uri(s: &str) -> Vec<Segment> {
    let trimmed = s.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(Segment::classify).collect()
}

/// Same trimming and splitting rule as [`parse_uri`], without the
/// classification step. Used to split an incoming request path for trie
/// traversal, where matching is against the trie's existing shape rather
/// than against a freshly classified pattern.
pub fn split_request_path(s: &str) -> Vec<&str> {
    let trimmed = s.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Left inverse of [`parse_uri`] on normalized input. Always starts with
/// `/`; the empty sequence renders as `/`.
pub fn build_uri_pattern(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(&seg.render());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_static_segments() {
        let segs = parse_uri("/v1/users");
        assert_eq!(segs, vec![Segment::Static("v1".into()), Segment::Static("users".into())]);
    }

    #[test]
    fn parses_param_segment() {
        let segs = parse_uri("/v1/users/{id}");
        assert_eq!(
            segs,
            vec![
                Segment::Static("v1".into()),
                Segment::Static("users".into()),
                Segment::Param("id".into())
            ]
        );
    }

    #[test]
    fn parses_wildcard_segment() {
        let segs = parse_uri("/assets/*");
        assert_eq!(segs, vec![Segment::Static("assets".into()), Segment::Wildcard]);
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        assert_eq!(parse_uri(""), Vec::new());
        assert_eq!(parse_uri("/"), Vec::new());
    }

    #[test]
    fn braces_shorter_than_three_bytes_are_static() {
        // len() > 2 is required, so "{}" (len 2) is static, not a param.
        assert_eq!(parse_uri("/{}"), vec![Segment::Static("{}".into())]);
    }

    #[test]
    fn split_request_path_matches_parse_uri_text() {
        assert_eq!(split_request_path("/users/42"), vec!["users", "42"]);
        assert_eq!(split_request_path("/"), Vec::<&str>::new());
    }

    #[test]
    fn build_uri_pattern_is_left_inverse_on_normalized_input() {
        let original = "/v1/users/{id}/posts/*";
        let segs = parse_uri(original);
        assert_eq!(build_uri_pattern(&segs), original);
    }

    #[test]
    fn build_uri_pattern_of_empty_sequence_is_root() {
        assert_eq!(build_uri_pattern(&[]), "/");
    }

    #[test]
    fn leading_and_trailing_slashes_are_stripped_but_interior_empties_are_not_collapsed() {
        assert_eq!(parse_uri("///v1/users///"), parse_uri("v1/users"));
        // An interior double slash produces an empty static segment, per the
        // "split on /" rule — this is intentional, not a bug: ParseURI does
        // no normalization beyond trimming the ends.
        assert_eq!(
            parse_uri("/v1//users"),
            vec![Segment::Static("v1".into()), Segment::Static("".into()), Segment::Static("users".into())]
        );
    }
}
