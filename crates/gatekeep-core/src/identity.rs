//! Client identity extraction from proxy headers.
//!
//! The extractor is purely structural: values are not validated as IP
//! addresses, only picked by header precedence.

/// Identifier returned when no usable header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone, Copy)]
enum HeaderShape {
    /// Comma-separated chain, leftmost entry is the original client.
    Chain,
    /// A single address.
    Single,
}

/// Headers consulted in order; the first one with a usable value wins.
const PRECEDENCE: [(&str, HeaderShape); 4] = [
    ("x-forwarded-for", HeaderShape::Chain),
    ("x-real-ip", HeaderShape::Single),
    ("x-vercel-forwarded-for", HeaderShape::Chain),
    ("cf-connecting-ip", HeaderShape::Single),
];

/// Derive the identifier to rate limit under from request headers.
///
/// Header names are matched case-insensitively. Empty values are treated as
/// absent. Returns [`UNKNOWN_CLIENT`] when nothing usable is present.
pub fn client_identifier<'a, I>(headers: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let headers: Vec<(&str, &str)> = headers.into_iter().collect();

    PRECEDENCE
        .iter()
        .find_map(|(name, shape)| {
            headers
                .iter()
                .filter(|(header, _)| header.eq_ignore_ascii_case(name))
                .find_map(|(_, value)| extract(value, *shape))
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn extract(value: &str, shape: HeaderShape) -> Option<&str> {
    let candidate = match shape {
        HeaderShape::Chain => value.split(',').next().unwrap_or_default(),
        HeaderShape::Single => value,
    }
    .trim();

    (!candidate.is_empty()).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_chain_beats_real_ip() {
        let headers = [
            ("X-Real-IP", "198.51.100.1"),
            ("X-Forwarded-For", "203.0.113.7, 10.0.0.1, 10.0.0.2"),
        ];
        assert_eq!(client_identifier(headers), "203.0.113.7");
    }

    #[test]
    fn test_no_headers_is_unknown() {
        assert_eq!(client_identifier(Vec::<(&str, &str)>::new()), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let headers = [("x-REAL-ip", " 198.51.100.1 ")];
        assert_eq!(client_identifier(headers), "198.51.100.1");
    }

    #[test]
    fn test_platform_chain_then_cdn_header() {
        let headers = [
            ("CF-Connecting-IP", "192.0.2.9"),
            ("X-Vercel-Forwarded-For", "192.0.2.44,192.0.2.45"),
        ];
        assert_eq!(client_identifier(headers), "192.0.2.44");

        let headers = [("CF-Connecting-IP", "192.0.2.9")];
        assert_eq!(client_identifier(headers), "192.0.2.9");
    }

    #[test]
    fn test_empty_values_are_absent() {
        let headers = [
            ("X-Forwarded-For", ""),
            ("X-Real-IP", "   "),
            ("CF-Connecting-IP", "192.0.2.9"),
        ];
        assert_eq!(client_identifier(headers), "192.0.2.9");

        let headers = [("X-Forwarded-For", " , 10.0.0.1")];
        assert_eq!(client_identifier(headers), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_values_are_not_validated() {
        let headers = [("X-Forwarded-For", "not-an-ip")];
        assert_eq!(client_identifier(headers), "not-an-ip");
    }
}
