//! Domain normalization.
//!
//! User input such as `https://www.Example.com` is reduced to the bare,
//! lowercase host `example.com`. Only normalized values can be represented
//! as a [`Domain`], so every stored domain has already been through
//! [`normalize`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const MAX_LABEL_LEN: usize = 63;

/// A normalized host name: lowercase, no scheme, no leading `www.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `www.`-prefixed form that is blocked alongside the bare name.
    pub fn www(&self) -> String {
        format!("www.{}", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Domain {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

/// Canonicalize a user-supplied site string.
///
/// Strips an optional `http://` / `https://` scheme and any `www.`
/// prefix, lowercases the rest and checks it against the DNS label grammar.
/// Never partially accepts: anything left over after stripping must be a
/// complete host name.
pub fn normalize(input: &str) -> Result<Domain, CoreError> {
    let invalid = || CoreError::InvalidDomain {
        input: input.to_string(),
    };

    let mut rest = input.trim();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = strip_prefix_ignore_case(rest, scheme) {
            rest = stripped;
            break;
        }
    }
    // Repeated so that `www.www.x.com` and its normal form agree.
    while let Some(stripped) = strip_prefix_ignore_case(rest, "www.") {
        rest = stripped;
    }

    let candidate = rest.to_ascii_lowercase();
    if candidate.is_empty() || !is_valid_host(&candidate) {
        return Err(invalid());
    }
    Ok(Domain(candidate))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// One or more `label.` groups followed by an alphabetic top label of at
/// least two characters.
fn is_valid_host(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    let Some((top, rest)) = labels.split_last() else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    let top_ok = (2..=MAX_LABEL_LEN).contains(&top.len())
        && top.bytes().all(|b| b.is_ascii_alphabetic());
    top_ok && rest.iter().all(|label| is_valid_label(label))
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    bytes.len() <= MAX_LABEL_LEN
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn strips_scheme_and_www_and_lowercases() {
        let domain = normalize("http://www.Example.com").expect("valid");
        assert_eq!(domain.as_str(), "example.com");
    }

    #[test]
    fn rejects_garbage() {
        let err = normalize("not a domain!!").unwrap_err();
        assert!(matches!(err, CoreError::InvalidDomain { .. }));
    }

    #[rstest]
    #[case("example.com", "example.com")]
    #[case("HTTPS://News.Ycombinator.com", "news.ycombinator.com")]
    #[case("  www.reddit.com  ", "reddit.com")]
    #[case("sub-domain.example.co.uk", "sub-domain.example.co.uk")]
    #[case("a1.b2.io", "a1.b2.io")]
    fn accepts_valid_hosts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input).expect("valid").as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("https://")]
    #[case("www.")]
    #[case("localhost")]
    #[case("example.c")]
    #[case("example.c0m")]
    #[case("-bad.com")]
    #[case("bad-.com")]
    #[case("double..dot.com")]
    #[case("example.com/path")]
    #[case("ftp://example.com")]
    fn rejects_invalid_hosts(#[case] input: &str) {
        assert!(normalize(input).is_err(), "{input:?} should be rejected");
    }

    #[test]
    fn label_length_limit() {
        let ok = format!("{}.com", "a".repeat(63));
        let too_long = format!("{}.com", "a".repeat(64));
        assert!(normalize(&ok).is_ok());
        assert!(normalize(&too_long).is_err());
    }

    #[rstest]
    #[case("http://www.Example.com")]
    #[case("www.www.example.com")]
    #[case("Mail.Google.com")]
    fn normalization_is_idempotent(#[case] input: &str) {
        let once = normalize(input).expect("valid");
        let twice = normalize(once.as_str()).expect("still valid");
        assert_eq!(once, twice);
    }

    #[test]
    fn www_form() {
        assert_eq!(normalize("example.com").unwrap().www(), "www.example.com");
    }

    #[test]
    fn deserialize_normalizes() {
        let domain: Domain = serde_json::from_str("\"WWW.Example.org\"").expect("deserialize");
        assert_eq!(domain.as_str(), "example.org");
        assert!(serde_json::from_str::<Domain>("\"nope\"").is_err());
    }
}
