//! The closed registry of typed headers.
//!
//! The registry is fixed at compile time and read-only afterwards, so it
//! can be consulted from any worker without synchronization.

use crate::headers::{ContentLength, ContentType, Header, Host};

const REGISTERED: [&str; 3] = [ContentLength::NAME, ContentType::NAME, Host::NAME];

pub fn is_registered(name: &str) -> bool {
    REGISTERED.iter().any(|registered| registered.eq_ignore_ascii_case(name))
}

/// A fresh typed header for `name`, ready for `parse_raw`, or `None` when
/// the name is not registered.
pub fn make_header(name: &str) -> Option<Box<dyn Header>> {
    if name.eq_ignore_ascii_case(ContentLength::NAME) {
        Some(Box::new(ContentLength::default()))
    } else if name.eq_ignore_ascii_case(ContentType::NAME) {
        Some(Box::new(ContentType::default()))
    } else if name.eq_ignore_ascii_case(Host::NAME) {
        Some(Box::new(Host::default()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names() {
        assert!(is_registered("Content-Length"));
        assert!(is_registered("content-length"));
        assert!(is_registered("HOST"));
        assert!(!is_registered("X-Custom"));
    }

    #[test]
    fn test_make_header_matches_is_registered() {
        assert_eq!(make_header("Content-Type").map(|h| h.name()), Some("Content-Type"));
        assert!(make_header("X-Custom").is_none());
    }
}
