//! Domain normalization
//!
//! Lowercases and strips scheme, `www.` prefix and trailing slash.
//! Stripping repeats until nothing changes, so the result is a fixed point.

const SCHEMES: [&str; 2] = ["https://", "http://"];
const WWW_PREFIX: &str = "www.";

pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim().to_lowercase();

    loop {
        let before = domain.len();

        for scheme in SCHEMES {
            if let Some(rest) = domain.strip_prefix(scheme) {
                domain = rest.to_string();
            }
        }
        if let Some(rest) = domain.strip_prefix(WWW_PREFIX) {
            domain = rest.to_string();
        }
        if let Some(rest) = domain.strip_suffix('/') {
            domain = rest.to_string();
        }

        if domain.len() == before {
            return domain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_www_and_slash() {
        assert_eq!(normalize_domain("https://www.Example.com/"), "example.com");
        assert_eq!(normalize_domain("http://example.com"), "example.com");
        assert_eq!(normalize_domain("WWW.EXAMPLE.COM"), "example.com");
    }

    #[test]
    fn test_empty_and_malformed_pass_through() {
        assert_eq!(normalize_domain(""), "");
        assert_eq!(normalize_domain("   "), "");
        assert_eq!(normalize_domain("not a domain"), "not a domain");
        assert_eq!(normalize_domain("192.168.0.1"), "192.168.0.1");
    }

    #[test]
    fn test_paths_are_kept() {
        assert_eq!(normalize_domain("https://example.com/docs/"), "example.com/docs");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://www.github.com/",
            "http://http://example.com//",
            "www.www.example.org",
            "xn--80ak6aa92e.com",
            "Totally-A-Scam-Token.biz/",
            "",
        ];
        for input in inputs {
            let once = normalize_domain(input);
            assert_eq!(normalize_domain(&once), once, "not idempotent for {:?}", input);
        }
    }
}
