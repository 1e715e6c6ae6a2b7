pub use url::Url;

/// Extracts the host component of an attribute value.
///
/// Protocol-relative values (`//host/path`) are resolved against `http:` first.
/// Relative paths and anything that does not parse as a URL have no host.
pub fn parse_host(value: &str) -> Option<String> {
    let value = value.trim();

    let parsed = if value.starts_with("//") {
        Url::parse(&format!("http:{value}"))
    } else {
        Url::parse(value)
    };

    parsed
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_lowercase()))
}

/// Values starting with `http` or `//` are never rewritten by the asset rules.
pub fn is_absolute(value: &str) -> bool {
    value.starts_with("http") || value.starts_with("//")
}

/// Root-relative path, i.e. `/foo` but not `//foo`.
pub fn is_root_relative(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//")
}

/// Drops scheme and host from a fully-qualified URL, keeping path and query.
///
/// Values without a host, or whose URL carries no usable path, come back as-is.
pub fn convert_absolute_to_relative(value: &str) -> String {
    if parse_host(value).is_none() {
        return value.to_string();
    }

    let parsed = if value.starts_with("//") {
        Url::parse(&format!("http:{value}"))
    } else {
        Url::parse(value)
    };

    match parsed {
        Ok(url) if !url.cannot_be_a_base() => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        _ => value.to_string(),
    }
}

/// Parses a hostname out of an environment-style setting.
///
/// The setting may hold a comma separated list of hosts, in which case the
/// last one wins. Any `http://` or `https://` scheme is stripped.
pub fn parse_host_name(hostname: &str) -> String {
    let last = hostname.split(',').next_back().unwrap_or_default().trim();

    last.replace("https://", "").replace("http://", "")
}

/// Strips leading and trailing slashes.
pub fn trim_slashes(value: &str) -> &str {
    value.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_absolute_url() {
        assert_eq!(
            parse_host("https://kymp.blob.core.windows.net/test/img.png?itok=1"),
            Some("kymp.blob.core.windows.net".to_string())
        );
        assert_eq!(
            parse_host("//Foreign.Example/b/img.png"),
            Some("foreign.example".to_string())
        );
    }

    #[test]
    fn relative_values_have_no_host() {
        assert_eq!(parse_host("/core/misc/logo.svg"), None);
        assert_eq!(parse_host("img.png"), None);
        assert_eq!(parse_host(""), None);
        assert_eq!(parse_host("mailto:someone@example.test"), None);
    }

    #[test]
    fn absolute_to_relative_keeps_query() {
        assert_eq!(
            convert_absolute_to_relative("https://example.test/themes/x/img.png?itok=abc"),
            "/themes/x/img.png?itok=abc"
        );
        assert_eq!(
            convert_absolute_to_relative("/already/relative.png"),
            "/already/relative.png"
        );
    }

    #[test]
    fn host_name_list_uses_last_entry() {
        assert_eq!(parse_host_name("https://a.example,http://b.example"), "b.example");
        assert_eq!(parse_host_name("www.hel.fi"), "www.hel.fi");
    }

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("https://example.test"));
        assert!(is_absolute("//example.test/a.png"));
        assert!(!is_absolute("/a.png"));
        assert!(is_root_relative("/a.png"));
        assert!(!is_root_relative("//a.png"));
    }
}
