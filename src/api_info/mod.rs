//! Response metadata parsed from GitHub API headers.

use crate::envelope::{Envelope, Headers};
use crate::errors::Result;
use crate::middleware::Handler;
use async_trait::async_trait;

/// Rate limit state reported by the API.
///
/// Missing or unparseable headers clamp to 0; header parsing never fails a
/// response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum requests allowed in the current window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// Unix timestamp at which the window resets.
    pub reset: u64,
}

/// Pagination link relations parsed from the `Link` header (RFC 8288).
///
/// When a relation appears more than once, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl Links {
    /// Parses pagination links from a `Link` header value.
    ///
    /// Entries lacking a recognized `rel` or an angle-bracketed URL are
    /// skipped; parsing continues with the remaining entries.
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();

        for part in header_value.split(',') {
            let mut url = None;
            let mut rel = None;

            for segment in part.split(';') {
                let segment = segment.trim();
                if segment.starts_with('<') && segment.ends_with('>') {
                    url = Some(segment[1..segment.len() - 1].to_string());
                } else if let Some(value) = segment.strip_prefix("rel=") {
                    rel = Some(value.trim_matches('"').to_string());
                }
            }

            if let (Some(url), Some(rel)) = (url, rel) {
                match rel.as_str() {
                    "next" => links.next = Some(url),
                    "prev" => links.prev = Some(url),
                    "first" => links.first = Some(url),
                    "last" => links.last = Some(url),
                    _ => {}
                }
            }
        }

        links
    }

    /// Looks up a relation by name.
    pub fn get(&self, rel: &str) -> Option<&str> {
        match rel {
            "next" => self.next.as_deref(),
            "prev" => self.prev.as_deref(),
            "first" => self.first.as_deref(),
            "last" => self.last.as_deref(),
            _ => None,
        }
    }

    /// Returns true if a next page exists.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Read-only metadata derived from a response's headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiInfo {
    /// OAuth scopes granted to the presented token.
    pub oauth_scopes: Vec<String>,
    /// OAuth scopes accepted by the called endpoint.
    pub accepted_oauth_scopes: Vec<String>,
    /// ETag of the response, verbatim.
    pub etag: Option<String>,
    /// Rate limit state.
    pub rate_limit: RateLimit,
    /// Pagination link relations.
    pub links: Links,
}

impl ApiInfo {
    /// Parses API metadata from response headers.
    ///
    /// Every header is independently optional; absent or malformed values
    /// leave the corresponding field at its zero value.
    pub fn from_headers(headers: &Headers) -> Self {
        Self {
            accepted_oauth_scopes: parse_scopes(headers.get("X-Accepted-OAuth-Scopes")),
            oauth_scopes: parse_scopes(headers.get("X-OAuth-Scopes")),
            rate_limit: RateLimit {
                limit: parse_int(headers.get("X-RateLimit-Limit")),
                remaining: parse_int(headers.get("X-RateLimit-Remaining")),
                reset: parse_int(headers.get("X-RateLimit-Reset")),
            },
            etag: headers.get("ETag").map(String::from),
            links: headers
                .get("Link")
                .map(Links::from_header)
                .unwrap_or_default(),
        }
    }

    /// Page number of the last page, from the `last` link relation.
    ///
    /// Returns -1 if no `last` link exists, 0 if one exists but carries no
    /// parseable `page` query parameter, else the page number.
    pub fn last_page(&self) -> i64 {
        let Some(last) = self.links.last.as_deref() else {
            return -1;
        };

        url::Url::parse(last)
            .ok()
            .and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == "page")
                    .and_then(|(_, v)| v.parse::<i64>().ok())
            })
            .unwrap_or(0)
    }
}

fn parse_scopes(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_int<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

/// Middleware that attaches parsed [`ApiInfo`] to every response.
#[derive(Debug, Default)]
pub struct ApiInfoHandler;

#[async_trait]
impl Handler for ApiInfoHandler {
    async fn after(&self, env: &mut Envelope) -> Result<()> {
        env.response.api_info = ApiInfo::from_headers(&env.response.headers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        let mut h = Headers::new();
        for (name, value) in pairs {
            h.insert(*name, *value);
        }
        h
    }

    #[test]
    fn test_parse_full_metadata() {
        let h = headers(&[
            ("X-RateLimit-Limit", "5000"),
            ("X-RateLimit-Remaining", "4997"),
            ("X-Accepted-OAuth-Scopes", "user"),
            ("X-OAuth-Scopes", "user, public_repo, repo, gist"),
            ("ETag", "5634b0b187fd2e91e3126a75006cc4fa"),
        ]);

        let info = ApiInfo::from_headers(&h);
        assert_eq!(info.rate_limit.limit, 5000);
        assert_eq!(info.rate_limit.remaining, 4997);
        assert_eq!(info.accepted_oauth_scopes, vec!["user"]);
        assert_eq!(
            info.oauth_scopes,
            vec!["user", "public_repo", "repo", "gist"]
        );
        assert_eq!(
            info.etag.as_deref(),
            Some("5634b0b187fd2e91e3126a75006cc4fa")
        );
    }

    #[test]
    fn test_absent_headers_yield_zero_values() {
        let info = ApiInfo::from_headers(&Headers::new());
        assert_eq!(info.rate_limit, RateLimit::default());
        assert!(info.oauth_scopes.is_empty());
        assert!(info.accepted_oauth_scopes.is_empty());
        assert!(info.etag.is_none());
        assert_eq!(info.links, Links::default());
    }

    #[test_case("garbage" ; "non numeric")]
    #[test_case("" ; "empty")]
    #[test_case("-5" ; "negative")]
    fn test_unparseable_rate_limit_clamps_to_zero(value: &str) {
        let h = headers(&[("X-RateLimit-Limit", value)]);
        assert_eq!(ApiInfo::from_headers(&h).rate_limit.limit, 0);
    }

    #[test]
    fn test_link_header_round_trip() {
        let h = headers(&[(
            "Link",
            "<https://api.github.com/repos/rails/rails/issues?page=4&per_page=5>; rel=\"next\", \
             <https://api.github.com/repos/rails/rails/issues?page=131&per_page=5>; rel=\"last\", \
             <https://api.github.com/repos/rails/rails/issues?page=1&per_page=5>; rel=\"first\", \
             <https://api.github.com/repos/rails/rails/issues?page=2&per_page=5>; rel=\"prev\"",
        )]);

        let info = ApiInfo::from_headers(&h);
        assert_eq!(
            info.links.next.as_deref(),
            Some("https://api.github.com/repos/rails/rails/issues?page=4&per_page=5")
        );
        assert_eq!(
            info.links.prev.as_deref(),
            Some("https://api.github.com/repos/rails/rails/issues?page=2&per_page=5")
        );
        assert_eq!(
            info.links.first.as_deref(),
            Some("https://api.github.com/repos/rails/rails/issues?page=1&per_page=5")
        );
        assert_eq!(
            info.links.last.as_deref(),
            Some("https://api.github.com/repos/rails/rails/issues?page=131&per_page=5")
        );
        assert_eq!(info.last_page(), 131);
    }

    #[test]
    fn test_malformed_link_entry_is_skipped() {
        // The first entry has no angle-bracketed URL; the rest still parse.
        let links = Links::from_header(
            "rel=\"next\", <https://api.github.com/x?page=9>; rel=\"last\"",
        );
        assert!(links.next.is_none());
        assert_eq!(links.last.as_deref(), Some("https://api.github.com/x?page=9"));
    }

    #[test]
    fn test_unrecognized_relation_is_ignored() {
        let links = Links::from_header("<https://api.github.com/x>; rel=\"alternate\"");
        assert_eq!(links, Links::default());
    }

    #[test]
    fn test_duplicate_relation_last_wins() {
        let links = Links::from_header(
            "<https://a.example/1>; rel=\"next\", <https://a.example/2>; rel=\"next\"",
        );
        assert_eq!(links.next.as_deref(), Some("https://a.example/2"));
    }

    #[test]
    fn test_last_page_missing_link() {
        let info = ApiInfo::default();
        assert_eq!(info.last_page(), -1);
    }

    #[test]
    fn test_last_page_without_page_param() {
        let h = headers(&[("Link", "<https://api.github.com/repos>; rel=\"last\"")]);
        assert_eq!(ApiInfo::from_headers(&h).last_page(), 0);
    }

    #[test]
    fn test_headers_parse_case_insensitively() {
        let h = headers(&[("x-ratelimit-limit", "60"), ("etag", "abc")]);
        let info = ApiInfo::from_headers(&h);
        assert_eq!(info.rate_limit.limit, 60);
        assert_eq!(info.etag.as_deref(), Some("abc"));
    }
}
