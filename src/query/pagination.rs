//! Collection pagination: bounded query arguments, page metadata and
//! navigation links.
//!
//! Everything here is a pure function of its inputs; the count query and the
//! data query are issued by the handlers. Handlers compose the pieces as
//! `build_query_args` -> store -> `page_info` -> `page_links` ->
//! `page_headers`.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::config;
use crate::query::projection::project;

/// Client-facing pagination parameters, all optional.
///
/// Values that do not parse as numbers are treated as absent, so a garbled
/// `?page=abc` falls back to defaults instead of failing extraction with a
/// body that bypasses the error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub per_page: Option<i64>,
    /// Comma-separated field projection
    pub fields: Option<String>,
}

/// Query-string values always arrive as strings; parse them and drop
/// anything non-numeric.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

/// Bounded store-query arguments derived from untrusted query parameters.
/// Never built from raw client input directly.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// Allow-listed projection; `None` means the endpoint default
    pub select: Option<Vec<String>>,
    pub skip: i64,
    pub take: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page: i64,
    pub total_count: i64,
    pub total_page_count: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub first: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub last: Option<String>,
}

/// Turn raw query parameters into clamped query arguments.
///
/// Returns the arguments together with the coerced page number, which the
/// handler needs again for link generation.
pub fn build_query_args(query: &PageQuery, allowed: &[&str]) -> (QueryArgs, i64) {
    let pagination = &config::config().pagination;

    let page = query.page.unwrap_or(1).max(1);
    let take = query
        .per_page
        .unwrap_or(pagination.default_per_page)
        .clamp(1, pagination.max_per_page);
    // Saturate: an absurd page number must yield an empty page, not an
    // overflow or a negative OFFSET
    let skip = page.saturating_sub(1).saturating_mul(take);

    let select = project(query.fields.as_deref(), allowed);

    (QueryArgs { select, skip, take }, page)
}

/// Page metadata for a collection response.
///
/// `total_page_count` is zero exactly when the collection is empty;
/// out-of-range pages yield empty collections upstream, never an error.
pub fn page_info(total_count: i64, take: i64, page: i64) -> PageInfo {
    let total_page_count = if total_count == 0 {
        0
    } else {
        (total_count + take - 1) / take
    };

    PageInfo {
        page,
        total_count,
        total_page_count,
        per_page: take,
    }
}

/// Navigation links for the `Link` header, rebuilt from the request URI with
/// every other query parameter preserved and `page` overwritten.
///
/// `first`/`prev` are omitted on the first page, `next`/`last` once the last
/// page is reached (so an empty collection gets no links at all).
pub fn page_links(page: i64, total_page_count: i64, request_uri: &str) -> PageLinks {
    PageLinks {
        first: (page > 1).then(|| with_page(request_uri, 1)),
        prev: (page > 1).then(|| with_page(request_uri, page - 1)),
        next: (page < total_page_count).then(|| with_page(request_uri, page + 1)),
        last: (page < total_page_count).then(|| with_page(request_uri, total_page_count)),
    }
}

/// Response headers for a paginated collection. Header names are part of the
/// client contract and must stay stable.
pub fn page_headers(info: &PageInfo, links: &PageLinks) -> HeaderMap {
    let mut headers = HeaderMap::new();

    insert_header(&mut headers, "x-total-count", info.total_count.to_string());
    insert_header(
        &mut headers,
        "x-total-page-count",
        info.total_page_count.to_string(),
    );
    insert_header(&mut headers, "x-page", info.page.to_string());
    insert_header(&mut headers, "x-per-page", info.per_page.to_string());

    if let Some(link) = format_link_header(links) {
        insert_header(&mut headers, "link", link);
    }

    headers
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn format_link_header(links: &PageLinks) -> Option<String> {
    let rels = [
        ("first", &links.first),
        ("prev", &links.prev),
        ("next", &links.next),
        ("last", &links.last),
    ];

    let parts: Vec<String> = rels
        .iter()
        .filter_map(|(rel, target)| {
            target
                .as_ref()
                .map(|t| format!("<{}>; rel=\"{}\"", t, rel))
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn with_page(request_uri: &str, page: i64) -> String {
    // Relative URIs need a throwaway base to round-trip through Url
    let Ok(base) = Url::parse("http://localhost") else {
        return request_uri.to_string();
    };
    let Ok(mut url) = base.join(request_uri) else {
        return request_uri.to_string();
    };

    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &others {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("page", &page.to_string());
    }

    format!("{}?{}", url.path(), url.query().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[&str] = &["id", "username"];

    #[test]
    fn defaults_and_clamping() {
        let (args, page) = build_query_args(&PageQuery::default(), ALLOWED);
        assert_eq!(page, 1);
        assert_eq!(args.skip, 0);
        assert_eq!(args.take, 10);
        assert_eq!(args.select, None);

        let query = PageQuery {
            page: Some(-3),
            per_page: Some(0),
            fields: None,
        };
        let (args, page) = build_query_args(&query, ALLOWED);
        assert_eq!(page, 1);
        assert_eq!(args.take, 1);

        let query = PageQuery {
            page: Some(4),
            per_page: Some(100_000),
            fields: None,
        };
        let (args, page) = build_query_args(&query, ALLOWED);
        assert_eq!(page, 4);
        assert_eq!(args.take, 100);
        assert_eq!(args.skip, 300);
    }

    #[test]
    fn huge_page_numbers_saturate_instead_of_overflowing() {
        let query = PageQuery {
            page: Some(i64::MAX),
            per_page: Some(10),
            fields: None,
        };
        let (args, page) = build_query_args(&query, ALLOWED);
        assert_eq!(page, i64::MAX);
        assert_eq!(args.take, 10);
        assert_eq!(args.skip, i64::MAX);
        assert!(args.skip >= 0);
    }

    #[test]
    fn non_numeric_parameters_fall_back_to_defaults() {
        let query: PageQuery = serde_json::from_value(serde_json::json!({
            "page": "abc",
            "per_page": "-",
            "fields": "id",
        }))
        .unwrap();
        assert_eq!(query.page, None);
        assert_eq!(query.per_page, None);

        let (args, page) = build_query_args(&query, ALLOWED);
        assert_eq!(page, 1);
        assert_eq!(args.take, 10);
        assert_eq!(args.skip, 0);
    }

    #[test]
    fn numeric_strings_parse_as_usual() {
        let query: PageQuery = serde_json::from_value(serde_json::json!({
            "page": "3",
            "per_page": " 20 ",
        }))
        .unwrap();
        assert_eq!(query.page, Some(3));
        assert_eq!(query.per_page, Some(20));
    }

    #[test]
    fn projection_flows_into_args() {
        let query = PageQuery {
            page: None,
            per_page: None,
            fields: Some("username,password_digest".to_string()),
        };
        let (args, _) = build_query_args(&query, ALLOWED);
        assert_eq!(args.select, Some(vec!["username".to_string()]));
    }

    #[test]
    fn page_count_is_ceiling_of_total_over_take() {
        assert_eq!(page_info(0, 10, 1).total_page_count, 0);
        assert_eq!(page_info(1, 10, 1).total_page_count, 1);
        assert_eq!(page_info(10, 10, 1).total_page_count, 1);
        assert_eq!(page_info(11, 10, 1).total_page_count, 2);
        assert_eq!(page_info(25, 10, 1).total_page_count, 3);
    }

    #[test]
    fn page_count_zero_only_when_empty() {
        for total in 1..50 {
            for take in 1..8 {
                let info = page_info(total, take, 1);
                assert!(info.total_page_count >= 1);
                assert_eq!(info.total_page_count, (total + take - 1) / take);
            }
        }
    }

    #[test]
    fn first_page_has_no_backward_links() {
        let links = page_links(1, 3, "/api/v1/users");
        assert_eq!(links.first, None);
        assert_eq!(links.prev, None);
        assert!(links.next.is_some());
        assert!(links.last.is_some());
    }

    #[test]
    fn last_page_has_no_forward_links() {
        let links = page_links(3, 3, "/api/v1/users");
        assert!(links.first.is_some());
        assert!(links.prev.is_some());
        assert_eq!(links.next, None);
        assert_eq!(links.last, None);
    }

    #[test]
    fn empty_collection_has_no_links() {
        assert_eq!(page_links(1, 0, "/api/v1/users"), PageLinks::default());
    }

    #[test]
    fn middle_page_links_to_both_sides() {
        // take=10 over 25 records gives 3 pages; page 2 points both ways
        let info = page_info(25, 10, 2);
        assert_eq!(info.total_page_count, 3);

        let links = page_links(2, info.total_page_count, "/api/v1/users?per_page=10&page=2");
        assert_eq!(links.prev.as_deref(), Some("/api/v1/users?per_page=10&page=1"));
        assert_eq!(links.next.as_deref(), Some("/api/v1/users?per_page=10&page=3"));
        assert_eq!(links.last.as_deref(), Some("/api/v1/users?per_page=10&page=3"));
    }

    #[test]
    fn links_preserve_other_query_parameters() {
        let links = page_links(2, 5, "/api/v1/messages?fields=id,content&page=2&per_page=5");
        let next = links.next.unwrap();
        assert!(next.contains("fields=id%2Ccontent"));
        assert!(next.contains("per_page=5"));
        assert!(next.ends_with("page=3"));
        assert_eq!(next.matches("page=").count(), 2); // per_page + page
    }

    #[test]
    fn headers_carry_the_contract_names() {
        let info = page_info(25, 10, 2);
        let links = page_links(2, info.total_page_count, "/api/v1/users");
        let headers = page_headers(&info, &links);

        assert_eq!(headers["x-total-count"], "25");
        assert_eq!(headers["x-total-page-count"], "3");
        assert_eq!(headers["x-page"], "2");
        assert_eq!(headers["x-per-page"], "10");

        let link = headers["link"].to_str().unwrap();
        assert!(link.contains("rel=\"first\""));
        assert!(link.contains("rel=\"prev\""));
        assert!(link.contains("rel=\"next\""));
        assert!(link.contains("rel=\"last\""));
    }

    #[test]
    fn no_link_header_for_empty_collections() {
        let info = page_info(0, 10, 1);
        let headers = page_headers(&info, &page_links(1, 0, "/api/v1/users"));
        assert!(headers.get("link").is_none());
        assert_eq!(headers["x-total-count"], "0");
        assert_eq!(headers["x-total-page-count"], "0");
    }
}
