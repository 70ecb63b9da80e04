//! Retailer allow-list for purchase links.

/// Hosts (and their subdomains) accepted as purchase links.
pub const RETAILER_DOMAINS: &[&str] = &[
    "bandcamp.com",
    "amazon.com",
    "roughtrade.com",
    "discogs.com",
    "merchbar.com",
    "turntablelab.com",
    "urbanoutfitters.com",
    "target.com",
];

/// Returns `url` when it is an http(s) link to an allow-listed retailer.
pub fn purchase_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_lowercase();
    let allowed = RETAILER_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));
    allowed.then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allow_listed_hosts_and_subdomains() {
        assert!(purchase_url("https://amazon.com/dp/B000").is_some());
        assert!(purchase_url("https://www.roughtrade.com/us/product/x").is_some());
        assert!(purchase_url("https://khruangbin.bandcamp.com/album/mordechai").is_some());
    }

    #[test]
    fn rejects_lookalike_and_unlisted_hosts() {
        assert!(purchase_url("https://notbandcamp.com/album").is_none());
        assert!(purchase_url("https://bandcamp.com.evil.example/album").is_none());
        assert!(purchase_url("https://www.reddit.com/r/VinylReleases/comments/x").is_none());
        assert!(purchase_url("https://i.redd.it/abc.jpg").is_none());
    }

    #[test]
    fn rejects_non_http_or_unparsable_urls() {
        assert!(purchase_url("ftp://bandcamp.com/file").is_none());
        assert!(purchase_url("bandcamp.com/album").is_none());
        assert!(purchase_url("").is_none());
    }
}
