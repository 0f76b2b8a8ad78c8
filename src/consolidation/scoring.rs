use url::Url;

use crate::errors::CoalesceError;

/// A quality score, compared lexicographically with the most significant
/// element first. Among findings with the same normal form, the one with the
/// highest score survives; exact ties fall back to the ingestion sequence
/// number.
pub type Score = Vec<i64>;

/// Default URL score: https beats http, a host without a leading `www.`
/// beats one with it. The https bonus dominates the www penalty, so
/// https://www.host still beats http://host.
pub fn url_score(raw: &str) -> Result<i64, CoalesceError> {
    let url = Url::parse(raw).map_err(|e| CoalesceError::MalformedTarget {
        target: raw.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| CoalesceError::MalformedTarget {
        target: raw.to_string(),
        reason: "URL has no host".to_string(),
    })?;

    let mut score = 0;
    if url.scheme() == "https" {
        score += 2;
    }
    if host.starts_with("www.") {
        score -= 1;
    }
    Ok(score)
}

/// Default domain score: a domain without a leading `www.` is the more
/// canonical representation.
pub fn domain_score(domain: &str) -> Result<i64, CoalesceError> {
    if domain.contains(':') {
        return Err(CoalesceError::NotADomain(domain.to_string()));
    }
    Ok(if domain.starts_with("www.") { 0 } else { 1 })
}
