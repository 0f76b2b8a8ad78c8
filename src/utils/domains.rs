/// Strips a single leading `www.` label, if present.
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Checks whether `candidate` looks like a bare domain: non-empty dot-separated
/// labels of alphanumerics, hyphens and underscores, with no scheme, path or
/// port separator. A bare IPv4 address passes this test, which matches how
/// scan targets are written.
pub fn is_domain(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.len() > 253 {
        return false;
    }
    candidate.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Checks whether `candidate` is a subdomain of `parent`, comparing
/// dot-separated labels from the right. `allow_equal` controls whether a
/// domain counts as a subdomain of itself.
pub fn is_subdomain(candidate: &str, parent: &str, allow_equal: bool) -> bool {
    let candidate_labels: Vec<&str> = candidate.split('.').filter(|l| !l.is_empty()).collect();
    let parent_labels: Vec<&str> = parent.split('.').filter(|l| !l.is_empty()).collect();

    if parent_labels.is_empty() || candidate_labels.len() < parent_labels.len() {
        return false;
    }
    if !allow_equal && candidate_labels.len() == parent_labels.len() {
        return false;
    }
    candidate_labels[candidate_labels.len() - parent_labels.len()..] == parent_labels[..]
}
