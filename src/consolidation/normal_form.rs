use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CoalesceError;
use crate::utils::domains::strip_www;

/// The canonical equivalence key of a finding: an ordered list of key/value
/// pairs. Findings sharing a normal form describe the same real-world issue
/// and compete for a single surviving representative.
///
/// Generated so that equivalent representations collide - e.g. an exposed
/// http://example.com/wp-config.php.bak and
/// https://www.example.com/wp-config.php.bak get the same normal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalForm(Vec<(String, String)>);

impl NormalForm {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        pairs.sort();
        NormalForm(pairs)
    }

    /// Stable textual encoding, used as the key of external
    /// already-reported stores.
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl std::fmt::Display for NormalForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Standard port for a scheme, the moral equivalent of getservbyname. Kept as
/// a fixed table so normalization never depends on the host's services
/// database.
pub fn default_port(scheme: &str) -> Option<u16> {
    let port = match scheme {
        "ftp" => 21,
        "ssh" | "sftp" => 22,
        "telnet" => 23,
        "smtp" => 25,
        "dns" => 53,
        "http" | "ws" => 80,
        "pop3" => 110,
        "imap" => 143,
        "ldap" => 389,
        "https" | "wss" => 443,
        "smtps" => 465,
        "rtsp" => 554,
        "ldaps" => 636,
        "imaps" => 993,
        "pop3s" => 995,
        "mysql" => 3306,
        "rdp" => 3389,
        "postgres" | "postgresql" => 5432,
        "redis" => 6379,
        "mongodb" => 27017,
        _ => return None,
    };
    Some(port)
}

/// Normalizes a URL.
///
/// The port is resolved (explicit, else the scheme's standard default) and a
/// single leading `www.` is stripped from the host. If the scheme is
/// http/https and the port is one of the configured common HTTP ports, the
/// scheme is rewritten to the sentinel `http_or_https` and the port zeroed,
/// so that http://service.com:80/ and https://service.com/ coincide.
///
/// Requires an absolute URL with a host; anything else is a usage error.
pub fn url_normal_form(raw: &str, common_http_ports: &[u16]) -> Result<String, CoalesceError> {
    let url = Url::parse(raw).map_err(|e| CoalesceError::MalformedTarget {
        target: raw.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| CoalesceError::MalformedTarget {
        target: raw.to_string(),
        reason: "URL has no host".to_string(),
    })?;

    let host = strip_www(host);
    let scheme = url.scheme();
    let port = url.port().or_else(|| default_port(scheme)).unwrap_or(0);

    let (scheme, port) = if (scheme == "http" || scheme == "https") && common_http_ports.contains(&port)
    {
        ("http_or_https", 0)
    } else {
        (scheme, port)
    };

    let mut normalized = format!("{}://{}:{}{}", scheme, host, port, url.path());
    if let Some(query) = url.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        normalized.push('#');
        normalized.push_str(fragment);
    }
    Ok(normalized)
}

/// Normalizes a bare domain by stripping a single leading `www.`.
///
/// A port separator in the input means the caller mixed up a domain with a
/// host:port pair - that is a contract violation, not something to coerce.
pub fn domain_normal_form(domain: &str) -> Result<String, CoalesceError> {
    if domain.contains(':') {
        return Err(CoalesceError::NotADomain(domain.to_string()));
    }
    Ok(strip_www(domain).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMON_HTTP_PORTS: &[u16] = &[80, 443];

    #[test]
    fn test_port_scheme_coalescing() {
        assert_eq!(
            url_normal_form("http://host:80/x", COMMON_HTTP_PORTS).unwrap(),
            url_normal_form("https://host/x", COMMON_HTTP_PORTS).unwrap(),
        );
        assert_eq!(
            url_normal_form("http://host/x", COMMON_HTTP_PORTS).unwrap(),
            "http_or_https://host:0/x",
        );
    }

    #[test]
    fn test_www_stripping() {
        assert_eq!(
            url_normal_form("https://www.host/x", COMMON_HTTP_PORTS).unwrap(),
            url_normal_form("https://host/x", COMMON_HTTP_PORTS).unwrap(),
        );
    }

    #[test]
    fn test_uncommon_port_kept_explicit() {
        assert_eq!(
            url_normal_form("https://host:8443/x", COMMON_HTTP_PORTS).unwrap(),
            "https://host:8443/x",
        );
        assert_ne!(
            url_normal_form("http://host:8080/x", COMMON_HTTP_PORTS).unwrap(),
            url_normal_form("https://host:8080/x", COMMON_HTTP_PORTS).unwrap(),
        );
    }

    #[test]
    fn test_non_http_scheme_gets_default_port() {
        assert_eq!(
            url_normal_form("ftp://host/x", COMMON_HTTP_PORTS).unwrap(),
            "ftp://host:21/x",
        );
        assert_eq!(
            url_normal_form("ftp://host:21/x", COMMON_HTTP_PORTS).unwrap(),
            "ftp://host:21/x",
        );
    }

    #[test]
    fn test_query_preserved() {
        assert_eq!(
            url_normal_form("http://host/x?a=1", COMMON_HTTP_PORTS).unwrap(),
            "http_or_https://host:0/x?a=1",
        );
    }

    #[test]
    fn test_repeated_normalization_of_same_input_is_identical() {
        let input = "https://www.host:8443/x?a=1#frag";
        assert_eq!(
            url_normal_form(input, COMMON_HTTP_PORTS).unwrap(),
            url_normal_form(input, COMMON_HTTP_PORTS).unwrap(),
        );
    }

    #[test]
    fn test_malformed_url_fails_loudly() {
        assert!(url_normal_form("example.com", COMMON_HTTP_PORTS).is_err());
        assert!(url_normal_form("mailto:user@host", COMMON_HTTP_PORTS).is_err());
    }

    #[test]
    fn test_domain_normal_form() {
        assert_eq!(domain_normal_form("www.example.com").unwrap(), "example.com");
        assert_eq!(domain_normal_form("example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_domain_with_port_separator_fails() {
        assert!(matches!(
            domain_normal_form("example.com:443"),
            Err(CoalesceError::NotADomain(_))
        ));
    }

    #[test]
    fn test_normal_form_key_is_order_independent() {
        let a = NormalForm::new([("kind", "x"), ("target", "y")]);
        let b = NormalForm::new([("target", "y"), ("kind", "x")]);
        assert_eq!(a, b);
        assert_eq!(a.key(), "kind=x;target=y");
    }
}
