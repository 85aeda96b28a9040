use reqwest::Url;
use reqwest::header::CONTENT_TYPE;

use super::ensure_success;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Image,
    Pdf,
}

impl ProxyKind {
    fn accepts(self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            ProxyKind::Image => mime.starts_with("image/"),
            ProxyKind::Pdf => mime == "application/pdf",
        }
    }
}

#[derive(Debug)]
pub struct ProxiedFile {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Accepts only `https` URLs whose host is allow-listed, either exactly or
/// as a sub-domain.
pub fn validate_proxy_url(raw: &str, allowed_hosts: &[String]) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::BadRequest(format!("invalid url: {e}")))?;
    if url.scheme() != "https" {
        return Err(Error::BadRequest("only https urls can be proxied".to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| Error::BadRequest("url has no host".to_string()))?
        .to_ascii_lowercase();

    let allowed = allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    });
    if !allowed {
        return Err(Error::Forbidden);
    }
    Ok(url)
}

/// Downloads at most `max_bytes` of a file of the expected kind.
pub async fn fetch(
    http: &reqwest::Client,
    url: Url,
    kind: ProxyKind,
    max_bytes: u64,
) -> Result<ProxiedFile> {
    let response = ensure_success("proxy", http.get(url).send().await?).await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !kind.accepts(&content_type) {
        return Err(Error::Integration(format!(
            "unexpected content type: {content_type}"
        )));
    }
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(Error::Integration("file is too large".to_string()));
    }

    let mut response = response;
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(Error::Integration("file is too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(ProxiedFile { content_type, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["firebasestorage.googleapis.com".to_string(), "cdn.example.com".to_string()]
    }

    #[test]
    fn test_validate_proxy_url() {
        assert!(validate_proxy_url("https://firebasestorage.googleapis.com/v0/b/x.png", &hosts()).is_ok());
        assert!(validate_proxy_url("https://img.cdn.example.com/a.jpg", &hosts()).is_ok());

        assert!(matches!(
            validate_proxy_url("http://cdn.example.com/a.jpg", &hosts()),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            validate_proxy_url("https://evilcdn.example.com.attacker.net/a.jpg", &hosts()),
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            validate_proxy_url("https://notcdn.example.com/a.jpg", &hosts()),
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            validate_proxy_url("not a url", &hosts()),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_content_type_acceptance() {
        assert!(ProxyKind::Image.accepts("image/png"));
        assert!(ProxyKind::Pdf.accepts("application/pdf; charset=binary"));
        assert!(!ProxyKind::Pdf.accepts("text/html"));
        assert!(!ProxyKind::Image.accepts(""));
    }
}
