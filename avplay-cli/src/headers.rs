//! One-shot HEAD request printing the stream's response headers

use std::thread::{self, JoinHandle};
use std::time::Duration;

use reqwest::header::HeaderMap;
use url::Url;

/// Header name/value pairs whose value is valid visible text
pub fn text_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn fetch_headers(url: &Url, timeout: Duration) -> reqwest::Result<Vec<(String, String)>> {
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let response = client.head(url.clone()).send()?;
    Ok(text_headers(response.headers()))
}

/// Fire the HEAD request on a background thread
///
/// Failures are logged and otherwise ignored; playback does not wait on it.
pub fn spawn_head_request(url: Url, timeout: Duration) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("avplay-head".to_string())
        .spawn(move || match fetch_headers(&url, timeout) {
            Ok(headers) => {
                println!("Headers for {}", url);
                for (name, value) in headers {
                    println!("Header {}: {}", name, value);
                }
            }
            Err(e) => tracing::warn!("HEAD request for {} failed: {}", url, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    #[test]
    fn test_text_headers_skip_opaque_values() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
        headers.insert("icy-name", HeaderValue::from_bytes(b"Radio \xff").unwrap());
        headers.insert("icy-br", HeaderValue::from_static("128"));

        let mut pairs = text_headers(&headers);
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("content-type".to_string(), "audio/mpeg".to_string()),
                ("icy-br".to_string(), "128".to_string()),
            ]
        );
    }
}
