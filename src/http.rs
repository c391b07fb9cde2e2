use encoding_rs::Encoding;
use reqwest::{Client, Response, StatusCode};

use crate::error::{Result, ScrapeError};

/// Sends a GET. Only transport failures are errors here; the status is left
/// to the caller.
pub async fn get(client: &Client, url: &str) -> Result<Response> {
    client
        .get(url)
        .send()
        .await
        .map_err(|source| ScrapeError::Connectivity {
            url: url.to_string(),
            source,
        })
}

/// One-shot GET that must answer 200.
pub async fn get_ok(client: &Client, url: &str) -> Result<Response> {
    let response = get(client, url).await?;

    if response.status() != StatusCode::OK {
        return Err(ScrapeError::HttpStatus {
            status: response.status(),
            url: url.to_string(),
        });
    }

    Ok(response)
}

pub async fn read_bytes(response: Response) -> Result<Vec<u8>> {
    let url = response.url().to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ScrapeError::Connectivity { url, source })?;

    Ok(bytes.to_vec())
}

pub async fn read_text(response: Response, encoding: &'static Encoding) -> Result<String> {
    let bytes = read_bytes(response).await?;
    Ok(decode(&bytes, encoding))
}

pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
