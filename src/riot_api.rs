use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::http_client::http_client;
use crate::model::MatchReference;

const RIOT_TOKEN_HEADER: &str = "X-Riot-Token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
        body: String,
    },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// Transport failures, rate limiting and server errors are worth retrying;
    /// other client errors (bad token, unknown summoner) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Decode(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Request(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// The three remote calls the fetcher needs. Implemented by the live client,
/// the offline fake, and test stubs.
pub trait MatchApi {
    fn account_id(&self, region: &str, summoner_name: &str) -> Result<String, ApiError>;

    /// One page of the account's match list, `[begin_index, end_index)`.
    /// An empty vector means there are no more matches.
    fn match_list(
        &self,
        region: &str,
        account_id: &str,
        queues: &[u32],
        begin_index: u32,
        end_index: u32,
    ) -> Result<Vec<MatchReference>, ApiError>;

    fn match_by_id(&self, region: &str, game_id: u64) -> Result<Value, ApiError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummonerDto {
    account_id: String,
}

#[derive(Debug, Deserialize)]
struct MatchListDto {
    #[serde(default)]
    matches: Vec<MatchReference>,
}

#[derive(Clone)]
pub struct RiotApiClient {
    client: Client,
    api_key: String,
    base_url: Option<String>,
}

impl RiotApiClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?.clone(),
            api_key,
            base_url: None,
        })
    }

    /// Sends every request to `base_url` instead of the regional host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn endpoint(&self, region: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{region}.api.riotgames.com"),
        };
        let mut url = Url::parse(&base).map_err(|err| ApiError::Request(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Request(format!("base url {base} cannot hold a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<Response, ApiError> {
        log::debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .header(RIOT_TOKEN_HEADER, &self.api_key)
            .send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = resp.text().unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            retry_after,
            body,
        })
    }
}

impl MatchApi for RiotApiClient {
    fn account_id(&self, region: &str, summoner_name: &str) -> Result<String, ApiError> {
        let url = self.endpoint(
            region,
            &["lol", "summoner", "v4", "summoners", "by-name", summoner_name],
        )?;
        let dto: SummonerDto = self.get(url)?.json()?;
        Ok(dto.account_id)
    }

    fn match_list(
        &self,
        region: &str,
        account_id: &str,
        queues: &[u32],
        begin_index: u32,
        end_index: u32,
    ) -> Result<Vec<MatchReference>, ApiError> {
        let mut url = self.endpoint(
            region,
            &["lol", "match", "v4", "matchlists", "by-account", account_id],
        )?;
        {
            let mut query = url.query_pairs_mut();
            for queue in queues {
                query.append_pair("queue", &queue.to_string());
            }
            query.append_pair("beginIndex", &begin_index.to_string());
            query.append_pair("endIndex", &end_index.to_string());
        }
        match self.get(url) {
            Ok(resp) => {
                let dto: MatchListDto = resp.json()?;
                Ok(dto.matches)
            }
            // v4 answers 404 once the index runs past the last match.
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn match_by_id(&self, region: &str, game_id: u64) -> Result<Value, ApiError> {
        let id = game_id.to_string();
        let url = self.endpoint(region, &["lol", "match", "v4", "matches", &id])?;
        let resp = self.get(url)?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Err(ApiError::Decode(format!("empty body for match {game_id}")));
        }
        Ok(resp.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RiotApiClient {
        RiotApiClient {
            client: Client::builder().no_proxy().build().unwrap(),
            api_key: "test".to_string(),
            base_url: None,
        }
    }

    #[test]
    fn endpoint_uses_regional_host_and_encodes_names() {
        let url = client()
            .endpoint("na1", &["lol", "summoner", "v4", "summoners", "by-name", "F1rst Blood"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://na1.api.riotgames.com/lol/summoner/v4/summoners/by-name/F1rst%20Blood"
        );
    }

    #[test]
    fn endpoint_respects_base_url_override() {
        let url = client()
            .with_base_url("http://127.0.0.1:8080")
            .endpoint("euw1", &["lol", "match", "v4", "matches", "7"])
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/lol/match/v4/matches/7");
    }

    #[test]
    fn retryability_follows_status_class() {
        let status = |status| ApiError::Status {
            status,
            retry_after: None,
            body: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(502).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(ApiError::Transport("timeout".to_string()).is_retryable());
    }

    /// Answers one request with `response` and hands back the request head.
    fn serve_once(response: &'static str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&head).to_string()
        });
        (base_url, handle)
    }

    #[test]
    fn match_list_not_found_is_an_empty_page() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        let page = client()
            .with_base_url(base_url)
            .match_list("na1", "acc-1", &[420], 3, 4)
            .unwrap();
        assert!(page.is_empty());

        let head = server.join().unwrap();
        assert!(
            head.starts_with(
                "GET /lol/match/v4/matchlists/by-account/acc-1?queue=420&beginIndex=3&endIndex=4 "
            ),
            "{head}"
        );
        assert!(head.to_ascii_lowercase().contains("x-riot-token: test"), "{head}");
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 3\r\nContent-Length: 4\r\nConnection: close\r\n\r\nslow",
        );
        let err = client()
            .with_base_url(base_url)
            .match_by_id("na1", 7)
            .unwrap_err();
        server.join().unwrap();
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert!(matches!(err, ApiError::Status { status: 429, ref body, .. } if body == "slow"));
    }
}

