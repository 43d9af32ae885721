//! 프로필 조회 클라이언트
//!
//! 플레이어 1명당 인증된 GET 1회. 타임아웃은 `reqwest::Client` 빌더에 걸려
//! 있어 동시성 래핑과 무관하게 모든 요청에 적용됩니다.

use anyhow::Context;
use std::path::Path;
use std::time::Duration;

use crate::error::FetchError;

/// 플레이어 프로필 하나를 가져오는 능력.
///
/// 코디네이터는 이 계약만 사용한다. HTTP 직접 호출이든 브라우저 세션
/// 가로채기든, 구현은 타임아웃 안에 페이로드 또는 분류된 실패로 끝나야 한다.
pub trait ProfileFetcher {
    async fn fetch_profile(&self, player: &str) -> Result<String, FetchError>;
}

/// 직접 HTTP 구현
pub struct ProfileClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl ProfileClient {
    pub fn new(
        base_url: &str,
        bearer_token: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("could not create http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }

    fn profile_url(&self, player: &str) -> String {
        format!("{}{}/{}", self.base_url, super::PROFILE_PATH, player)
    }
}

impl ProfileFetcher for ProfileClient {
    async fn fetch_profile(&self, player: &str) -> Result<String, FetchError> {
        let response = self
            .http
            .get(self.profile_url(player))
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

/// 토큰 파일에서 bearer 토큰을 읽는다 (양끝 공백 제거).
pub async fn load_token(path: impl AsRef<Path>) -> anyhow::Result<String> {
    let token = tokio::fs::read_to_string(path.as_ref())
        .await
        .with_context(|| format!("could not read token file {}", path.as_ref().display()))?;
    Ok(token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_handles_trailing_slash() {
        let client = ProfileClient::new(
            "https://backend.example.com/",
            "token".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            client.profile_url("Alice"),
            "https://backend.example.com/user/profile/Alice"
        );
    }

    #[tokio::test]
    async fn load_token_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  secret-token\n").unwrap();

        assert_eq!(load_token(&path).await.unwrap(), "secret-token");
    }
}
