use reqwest::StatusCode;
use thiserror::Error;

/// 프로필 요청 실패 분류. 전부 일시적 실패로 보고 재시도 대상이 된다.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Connect(value.to_string())
        }
    }
}

/// 구조적으로 깨진 페이로드. 재시도해도 나아지지 않는다.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed profile payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// 크롤 중 플레이어 한 명이 실패한 이유. 재시도 정책은 이 분류로 갈린다.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PlayerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlayerError::Fetch(_))
    }
}
