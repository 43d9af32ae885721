use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
}

/// 백엔드 API 접속 정보
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 백엔드 호스트 (프로필, 온라인 목록, 아이템 카탈로그)
    pub base_url: String,
    /// UCP 호스트 (차량 카탈로그)
    pub ucp_url: String,
    /// bearer 토큰이 들어 있는 파일 경로
    pub token_path: PathBuf,
}

/// 크롤 동작 파라미터. 전부 생략 가능.
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// 동시 fetch 상한
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// 사이클당 배치 크기
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 플레이어당 최대 시도 횟수
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 요청 단위 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 배치 사이 대기 (ms, 0이면 없음)
    #[serde(default)]
    pub batch_delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            batch_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 기본 저장소 파일. 역색인은 `_lookup.json` 접미사로 같은 위치에 쓴다.
    pub db_file: PathBuf,
    /// name → last_seen 로스터 파일
    pub roster_file: PathBuf,
}

fn default_max_workers() -> usize {
    20
}

fn default_batch_size() -> usize {
    20
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}
