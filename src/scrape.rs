//! 크롤 코디네이터
//!
//! 작업 큐와 재시도 큐를 소유하고, 배치 단위로 동시 fetch를 돌리며, 성공한
//! 페이로드를 파서 → 캐시로 넘깁니다. 플레이어 하나의 실패는 배치도
//! 크롤도 중단시키지 않습니다. 실패한 플레이어는 소속 배치가 전부 끝난
//! 뒤에야 재시도 자격을 얻습니다. 사이클 장벽이 곧 백오프인 셈입니다.

use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::catalog::VehicleCatalog;
use crate::api::client::ProfileFetcher;
use crate::cache::PlayerCache;
use crate::config::ScraperConfig;
use crate::error::PlayerError;
use crate::parse;

/// 크롤 1회의 최종 결과
#[derive(Debug, PartialEq, Eq)]
pub struct ScrapeSummary {
    /// 성공적으로 병합된 플레이어 수
    pub processed: usize,
    /// 재시도 예산을 소진했거나 페이로드가 깨져 있던 플레이어
    pub failed: Vec<String>,
}

/// 큐 상태. 플레이어는 언제나 {작업 대기, in flight, 재시도 대기, 완료,
/// 최종 실패} 중 정확히 한 곳에만 있다.
struct ScrapeQueues {
    work: VecDeque<String>,
    retry: VecDeque<String>,
    attempts: HashMap<String, u32>,
    processed: HashSet<String>,
    failed: Vec<String>,
}

impl ScrapeQueues {
    fn new(roster: Vec<String>) -> Self {
        let attempts = roster.iter().map(|name| (name.clone(), 0)).collect();
        Self {
            work: roster.into(),
            retry: VecDeque::new(),
            attempts,
            processed: HashSet::new(),
            failed: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.work.is_empty() && self.retry.is_empty()
    }

    /// 재시도 큐를 먼저 비우고 나서 작업 큐에서 채운다. 재시도가 큰 첫
    /// 패스 뒤로 밀려 굶지 않게 하기 위함이다.
    fn next_batch(&mut self, batch_size: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match self.retry.pop_front().or_else(|| self.work.pop_front()) {
                Some(name) => batch.push(name),
                None => break,
            }
        }
        batch
    }

    fn mark_processed(&mut self, name: String) {
        self.processed.insert(name);
    }

    /// 시도 횟수를 올리고, 예산이 남았으면 재시도 큐로, 아니면 최종 실패로.
    fn record_failure(&mut self, name: String, max_retries: u32) {
        let attempts = self.attempts.entry(name.clone()).or_insert(0);
        *attempts += 1;
        if *attempts < max_retries {
            self.retry.push_back(name);
        } else {
            self.failed.push(name);
        }
    }

    /// 재시도 없이 바로 최종 실패 (깨진 페이로드)
    fn mark_failed(&mut self, name: String) {
        self.failed.push(name);
    }
}

pub struct Scraper<F> {
    fetcher: F,
    cache: Arc<PlayerCache>,
    vehicles: VehicleCatalog,
    max_workers: usize,
    batch_size: usize,
    max_retries: u32,
    batch_delay: Duration,
}

impl<F: ProfileFetcher> Scraper<F> {
    pub fn new(
        fetcher: F,
        cache: Arc<PlayerCache>,
        vehicles: VehicleCatalog,
        config: &ScraperConfig,
    ) -> Self {
        Self {
            fetcher,
            cache,
            vehicles,
            max_workers: config.max_workers,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// 로스터 전체를 긁는다. 두 큐가 다 빌 때까지 돌고, 끝나면 캐시를 한 번
    /// 저장한다. 플레이어당 시도는 `max_retries`로 유한하므로 루프도 유한하다.
    pub async fn scrape_all(&self, roster: Vec<String>) -> anyhow::Result<ScrapeSummary> {
        if roster.is_empty() {
            tracing::info!("roster is empty, nothing to scrape");
            return Ok(ScrapeSummary {
                processed: 0,
                failed: Vec::new(),
            });
        }

        let total = roster.len();
        tracing::info!("starting scrape of {} players", total);
        let started = Instant::now();

        let mut queues = ScrapeQueues::new(roster);

        while !queues.is_empty() {
            let batch = queues.next_batch(self.batch_size);

            // 배치 안에서만 동시성을 푼다. 느린 하나가 배치를 늘릴 뿐,
            // 버려지는 fetch는 없다.
            let results: Vec<(String, Result<(), PlayerError>)> = stream::iter(batch)
                .map(|name| async move {
                    let outcome = self.process_player(&name).await;
                    (name, outcome)
                })
                .buffer_unordered(self.max_workers)
                .collect()
                .await;

            // 실패 재큐잉은 배치가 전부 끝난 뒤에만 일어난다
            for (name, outcome) in results {
                match outcome {
                    Ok(()) => queues.mark_processed(name),
                    Err(e) if e.is_retryable() => {
                        tracing::warn!("failed to process {}: {}", name, e);
                        queues.record_failure(name, self.max_retries);
                    }
                    Err(e) => {
                        tracing::warn!("dropping {}: {}", name, e);
                        queues.mark_failed(name);
                    }
                }
            }

            if !queues.is_empty() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let summary = ScrapeSummary {
            processed: queues.processed.len(),
            failed: queues.failed,
        };
        self.log_results(total, &summary, started.elapsed());

        self.cache.save().await?;
        Ok(summary)
    }

    /// 플레이어 한 명: fetch → parse → upsert, 이 순서는 엄격히 직렬이다.
    async fn process_player(&self, name: &str) -> Result<(), PlayerError> {
        let raw = self.fetcher.fetch_profile(name).await?;
        let profile = parse::parse_profile(&raw, &self.vehicles)?;
        self.cache.upsert_player(name, profile).await;
        Ok(())
    }

    fn log_results(&self, total: usize, summary: &ScrapeSummary, elapsed: Duration) {
        let success_rate = summary.processed as f64 / total as f64 * 100.0;
        tracing::info!(
            "scrape complete: {}/{} players processed ({:.1}%) in {:.2}s",
            summary.processed,
            total,
            success_rate,
            elapsed.as_secs_f64()
        );
        if !summary.failed.is_empty() {
            tracing::warn!("failed players: {}", summary.failed.join(", "));
        }
    }
}
