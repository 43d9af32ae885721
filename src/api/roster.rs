//! 온라인 로스터 수집 + last_seen 병합
//!
//! 지금 접속 중이 아니어도 한 번이라도 관측된 플레이어는 크롤 후보로
//! 남습니다. 로스터 파일(name → last_seen)은 매 크롤마다 통째로 다시 씁니다.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Deserialize)]
struct OnlineResponse {
    #[serde(default)]
    users: Vec<OnlineUser>,
}

#[derive(Deserialize)]
struct OnlineUser {
    name: String,
}

/// 온라인 목록을 가져와 로스터 파일에 병합하고 전체 후보 이름을 돌려준다.
/// 실패는 크롤 시작을 막는다 (큐는 이 로스터 그 자체다).
pub async fn fetch_roster(
    http: &reqwest::Client,
    base_url: &str,
    roster_file: &Path,
) -> anyhow::Result<Vec<String>> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), super::ONLINE_PATH);
    let online: OnlineResponse = http
        .get(&url)
        .send()
        .await
        .context("online roster request failed")?
        .error_for_status()
        .context("online roster request failed")?
        .json()
        .await
        .context("could not decode online roster")?;

    let mut roster: HashMap<String, DateTime<Utc>> =
        match tokio::fs::read_to_string(roster_file).await {
            Ok(contents) => {
                serde_json::from_str(&contents).context("could not parse roster file")?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).context("could not read roster file");
            }
        };

    let online_names: Vec<String> = online.users.into_iter().map(|u| u.name).collect();
    merge_online(&mut roster, &online_names, Utc::now());

    if let Some(parent) = roster_file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("could not create roster directory")?;
    }
    tokio::fs::write(roster_file, serde_json::to_string_pretty(&roster)?)
        .await
        .context("could not write roster file")?;

    tracing::info!("{} players online, {} known", online_names.len(), roster.len());

    let mut names: Vec<String> = roster.into_keys().collect();
    names.sort();
    Ok(names)
}

/// 접속 중인 플레이어의 last_seen을 갱신한다. 오프라인 플레이어는 그대로 남는다.
fn merge_online(
    roster: &mut HashMap<String, DateTime<Utc>>,
    online: &[String],
    now: DateTime<Utc>,
) {
    for name in online {
        roster.insert(name.clone(), now);
    }
}
