//! 차량/아이템 레퍼런스 카탈로그
//!
//! 크롤 시작 시 1회 로드되는 불변 스냅샷. 둘 중 하나라도 실패하면 이름을
//! 해석할 수 없으므로 크롤은 큐에 아무것도 넣지 않고 중단된다.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;

/// 모델 해시 → 표시 이름
pub type VehicleCatalog = HashMap<i64, String>;
/// 표시 이름 → 내부 아이템 키
pub type ItemCatalog = HashMap<String, String>;

#[derive(Deserialize)]
struct VehicleEntry {
    #[serde(rename = "DisplayName")]
    display_name: String,
}

#[derive(Deserialize)]
struct ItemEntry {
    name: String,
}

pub async fn get_vehicle_catalog(
    http: &reqwest::Client,
    ucp_url: &str,
) -> anyhow::Result<VehicleCatalog> {
    let url = format!("{}{}", ucp_url.trim_end_matches('/'), super::VEHICLE_DATA_PATH);
    let raw: HashMap<String, VehicleEntry> = http
        .get(&url)
        .send()
        .await
        .context("vehicle catalog request failed")?
        .error_for_status()
        .context("vehicle catalog request failed")?
        .json()
        .await
        .context("could not decode vehicle catalog")?;

    // JSON 키는 해시의 10진수 문자열
    let mut catalog = VehicleCatalog::with_capacity(raw.len());
    for (hash, entry) in raw {
        let hash = hash
            .parse::<i64>()
            .with_context(|| format!("invalid vehicle model hash {hash:?}"))?;
        catalog.insert(hash, entry.display_name);
    }

    tracing::info!("loaded {} vehicles", catalog.len());
    Ok(catalog)
}

pub async fn get_item_catalog(
    http: &reqwest::Client,
    base_url: &str,
) -> anyhow::Result<ItemCatalog> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), super::INVENTORY_PATH);
    let raw: HashMap<String, ItemEntry> = http
        .get(&url)
        .send()
        .await
        .context("item catalog request failed")?
        .error_for_status()
        .context("item catalog request failed")?
        .json()
        .await
        .context("could not decode item catalog")?;

    // 조회는 표시 이름으로 들어오므로 이름 → 키로 뒤집는다
    let catalog: ItemCatalog = raw
        .into_iter()
        .map(|(key, entry)| (entry.name, key))
        .collect();

    tracing::info!("loaded {} inventory items", catalog.len());
    Ok(catalog)
}
