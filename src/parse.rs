//! 프로필 페이로드 파싱
//!
//! 서버의 JSON envelope에서 `user` 객체를 꺼내 아이템/차량을 정규화합니다.
//! envelope 자체가 깨져 있으면 `ParseError`, 개별 항목의 결손(키 없는
//! 아이템, 모르는 차량 해시)은 파싱 실패가 아닙니다.

use serde::Deserialize;
use std::collections::HashMap;

use crate::api::catalog::VehicleCatalog;
use crate::error::ParseError;
use crate::player::{PlayerItem, PlayerVehicle};

/// 카탈로그에 없는 모델 해시의 표시 이름
pub const UNKNOWN_VEHICLE: &str = "Unknown Vehicle";

/// 타임스탬프를 제외한 파싱 결과. `last_updated`는 캐시가 upsert 시점에 찍는다.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProfile {
    pub items: HashMap<String, PlayerItem>,
    pub vehicles: Vec<PlayerVehicle>,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    user: UserData,
}

#[derive(Deserialize)]
struct UserData {
    #[serde(rename = "Inventory", default)]
    inventory: Inventory,
    #[serde(rename = "PostOfficeItems", default)]
    post_office_items: Vec<RawItem>,
    #[serde(default)]
    personal_vehicles: Vec<RawVehicle>,
}

#[derive(Deserialize, Default)]
struct Inventory {
    #[serde(rename = "Items", default)]
    items: Vec<RawItem>,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    item_key: Option<String>,
}

#[derive(Deserialize)]
struct RawVehicle {
    #[serde(rename = "ModelHash", default)]
    model_hash: i64,
}

/// 원시 페이로드 → 정규화된 프로필. 입력과 카탈로그가 같으면 결과도 같다.
pub fn parse_profile(raw: &str, vehicles: &VehicleCatalog) -> Result<ParsedProfile, ParseError> {
    let envelope: ProfileEnvelope = serde_json::from_str(raw)?;
    let user = envelope.user;

    // 본 인벤토리와 우편함을 하나의 수량 맵으로 합산
    let mut items = HashMap::new();
    add_items(&user.inventory.items, &mut items);
    add_items(&user.post_office_items, &mut items);

    let vehicles = user
        .personal_vehicles
        .iter()
        .map(|raw| PlayerVehicle {
            model_hash: raw.model_hash,
            name: vehicles
                .get(&raw.model_hash)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_VEHICLE.to_string()),
        })
        .collect();

    Ok(ParsedProfile { items, vehicles })
}

fn add_items(source: &[RawItem], items: &mut HashMap<String, PlayerItem>) {
    for raw in source {
        let Some(key) = raw.item_key.as_deref().filter(|k| !k.is_empty()) else {
            continue;
        };
        items
            .entry(key.to_string())
            .and_modify(|item| item.count += 1)
            .or_insert_with(|| PlayerItem {
                name: key.to_string(),
                count: 1,
            });
    }
}
