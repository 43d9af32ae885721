use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 인벤토리 아이템 (키 단위로 집계)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerItem {
    /// 내부 아이템 키
    pub name: String,
    /// 보유 수량
    pub count: u32,
}

/// 보유 차량
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerVehicle {
    /// 게임 내 모델 해시
    pub model_hash: i64,
    /// 카탈로그로 해석한 표시 이름. 카탈로그에 없으면 "Unknown Vehicle".
    pub name: String,
}

/// 플레이어 1명의 정규화된 스냅샷.
///
/// 업데이트는 항상 레코드 전체를 통째로 교체한다. 필드 단위로 병합하지
/// 않으므로 레코드는 언제나 단일 크롤 스냅샷과 일치한다.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerRecord {
    /// 아이템 키 → 집계 항목
    pub items: HashMap<String, PlayerItem>,
    /// 보유 차량 목록 (페이로드 순서 유지)
    pub vehicles: Vec<PlayerVehicle>,
    /// 마지막으로 성공적으로 병합된 시각
    pub last_updated: DateTime<Utc>,
}
