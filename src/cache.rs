//! 플레이어 캐시
//!
//! 기본 저장소(이름 → 레코드)와 역색인(아이템/차량 키 → 보유자)을 하나의
//! 락 아래에서 함께 관리합니다. 역색인은 기본 저장소에서 전부 유도 가능한
//! 파생 구조로, O(플레이어) 스캔 없이 역조회를 하기 위해서만 존재합니다.
//! 저장은 두 개의 JSON 파일(기본 저장소, 역색인)을 통째로 다시 씁니다.

use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::api::catalog::ItemCatalog;
use crate::parse::ParsedProfile;
use crate::player::PlayerRecord;

/// 차량 키는 아이템 키와 충돌하지 않도록 접두사로 네임스페이스를 나눈다
fn vehicle_key(name: &str) -> String {
    format!("vehicle:{name}")
}

#[derive(Default)]
struct CacheInner {
    /// 기본 저장소: 플레이어 이름 → 레코드
    players: HashMap<String, PlayerRecord>,
    /// 역색인: 아이템 키 또는 "vehicle:이름" → (플레이어 → 수량)
    lookup: HashMap<String, HashMap<String, u32>>,
    /// 이번 크롤의 아이템 카탈로그 스냅샷 (표시 이름 → 키)
    item_catalog: ItemCatalog,
}

pub struct PlayerCache {
    db_file: PathBuf,
    inner: RwLock<CacheInner>,
}

impl PlayerCache {
    pub fn new(db_file: impl Into<PathBuf>) -> Self {
        Self {
            db_file: db_file.into(),
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// 역색인 파일 경로: `players_db.json` → `players_db_lookup.json`
    fn lookup_file(&self) -> PathBuf {
        match self.db_file.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => self.db_file.with_file_name(format!("{stem}_lookup.json")),
            None => self.db_file.with_extension("lookup.json"),
        }
    }

    /// 파일에서 기본 저장소를 읽고 역색인을 재구축한다.
    ///
    /// 파일이 없으면 빈 캐시로 시작한다. 손상된 파일은 로그만 남기고 빈
    /// 캐시로 계속 간다. 크롤을 멈추는 것보다 데이터를 다시 긁는 쪽이 낫다.
    pub async fn load(&self) {
        let contents = match tokio::fs::read_to_string(&self.db_file).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::error!("error reading cache file {}: {}", self.db_file.display(), e);
                return;
            }
        };

        let players: HashMap<String, PlayerRecord> = match serde_json::from_str(&contents) {
            Ok(players) => players,
            Err(e) => {
                tracing::error!("error loading cache, starting empty: {}", e);
                return;
            }
        };

        let mut inner = self.inner.write().await;
        inner.players = players;
        rebuild_lookup(&mut inner);
        tracing::info!("loaded {} players from cache", inner.players.len());
    }

    /// 두 JSON 파일을 통째로 다시 쓴다. 배치가 아니라 크롤 1회가 내구성
    /// 경계이므로, 호출은 크롤 끝에 한 번이다.
    pub async fn save(&self) -> anyhow::Result<()> {
        let (players_json, lookup_json) = {
            let inner = self.inner.read().await;
            let players = serde_json::to_string_pretty(&inner.players)?;

            // 역색인 파일은 사람이 읽는 용도: 키 → 보유자 이름 목록(정렬)
            let mut lookup: HashMap<&String, Vec<&String>> =
                HashMap::with_capacity(inner.lookup.len());
            for (key, owners) in &inner.lookup {
                let mut names: Vec<&String> = owners.keys().collect();
                names.sort();
                lookup.insert(key, names);
            }
            (players, serde_json::to_string_pretty(&lookup)?)
        };

        if let Some(parent) = self.db_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("could not create cache directory")?;
            }
        }
        tokio::fs::write(&self.db_file, players_json)
            .await
            .with_context(|| format!("could not write {}", self.db_file.display()))?;
        tokio::fs::write(self.lookup_file(), lookup_json)
            .await
            .with_context(|| format!("could not write {}", self.lookup_file().display()))?;

        tracing::info!("cache saved");
        Ok(())
    }

    /// 이번 크롤의 카탈로그 스냅샷 교체. 크롤 도중에는 불변.
    pub async fn set_item_catalog(&self, catalog: ItemCatalog) {
        self.inner.write().await.item_catalog = catalog;
    }

    /// 레코드를 원자적으로 교체하고 역색인을 함께 갱신한다.
    ///
    /// 순서가 중요하다: 이 플레이어의 옛 기여를 모든 키에서 먼저 제거한 뒤
    /// 새 기여를 넣는다. 빼먹으면 stale 역조회 항목이 쌓인다. 전 과정이 한
    /// 쓰기 락 안이므로 동시 읽기는 절반만 갱신된 상태를 보지 못한다.
    pub async fn upsert_player(&self, name: &str, profile: ParsedProfile) {
        let mut guard = self.inner.write().await;
        let CacheInner { players, lookup, .. } = &mut *guard;

        if let Some(old) = players.get(name) {
            for item_key in old.items.keys() {
                remove_owner(lookup, item_key, name);
            }
            for vehicle in &old.vehicles {
                remove_owner(lookup, &vehicle_key(&vehicle.name), name);
            }
        }

        let record = PlayerRecord {
            items: profile.items,
            vehicles: profile.vehicles,
            last_updated: Utc::now(),
        };

        for (item_key, item) in &record.items {
            lookup
                .entry(item_key.clone())
                .or_default()
                .insert(name.to_string(), item.count);
        }
        for vehicle in &record.vehicles {
            lookup
                .entry(vehicle_key(&vehicle.name))
                .or_default()
                .insert(name.to_string(), 1);
        }

        players.insert(name.to_string(), record);
        tracing::debug!("updated player {name}");
    }

    pub async fn get_player(&self, name: &str) -> Option<PlayerRecord> {
        self.inner.read().await.players.get(name).cloned()
    }

    /// 표시 이름으로 아이템 보유자 → 수량을 돌려준다. 모르는 이름이면 빈 맵.
    pub async fn find_players_with_item(&self, item_name: &str) -> HashMap<String, u32> {
        let inner = self.inner.read().await;
        let Some(item_key) = inner.item_catalog.get(item_name) else {
            return HashMap::new();
        };
        inner.lookup.get(item_key).cloned().unwrap_or_default()
    }

    /// 차량 보유자 목록. 수량은 항상 1이므로 이름만, 정렬해서 돌려준다.
    pub async fn find_players_with_vehicle(&self, vehicle_name: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut names: Vec<String> = inner
            .lookup
            .get(&vehicle_key(vehicle_name))
            .map(|owners| owners.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

fn remove_owner(lookup: &mut HashMap<String, HashMap<String, u32>>, key: &str, player: &str) {
    let now_empty = match lookup.get_mut(key) {
        Some(owners) => {
            owners.remove(player);
            owners.is_empty()
        }
        None => false,
    };
    if now_empty {
        lookup.remove(key);
    }
}

fn rebuild_lookup(inner: &mut CacheInner) {
    let CacheInner { players, lookup, .. } = inner;
    lookup.clear();
    for (player, record) in players.iter() {
        for (item_key, item) in &record.items {
            lookup
                .entry(item_key.clone())
                .or_default()
                .insert(player.clone(), item.count);
        }
        for vehicle in &record.vehicles {
            lookup
                .entry(vehicle_key(&vehicle.name))
                .or_default()
                .insert(player.clone(), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::UNKNOWN_VEHICLE;
    use crate::player::{PlayerItem, PlayerVehicle};
    use std::sync::Arc;

    fn profile(items: &[(&str, u32)], vehicles: &[(i64, &str)]) -> ParsedProfile {
        ParsedProfile {
            items: items
                .iter()
                .map(|(key, count)| {
                    (
                        key.to_string(),
                        PlayerItem {
                            name: key.to_string(),
                            count: *count,
                        },
                    )
                })
                .collect(),
            vehicles: vehicles
                .iter()
                .map(|(hash, name)| PlayerVehicle {
                    model_hash: *hash,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    fn pistol_catalog() -> ItemCatalog {
        ItemCatalog::from([("Pistol".to_string(), "pistol".to_string())])
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let cache = PlayerCache::new("unused.json");
        cache
            .upsert_player("Alice", profile(&[("pistol", 3)], &[(1337, "Banshee")]))
            .await;

        let record = cache.get_player("Alice").await.expect("record");
        assert_eq!(record.items["pistol"].count, 3);
        assert_eq!(record.vehicles[0].model_hash, 1337);
        assert_eq!(record.vehicles[0].name, "Banshee");
        assert!(cache.get_player("Bob").await.is_none());
    }

    #[tokio::test]
    async fn lookup_resolves_display_names_via_catalog() {
        let cache = PlayerCache::new("unused.json");
        cache.set_item_catalog(pistol_catalog()).await;
        cache
            .upsert_player("Alice", profile(&[("pistol", 3)], &[]))
            .await;

        let owners = cache.find_players_with_item("Pistol").await;
        assert_eq!(owners, HashMap::from([("Alice".to_string(), 3)]));
        // 카탈로그에 없는 표시 이름은 에러가 아니라 빈 결과
        assert!(cache.find_players_with_item("Not An Item").await.is_empty());
    }

    #[tokio::test]
    async fn reupsert_removes_stale_index_entries() {
        let cache = PlayerCache::new("unused.json");
        cache.set_item_catalog(pistol_catalog()).await;
        cache
            .upsert_player("Alice", profile(&[("pistol", 2)], &[(1, "Banshee")]))
            .await;
        cache
            .upsert_player("Alice", profile(&[("smg", 1)], &[(2, "Kuruma")]))
            .await;

        assert!(cache.find_players_with_item("Pistol").await.is_empty());
        assert!(cache.find_players_with_vehicle("Banshee").await.is_empty());
        assert_eq!(
            cache.find_players_with_vehicle("Kuruma").await,
            vec!["Alice".to_string()]
        );

        let record = cache.get_player("Alice").await.unwrap();
        assert!(!record.items.contains_key("pistol"));
        assert_eq!(record.items["smg"].count, 1);
    }

    #[tokio::test]
    async fn vehicle_and_item_namespaces_do_not_collide() {
        let cache = PlayerCache::new("unused.json");
        cache
            .set_item_catalog(ItemCatalog::from([(
                "Banshee".to_string(),
                "banshee_item".to_string(),
            )]))
            .await;
        // "Banshee"라는 아이템과 "Banshee"라는 차량을 동시에 보유
        cache
            .upsert_player("Alice", profile(&[("banshee_item", 1)], &[(1, "Banshee")]))
            .await;
        cache
            .upsert_player("Bob", profile(&[("banshee_item", 2)], &[]))
            .await;

        assert_eq!(
            cache.find_players_with_vehicle("Banshee").await,
            vec!["Alice".to_string()]
        );
        assert_eq!(cache.find_players_with_item("Banshee").await.len(), 2);
    }

    #[tokio::test]
    async fn index_matches_primary_after_concurrent_upserts() {
        let cache = Arc::new(PlayerCache::new("unused.json"));
        cache.set_item_catalog(pistol_catalog()).await;

        // 같은 4명을 두고 16개의 upsert가 경쟁한다
        let mut handles = Vec::new();
        for i in 0u32..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let name = format!("Player{}", i % 4);
                cache
                    .upsert_player(&name, profile(&[("pistol", i + 1)], &[(9, "Kuruma")]))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 어떤 순서로 끝났든 역색인과 기본 저장소는 동치여야 한다
        let owners = cache.find_players_with_item("Pistol").await;
        for i in 0..4 {
            let name = format!("Player{i}");
            let record = cache.get_player(&name).await.unwrap();
            assert_eq!(owners[&name], record.items["pistol"].count);
        }
        let mut expected: Vec<String> = (0..4).map(|i| format!("Player{i}")).collect();
        expected.sort();
        assert_eq!(cache.find_players_with_vehicle("Kuruma").await, expected);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db_file = dir.path().join("players_db.json");

        let cache = PlayerCache::new(&db_file);
        cache
            .upsert_player(
                "Alice",
                profile(&[("pistol", 3)], &[(999, UNKNOWN_VEHICLE)]),
            )
            .await;
        cache.save().await.unwrap();

        assert!(db_file.exists());
        assert!(dir.path().join("players_db_lookup.json").exists());

        let reloaded = PlayerCache::new(&db_file);
        reloaded.load().await;
        assert_eq!(
            reloaded.get_player("Alice").await,
            cache.get_player("Alice").await
        );
        // 역색인은 로드 시 기본 저장소에서 재구축된다
        assert_eq!(
            reloaded.find_players_with_vehicle(UNKNOWN_VEHICLE).await,
            vec!["Alice".to_string()]
        );
    }

    #[tokio::test]
    async fn load_missing_file_yields_empty_query_safe_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PlayerCache::new(dir.path().join("missing.json"));
        cache.load().await;

        assert!(cache.get_player("Alice").await.is_none());
        assert!(cache.find_players_with_item("Pistol").await.is_empty());
        assert!(cache.find_players_with_vehicle("Banshee").await.is_empty());
    }

    #[tokio::test]
    async fn load_corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db_file = dir.path().join("players_db.json");
        std::fs::write(&db_file, "{ definitely not json").unwrap();

        let cache = PlayerCache::new(&db_file);
        cache.load().await;
        assert!(cache.get_player("Alice").await.is_none());
    }
}
