//! 디렉터리 레코드 인메모리 저장소.

use nearchrist_core::{DirectoryError, DirectoryRecord, DirectoryResult};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

/// 레코드 종류별 저장소.
///
/// ID는 1부터 순서대로 부여되며 재사용되지 않습니다.
/// 조회 결과는 복제본으로 반환되므로 잠금이 호출자에게 노출되지 않습니다.
#[derive(Debug)]
pub struct DirectoryRepository<T> {
    table: RwLock<Table<T>>,
}

impl<T> Default for DirectoryRepository<T> {
    fn default() -> Self {
        Self {
            table: RwLock::new(Table::default()),
        }
    }
}

impl<T: DirectoryRecord> DirectoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 전체 목록 (ID 순).
    pub async fn list(&self) -> Vec<T> {
        self.table.read().await.rows.values().cloned().collect()
    }

    pub async fn get(&self, id: i64) -> DirectoryResult<T> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound { kind: T::KIND, id })
    }

    /// 새 레코드를 저장합니다. 요청에 포함된 ID는 무시됩니다.
    pub async fn create(&self, mut record: T) -> DirectoryResult<T> {
        record.check_required()?;

        let mut table = self.table.write().await;
        table.next_id += 1;
        let id = table.next_id;
        record.assign_id(id);
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    /// 레코드 전체를 교체합니다.
    pub async fn update(&self, id: i64, mut record: T) -> DirectoryResult<T> {
        record.check_required()?;

        let mut table = self.table.write().await;
        let slot = table
            .rows
            .get_mut(&id)
            .ok_or(DirectoryError::NotFound { kind: T::KIND, id })?;
        record.assign_id(id);
        *slot = record.clone();
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> DirectoryResult<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(DirectoryError::NotFound { kind: T::KIND, id })
    }

    pub async fn count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearchrist_core::State;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = DirectoryRepository::<State>::new();

        let mut tas = State::named("Tasmania");
        tas.state_id = 77;
        let created = repo.create(tas).await.unwrap();
        let vic = repo.create(State::named("Victoria")).await.unwrap();

        assert_eq!(created.state_id, 1);
        assert_eq!(vic.state_id, 2);
        assert_eq!(repo.count().await, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_name() {
        let repo = DirectoryRepository::<State>::new();
        let err = repo.create(State::named("")).await.unwrap_err();

        assert!(matches!(err, DirectoryError::InvalidInput(_)));
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = DirectoryRepository::<State>::new();
        repo.create(State::named("Tasmania")).await.unwrap();

        let updated = repo.update(1, State::named("Lutruwita")).await.unwrap();
        assert_eq!(updated.state_id, 1);
        assert_eq!(repo.get(1).await.unwrap().state_name, "Lutruwita");

        repo.delete(1).await.unwrap();
        assert!(matches!(
            repo.get(1).await,
            Err(DirectoryError::NotFound { kind: "state", id: 1 })
        ));
        assert!(repo.delete(1).await.is_err());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let repo = DirectoryRepository::<State>::new();
        repo.create(State::named("A")).await.unwrap();
        repo.delete(1).await.unwrap();

        let b = repo.create(State::named("B")).await.unwrap();
        assert_eq!(b.state_id, 2);
    }
}
