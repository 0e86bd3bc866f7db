// ==========================================
// 表格批量导入 - 内存记录 Repository
// ==========================================
// 用途: 试运行（--dry-run）与单元测试
// 说明: 记录保存调用次数，便于断言保存行为
// ==========================================

use crate::domain::{EntitySchema, Record, Value, PRIMARY_KEY_FIELD};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_repo::RecordStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, BTreeMap<i64, Record>>,
    next_id: i64,
    save_count: usize,
}

// ==========================================
// MemoryRecordRepository
// ==========================================
pub struct MemoryRecordRepository {
    schemas: HashMap<String, EntitySchema>,
    state: Mutex<MemoryState>,
}

impl MemoryRecordRepository {
    /// 创建内存仓储
    ///
    /// # 参数
    /// - schemas: 实体模式列表
    pub fn new(schemas: Vec<EntitySchema>) -> RepositoryResult<Self> {
        let mut map = HashMap::new();
        for schema in schemas {
            schema.validate().map_err(RepositoryError::InvalidSchema)?;
            map.insert(schema.name.clone(), schema);
        }
        Ok(Self {
            schemas: map,
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..Default::default()
            }),
        })
    }

    /// 累计保存调用次数
    pub fn save_count(&self) -> usize {
        self.state.lock().map(|s| s.save_count).unwrap_or(0)
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

/// 数值按值比较，其余严格相等
fn values_match(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => stored == wanted,
    }
}

impl RecordStore for MemoryRecordRepository {
    fn schema(&self, entity_type: &str) -> RepositoryResult<&EntitySchema> {
        self.schemas
            .get(entity_type)
            .ok_or_else(|| RepositoryError::UnknownEntity(entity_type.to_string()))
    }

    fn find_one_by_field(
        &self,
        entity_type: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<Record>> {
        self.field_kind(entity_type, field)?;
        let state = self.lock()?;
        let Some(table) = state.tables.get(entity_type) else {
            return Ok(None);
        };

        let matches: Vec<&Record> = if field == PRIMARY_KEY_FIELD {
            match value.as_i64() {
                Some(id) => table.get(&id).into_iter().collect(),
                None => Vec::new(),
            }
        } else {
            table
                .values()
                .filter(|r| values_match(&r.value(field), value))
                .collect()
        };

        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches[0].clone())),
            count => Err(RepositoryError::MultipleMatches {
                entity: entity_type.to_string(),
                field: field.to_string(),
                value: value.to_string(),
                count,
            }),
        }
    }

    fn save(&self, record: &mut Record) -> RepositoryResult<()> {
        self.schema(record.entity_type())?;
        let mut state = self.lock()?;
        let id = match record.id() {
            Some(id) => id,
            None => state.next_id,
        };
        state.next_id = state.next_id.max(id + 1);
        state.save_count += 1;
        record.set_id(Some(id));
        state
            .tables
            .entry(record.entity_type().to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }

    fn count(&self, entity_type: &str) -> RepositoryResult<usize> {
        self.schema(entity_type)?;
        let state = self.lock()?;
        Ok(state.tables.get(entity_type).map_or(0, |t| t.len()))
    }

    fn list(&self, entity_type: &str) -> RepositoryResult<Vec<Record>> {
        self.schema(entity_type)?;
        let state = self.lock()?;
        Ok(state
            .tables
            .get(entity_type)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }
}
