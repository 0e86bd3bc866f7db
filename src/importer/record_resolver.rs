// ==========================================
// 表格批量导入 - 记录定位器
// ==========================================
// 职责: 按唯一列/唯一字段对查找已有记录，找不到则新建
// 红线: 唯一列不在表头中 → MissingUniqueHeader，中止整个导入
// ==========================================

use crate::domain::{Record, UniqueKey, Value};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::header_index::HeaderIndex;
use crate::repository::RecordStore;
use tracing::debug;

/// 定位结果
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub record: Record,
    /// true: 命中已有记录（更新）；false: 新建
    pub existing: bool,
}

/// 定位目标记录
///
/// # 参数
/// - store: 持久化协作方
/// - entity_type: 目标实体类型
/// - unique: 唯一列/唯一字段对（可选）
/// - headers: 表头索引
/// - values: 当前行取值
///
/// # 返回
/// - Ok(Resolution): 已有记录或新建的未保存记录
/// - Err(MissingUniqueHeader): 唯一列不在表头中
pub fn resolve_record<S: RecordStore + ?Sized>(
    store: &S,
    entity_type: &str,
    unique: Option<&UniqueKey>,
    headers: &HeaderIndex,
    values: &[Value],
) -> ImportResult<Resolution> {
    let Some(key) = unique else {
        return Ok(Resolution {
            record: store.new_record(entity_type)?,
            existing: false,
        });
    };

    let value = headers
        .value(values, &key.column)
        .ok_or_else(|| ImportError::MissingUniqueHeader {
            column: key.column.clone(),
        })?;

    match store.find_one_by_field(entity_type, &key.field, value)? {
        Some(record) => {
            debug!(entity = %entity_type, field = %key.field, value = %value, "命中已有记录");
            Ok(Resolution {
                record,
                existing: true,
            })
        }
        None => Ok(Resolution {
            record: store.new_record(entity_type)?,
            existing: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntitySchema, FieldKind};
    use crate::repository::MemoryRecordRepository;

    fn store() -> MemoryRecordRepository {
        MemoryRecordRepository::new(vec![EntitySchema::new("person")
            .field("code", FieldKind::Text)
            .field("name", FieldKind::Text)])
        .unwrap()
    }

    fn key() -> UniqueKey {
        UniqueKey {
            column: "Code".to_string(),
            field: "code".to_string(),
        }
    }

    #[test]
    fn test_without_unique_always_new() {
        let store = store();
        let headers = HeaderIndex::from_names(&["code"]);
        let resolution =
            resolve_record(&store, "person", None, &headers, &[Value::text("A1")]).unwrap();
        assert!(!resolution.existing);
        assert!(resolution.record.is_new());
    }

    #[test]
    fn test_unique_hit_returns_existing() {
        let store = store();
        let mut existing = store.new_record("person").unwrap();
        existing.set("code", Value::text("A1"));
        existing.set("name", Value::text("old"));
        store.save(&mut existing).unwrap();

        let headers = HeaderIndex::from_names(&["CODE", "name"]);
        let resolution = resolve_record(
            &store,
            "person",
            Some(&key()),
            &headers,
            &[Value::text("A1"), Value::text("new")],
        )
        .unwrap();
        assert!(resolution.existing);
        assert_eq!(resolution.record.id(), existing.id());
        assert_eq!(resolution.record.get("name"), Some(&Value::text("old")));
    }

    #[test]
    fn test_unique_miss_creates_new() {
        let store = store();
        let headers = HeaderIndex::from_names(&["code"]);
        let resolution =
            resolve_record(&store, "person", Some(&key()), &headers, &[Value::text("Z9")])
                .unwrap();
        assert!(!resolution.existing);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_missing_unique_header() {
        let store = store();
        let headers = HeaderIndex::from_names(&["name"]);
        let err = resolve_record(&store, "person", Some(&key()), &headers, &[Value::text("x")])
            .unwrap_err();
        match err {
            ImportError::MissingUniqueHeader { column } => assert_eq!(column, "Code"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
