// ==========================================
// 表格批量导入 - 行处理器
// ==========================================
// 职责: 映射注册（配置阶段） + 单行处理
// 单行流程: 逐个映射 [定位记录 → 转换赋值 → 加入结果 → 关联函数 → 保存]
//           → 逐个调用辅助函数
// ==========================================

use crate::config::ImportSettings;
use crate::domain::{MappingSpec, Record, Value};
use crate::importer::bulk_importer_trait::{AuxiliaryFn, LinkingFn};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::header_index::HeaderIndex;
use crate::importer::record_resolver::{resolve_record, Resolution};
use crate::importer::value_coercer::coerce_field;
use crate::repository::{RecordStore, SearchIndexer};
use serde::Serialize;
use tracing::{debug, info};

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowOutcome {
    /// 表格中的行号（从 1 开始；直接调用 process_row 时为 None）
    pub row_number: Option<usize>,
    /// 按映射注册顺序排列的已保存实体
    pub records: Vec<Record>,
    /// 实际匹配到的列（去重，按首次出现顺序）
    pub matched_columns: Vec<String>,
    /// 映射中声明但表头中不存在的列
    pub missing_columns: Vec<String>,
    pub created: usize,
    pub updated: usize,
}

fn push_unique(list: &mut Vec<String>, column: &str) {
    if !list.iter().any(|c| c == column) {
        list.push(column.to_string());
    }
}

// ==========================================
// BulkImporter - 批量导入器
// ==========================================
// 映射与回调在配置阶段注册，处理期间不可变
pub struct BulkImporter<S: RecordStore> {
    store: S,
    mappings: Vec<MappingSpec>,
    linking_fn: Option<LinkingFn>,
    auxiliary_fns: Vec<AuxiliaryFn>,
    pub(crate) search_indexer: Option<Box<dyn SearchIndexer>>,
    pub(crate) settings: ImportSettings,
}

impl<S: RecordStore> BulkImporter<S> {
    /// 创建导入器
    ///
    /// # 参数
    /// - store: 持久化协作方
    pub fn new(store: S) -> Self {
        Self {
            store,
            mappings: Vec::new(),
            linking_fn: None,
            auxiliary_fns: Vec::new(),
            search_indexer: None,
            settings: ImportSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 注册搜索索引协作方（导入后可选全量重建）
    pub fn with_search_indexer(mut self, indexer: Box<dyn SearchIndexer>) -> Self {
        self.search_indexer = Some(indexer);
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn mappings(&self) -> &[MappingSpec] {
        &self.mappings
    }

    /// 注册 行 ↔ 实体 映射
    ///
    /// 若提供唯一键，先按唯一字段查找已有记录并更新；否则（或未找到）新建记录。
    ///
    /// # 返回
    /// - Err(UnknownEntity/UnknownField): 实体或字段不存在（配置错误）
    /// - Err(InvalidMapping): 唯一列名为空
    pub fn add_mapping(&mut self, spec: MappingSpec) -> ImportResult<()> {
        self.store.schema(&spec.entity_type)?;
        for field in spec.referenced_fields() {
            self.store.field_kind(&spec.entity_type, field)?;
        }
        if let Some(key) = &spec.unique {
            if key.column.trim().is_empty() {
                return Err(ImportError::InvalidMapping(format!(
                    "实体 {} 的唯一列名为空",
                    spec.entity_type
                )));
            }
        }

        info!(
            entity = %spec.entity_type,
            columns = spec.columns.len(),
            unique = ?spec.unique.as_ref().map(|u| u.column.as_str()),
            "注册映射"
        );
        self.mappings.push(spec);
        Ok(())
    }

    /// 注册每行调用的辅助函数，参数为 (表头, 行值)
    pub fn add_function_mapping<F>(&mut self, function: F)
    where
        F: FnMut(&HeaderIndex, &[Value]) -> anyhow::Result<()> + 'static,
    {
        self.auxiliary_fns.push(Box::new(function));
    }

    /// 注册关联函数（后注册者替换先注册者）
    ///
    /// 本行每新增一个实体且实体数 ≥2 时调用一次，参数为按映射顺序排列的本行全部实体；
    /// 调用发生在最新实体保存之前。
    pub fn add_linking_function<F>(&mut self, function: F)
    where
        F: FnMut(&mut [Record]) -> anyhow::Result<()> + 'static,
    {
        self.linking_fn = Some(Box::new(function));
    }

    /// 处理单行: 应用全部映射并保存，再调用辅助函数
    ///
    /// # 参数
    /// - headers: 表头索引
    /// - values: 行取值（与表头按位置对齐）
    ///
    /// # 返回
    /// - Ok(RowOutcome): 本行实体与统计
    /// - Err(MissingUniqueHeader): 中止整个导入（已保存的记录不回滚）
    pub fn process_row(
        &mut self,
        headers: &HeaderIndex,
        values: &[Value],
    ) -> ImportResult<RowOutcome> {
        let mut outcome = RowOutcome::default();

        for spec in &self.mappings {
            let Resolution {
                mut record,
                existing,
            } = resolve_record(
                &self.store,
                &spec.entity_type,
                spec.unique.as_ref(),
                headers,
                values,
            )?;

            for (column, field) in &spec.columns {
                // 映射中声明但表头不存在的列：跳过该字段
                let Some(raw) = headers.value(values, column) else {
                    push_unique(&mut outcome.missing_columns, column);
                    continue;
                };
                let value = coerce_field(&self.store, &spec.entity_type, field, raw.clone())?;
                record.set(field, value);
                push_unique(&mut outcome.matched_columns, column);
            }

            outcome.records.push(record);
            if outcome.records.len() > 1 {
                if let Some(link) = self.linking_fn.as_mut() {
                    link(&mut outcome.records)?;
                }
            }

            if let Some(record) = outcome.records.last_mut() {
                self.store.save(record)?;
            }
            if existing {
                outcome.updated += 1;
            } else {
                outcome.created += 1;
            }
        }

        for function in self.auxiliary_fns.iter_mut() {
            function(headers, values)?;
        }

        debug!(
            records = outcome.records.len(),
            created = outcome.created,
            updated = outcome.updated,
            "行处理完成"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntitySchema, FieldKind};
    use crate::repository::{MemoryRecordRepository, RepositoryError};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> MemoryRecordRepository {
        MemoryRecordRepository::new(vec![
            EntitySchema::new("model_one").field("one", FieldKind::Other),
            EntitySchema::new("model_two").field("two", FieldKind::Other),
            EntitySchema::new("person")
                .field("first_name", FieldKind::Text)
                .field("extra", FieldKind::Text)
                .field("joined", FieldKind::Date),
        ])
        .unwrap()
    }

    #[test]
    fn test_process_row_single() {
        let mut importer = BulkImporter::new(store());
        importer
            .add_mapping(MappingSpec::new("model_one").column("one", "one"))
            .unwrap();

        let headers = HeaderIndex::from_names(&["one", "two"]);
        let values = vec![Value::text("val1"), Value::text("spot")];
        let outcome = importer.process_row(&headers, &values).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.created, 1);
        assert_eq!(importer.store().save_count(), 1);
        assert_eq!(outcome.records[0].get("one"), Some(&Value::text("val1")));
        assert_eq!(outcome.matched_columns, vec!["one"]);
    }

    #[test]
    fn test_process_row_multi_with_linking() {
        let mut importer = BulkImporter::new(store());
        importer
            .add_mapping(MappingSpec::new("model_one").column("one", "one"))
            .unwrap();
        importer
            .add_mapping(MappingSpec::new("model_two").column("two", "two"))
            .unwrap();

        let calls: Rc<RefCell<Vec<Vec<Record>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        importer.add_linking_function(move |records: &mut [Record]| {
            sink.borrow_mut().push(records.to_vec());
            Ok(())
        });

        let headers = HeaderIndex::from_names(&["one", "two"]);
        let values = vec![Value::text("val1"), Value::text("spot")];
        let outcome = importer.process_row(&headers, &values).unwrap();

        assert_eq!(importer.store().save_count(), 2);
        let (result_1, result_2) = (&outcome.records[0], &outcome.records[1]);
        assert_eq!(result_1.get("one"), Some(&Value::text("val1")));
        assert_eq!(result_2.get("two"), Some(&Value::text("spot")));

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].entity_type(), "model_one");
        assert_eq!(calls[0][1].get("two"), Some(&Value::text("spot")));
        // 关联函数在最新实体保存之前调用
        assert!(calls[0][0].id().is_some());
        assert!(calls[0][1].id().is_none());
    }

    #[test]
    fn test_linking_called_for_each_addition_past_first() {
        let mut importer = BulkImporter::new(store());
        importer
            .add_mapping(MappingSpec::new("model_one").column("one", "one"))
            .unwrap();
        importer
            .add_mapping(MappingSpec::new("model_two").column("two", "two"))
            .unwrap();
        importer
            .add_mapping(MappingSpec::new("person").column("one", "first_name"))
            .unwrap();

        let sizes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sizes);
        importer.add_linking_function(move |records: &mut [Record]| {
            sink.borrow_mut().push(records.len());
            Ok(())
        });

        let headers = HeaderIndex::from_names(&["one", "two"]);
        importer
            .process_row(&headers, &[Value::text("a"), Value::text("b")])
            .unwrap();
        assert_eq!(*sizes.borrow(), vec![2, 3]);
    }

    #[test]
    fn test_linking_can_mutate_latest_before_save() {
        let mut importer = BulkImporter::new(store());
        importer
            .add_mapping(MappingSpec::new("model_one").column("one", "one"))
            .unwrap();
        importer
            .add_mapping(MappingSpec::new("model_two").column("two", "two"))
            .unwrap();
        importer.add_linking_function(|records: &mut [Record]| {
            let parent = records[0].value("id");
            records[1].set("two", parent);
            Ok(())
        });

        let headers = HeaderIndex::from_names(&["one", "two"]);
        importer
            .process_row(&headers, &[Value::text("a"), Value::text("b")])
            .unwrap();
        let saved = importer.store().list("model_two").unwrap();
        assert_eq!(saved[0].get("two"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_missing_column_skipped_silently() {
        let mut importer = BulkImporter::new(store());
        importer
            .add_mapping(
                MappingSpec::new("person")
                    .column("First Name", "first_name")
                    .column("nonexistant column", "extra"),
            )
            .unwrap();

        let headers = HeaderIndex::from_names(&["first name"]);
        let outcome = importer
            .process_row(&headers, &[Value::text("Bob")])
            .unwrap();
        let record = &outcome.records[0];
        assert_eq!(record.get("first_name"), Some(&Value::text("Bob")));
        assert_eq!(record.get("extra"), None);
        assert_eq!(outcome.missing_columns, vec!["nonexistant column"]);
    }

    #[test]
    fn test_values_are_coerced() {
        let mut importer = BulkImporter::new(store());
        importer
            .add_mapping(
                MappingSpec::new("person")
                    .column("first name", "first_name")
                    .column("joined", "joined"),
            )
            .unwrap();

        let headers = HeaderIndex::from_names(&["First Name", "Joined"]);
        let outcome = importer
            .process_row(&headers, &[Value::Null, Value::text("garbage")])
            .unwrap();
        let record = &outcome.records[0];
        assert_eq!(record.get("first_name"), Some(&Value::text("")));
        assert_eq!(record.get("joined"), Some(&Value::Null));
    }

    #[test]
    fn test_auxiliary_functions_run_without_mappings() {
        let mut importer = BulkImporter::new(store());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let sink = Rc::clone(&seen);
            importer.add_function_mapping(move |headers: &HeaderIndex, values: &[Value]| {
                sink.borrow_mut()
                    .push(format!("{}:{}:{}", tag, headers.len(), values[0]));
                Ok(())
            });
        }

        let headers = HeaderIndex::from_names(&["one"]);
        let outcome = importer
            .process_row(&headers, &[Value::text("x")])
            .unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(*seen.borrow(), vec!["first:1:x", "second:1:x"]);
    }

    #[test]
    fn test_add_mapping_rejects_unknown_field() {
        let mut importer = BulkImporter::new(store());
        let err = importer
            .add_mapping(MappingSpec::new("person").column("Nick", "nickname"))
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Repository(RepositoryError::UnknownField { .. })
        ));
        let err = importer
            .add_mapping(MappingSpec::new("ghost"))
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Repository(RepositoryError::UnknownEntity(_))
        ));
        assert!(importer.mappings().is_empty());
    }

    #[test]
    fn test_callback_error_propagates() {
        let mut importer = BulkImporter::new(store());
        importer.add_function_mapping(|_: &HeaderIndex, _: &[Value]| {
            Err(anyhow::anyhow!("boom"))
        });
        let headers = HeaderIndex::from_names(&["one"]);
        let err = importer
            .process_row(&headers, &[Value::text("x")])
            .unwrap_err();
        assert!(matches!(err, ImportError::Other(_)));
    }
}
