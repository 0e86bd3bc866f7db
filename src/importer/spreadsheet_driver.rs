// ==========================================
// 表格批量导入 - 表格驱动
// ==========================================
// 流程: 打开工作簿 → 取首个工作表 → 读表头 → 逐行处理 → (可选)重建搜索索引
// 规则: 首列值等于首个表头的行视为重复表头，跳过
//       数据行从 first_data_row 开始，但不早于表头的下一行
// ==========================================

use crate::domain::Value;
use crate::importer::bulk_importer_trait::SheetSource;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::open_spreadsheet;
use crate::importer::header_index::HeaderIndex;
use crate::importer::row_processor::{BulkImporter, RowOutcome};
use crate::repository::RecordStore;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportReport - 导入结果汇总
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub sheet_name: String,
    /// 规范化后的表头
    pub headers: Vec<String>,
    /// 按表格顺序排列的逐行结果
    pub rows: Vec<RowOutcome>,
    pub skipped_header_rows: usize,
    pub skipped_blank_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub search_index_rebuilt: bool,
    pub elapsed_ms: u64,
}

impl ImportReport {
    /// 已处理的数据行数
    pub fn processed_rows(&self) -> usize {
        self.rows.len()
    }
}

impl<S: RecordStore> BulkImporter<S> {
    /// 按路径打开表格文件并导入
    pub fn process_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        rebuild_search_index: bool,
    ) -> ImportResult<ImportReport> {
        let path = path.as_ref();
        info!(file_path = %path.display(), "打开表格文件");
        let mut source = open_spreadsheet(path)?;
        self.process_spreadsheet(source.as_mut(), rebuild_search_index)
    }

    /// 导入表格（仅首个工作表）
    ///
    /// # 参数
    /// - source: 表格读取协作方
    /// - rebuild_search_index: 导入完成后是否全量重建搜索索引
    ///
    /// # 返回
    /// - Ok(ImportReport): 逐行结果与汇总
    /// - Err(MissingUniqueHeader): 唯一列不在表头中，导入中止（已保存的行保留）
    #[instrument(skip(self, source), fields(batch_id))]
    pub fn process_spreadsheet(
        &mut self,
        source: &mut dyn SheetSource,
        rebuild_search_index: bool,
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        // === 步骤 1: 选择首个工作表 ===
        let sheet_name = source
            .sheet_names()?
            .into_iter()
            .next()
            .ok_or(ImportError::EmptyWorkbook)?;
        let grid = source.read_sheet(&sheet_name)?;
        info!(sheet = %sheet_name, total_rows = grid.len(), "工作表读取完成");

        // === 步骤 2: 表头 ===
        let header_row = self.settings.header_row;
        let headers = grid
            .get(header_row)
            .map(|cells| HeaderIndex::from_cells(cells))
            .ok_or(ImportError::MissingHeaderRow(header_row + 1))?;
        debug!(headers = ?headers.headers(), "表头解析完成");
        self.check_unique_headers(&headers)?;

        // === 步骤 3: 逐行处理 ===
        let mut rows = Vec::new();
        let mut skipped_header_rows: usize = 0;
        let mut skipped_blank_rows: usize = 0;
        let data_start_row = self.settings.data_start_row();
        if data_start_row != self.settings.first_data_row {
            warn!(
                first_data_row = self.settings.first_data_row,
                header_row, data_start_row, "首个数据行不晚于表头，已从表头下一行开始"
            );
        }
        for (idx, values) in grid.iter().enumerate().skip(data_start_row) {
            if headers.is_repeated_header(values) {
                debug!(row_number = idx + 1, "跳过重复表头行");
                skipped_header_rows += 1;
                continue;
            }
            if self.settings.skip_blank_rows && values.iter().all(Value::is_blank) {
                skipped_blank_rows += 1;
                continue;
            }

            let mut outcome = self.process_row(&headers, values)?;
            outcome.row_number = Some(idx + 1);
            rows.push(outcome);
        }

        let created: usize = rows.iter().map(|r| r.created).sum();
        let updated: usize = rows.iter().map(|r| r.updated).sum();
        info!(
            processed = rows.len(),
            created,
            updated,
            skipped_header_rows,
            skipped_blank_rows,
            "逐行处理完成"
        );

        // === 步骤 4: 搜索索引（失败不影响导入结果） ===
        let search_index_rebuilt = rebuild_search_index && self.rebuild_search_index();

        Ok(ImportReport {
            batch_id,
            sheet_name,
            headers: headers.headers().to_vec(),
            rows,
            skipped_header_rows,
            skipped_blank_rows,
            created,
            updated,
            search_index_rebuilt,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// 处理任何行之前确认全部唯一列都在表头中
    fn check_unique_headers(&self, headers: &HeaderIndex) -> ImportResult<()> {
        for spec in self.mappings() {
            if let Some(key) = &spec.unique {
                if !headers.contains(&key.column) {
                    warn!(column = %key.column, "唯一列不在表头中，导入中止");
                    return Err(ImportError::MissingUniqueHeader {
                        column: key.column.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn rebuild_search_index(&self) -> bool {
        let Some(indexer) = self.search_indexer.as_ref() else {
            warn!("未配置搜索索引，跳过重建");
            return false;
        };
        match indexer.rebuild() {
            Ok(entries) => {
                info!(entries, "搜索索引已重建");
                true
            }
            Err(e) => {
                warn!(error = %e, "搜索索引重建失败");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::domain::{EntitySchema, FieldKind, MappingSpec};
    use crate::importer::file_parser::MemoryWorkbook;
    use crate::repository::{MemoryRecordRepository, RepositoryResult, SearchIndexer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn t(s: &str) -> Value {
        Value::text(s)
    }

    fn names_sheet() -> MemoryWorkbook {
        MemoryWorkbook::new()
            .sheet(
                "Names",
                vec![
                    vec![t("First Name"), t("Last Name"), t("Age"), t("ID")],
                    vec![t("Bob"), t("Smith"), Value::Int(20), Value::Int(1)],
                    vec![t("First Name"), t("Last Name"), t("Age"), t("ID")],
                    vec![t("Jane"), t("Doe"), Value::Int(35), Value::Int(2)],
                    vec![Value::Null, Value::Null, Value::Null],
                    vec![t("Alan"), t("Brown"), Value::Int(50), Value::Int(3)],
                ],
            )
            .sheet("Ignored", vec![vec![t("x")]])
    }

    fn importer() -> BulkImporter<MemoryRecordRepository> {
        let store = MemoryRecordRepository::new(vec![EntitySchema::new("person")
            .field("first_name", FieldKind::Text)
            .field("last_name", FieldKind::Text)
            .field("age", FieldKind::Text)])
        .unwrap();
        BulkImporter::new(store)
    }

    #[test]
    fn test_process_spreadsheet_skips_repeated_headers_and_blank_rows() {
        let mut importer = importer().with_settings(ImportSettings {
            skip_blank_rows: true,
            ..ImportSettings::default()
        });
        importer
            .add_mapping(
                MappingSpec::new("person")
                    .column("First Name", "first_name")
                    .column("Last Name", "last_name")
                    .column("Age", "age"),
            )
            .unwrap();

        let report = importer
            .process_spreadsheet(&mut names_sheet(), false)
            .unwrap();
        assert_eq!(report.sheet_name, "Names");
        assert_eq!(report.processed_rows(), 3);
        assert_eq!(report.skipped_header_rows, 1);
        assert_eq!(report.skipped_blank_rows, 1);
        assert_eq!(report.created, 3);
        assert_eq!(report.rows[0].records[0].get("first_name"), Some(&t("Bob")));
        assert_eq!(report.rows[2].records[0].get("age"), Some(&Value::Int(50)));
        assert_eq!(report.rows[2].row_number, Some(6));
        assert!(!report.search_index_rebuilt);
    }

    #[test]
    fn test_blank_rows_processed_by_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut importer = importer();
        importer
            .add_mapping(MappingSpec::new("person").column("Name", "first_name"))
            .unwrap();
        let counter = Arc::clone(&calls);
        importer.add_function_mapping(move |_headers: &HeaderIndex, _values: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut book = MemoryWorkbook::new().sheet(
            "Names",
            vec![
                vec![t("Name")],
                vec![t("Bob")],
                vec![Value::Null],
                vec![t("Ann")],
            ],
        );
        let report = importer.process_spreadsheet(&mut book, false).unwrap();
        assert_eq!(report.processed_rows(), 3);
        assert_eq!(report.skipped_blank_rows, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(importer.store().save_count(), 3);
        assert_eq!(report.rows[1].row_number, Some(3));
    }

    #[test]
    fn test_missing_unique_header_aborts_before_saving() {
        let mut importer = importer();
        importer
            .add_mapping(
                MappingSpec::new("person")
                    .column("First Name", "first_name")
                    .unique("PersonID", "id"),
            )
            .unwrap();

        let err = importer
            .process_spreadsheet(&mut names_sheet(), false)
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingUniqueHeader { ref column } if column == "PersonID"));
        assert_eq!(importer.store().save_count(), 0);
    }

    #[test]
    fn test_configurable_header_row() {
        let mut importer = importer().with_settings(ImportSettings {
            header_row: 1,
            first_data_row: 2,
            ..ImportSettings::default()
        });
        importer
            .add_mapping(MappingSpec::new("person").column("first name", "first_name"))
            .unwrap();

        let mut book = MemoryWorkbook::new().sheet(
            "Report",
            vec![
                vec![t("Exported 2024-01-01")],
                vec![t("First Name")],
                vec![t("Zed")],
            ],
        );
        let report = importer.process_spreadsheet(&mut book, false).unwrap();
        assert_eq!(report.processed_rows(), 1);
        assert_eq!(report.rows[0].records[0].get("first_name"), Some(&t("Zed")));
    }

    #[test]
    fn test_rows_above_header_are_never_imported() {
        let mut importer = importer().with_settings(ImportSettings {
            header_row: 2,
            ..ImportSettings::default()
        });
        importer
            .add_mapping(MappingSpec::new("person").column("First Name", "first_name"))
            .unwrap();

        let mut book = MemoryWorkbook::new().sheet(
            "Report",
            vec![
                vec![t("Exported 2024-01-01")],
                vec![t("Quarterly staff list")],
                vec![t("First Name")],
                vec![t("Zed")],
            ],
        );
        let report = importer.process_spreadsheet(&mut book, false).unwrap();
        assert_eq!(report.processed_rows(), 1);
        assert_eq!(report.rows[0].row_number, Some(4));
        assert_eq!(report.rows[0].records[0].get("first_name"), Some(&t("Zed")));
        assert_eq!(importer.store().save_count(), 1);
    }

    #[test]
    fn test_empty_workbook_and_missing_header_row() {
        let mut importer = importer();
        assert!(matches!(
            importer.process_spreadsheet(&mut MemoryWorkbook::new(), false),
            Err(ImportError::EmptyWorkbook)
        ));
        assert!(matches!(
            importer.process_spreadsheet(&mut MemoryWorkbook::new().sheet("s", vec![]), false),
            Err(ImportError::MissingHeaderRow(1))
        ));
    }

    struct CountingIndexer {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl SearchIndexer for CountingIndexer {
        fn rebuild(&self) -> RepositoryResult<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::repository::RepositoryError::DatabaseQueryError(
                    "index offline".to_string(),
                ));
            }
            Ok(0)
        }
    }

    #[test]
    fn test_search_index_rebuild_is_optional_and_non_fatal() {
        for fail in [false, true] {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut importer = importer().with_search_indexer(Box::new(CountingIndexer {
                calls: Arc::clone(&calls),
                fail,
            }));

            let report = importer
                .process_spreadsheet(&mut names_sheet(), false)
                .unwrap();
            assert!(!report.search_index_rebuilt);
            assert_eq!(calls.load(Ordering::SeqCst), 0);

            let report = importer
                .process_spreadsheet(&mut names_sheet(), true)
                .unwrap();
            assert_eq!(report.search_index_rebuilt, !fail);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
