// ==========================================
// 表格批量导入 - 导入层
// ==========================================
// 职责: 表格行 → 实体记录 的映射、对账与持久化
// 支持: Excel, CSV, 内存表格
// ==========================================

// 模块声明
pub mod bulk_importer_trait;
pub mod error;
pub mod file_parser;
pub mod header_index;
pub mod record_resolver;
pub mod row_processor;
pub mod spreadsheet_driver;
pub mod value_coercer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{open_spreadsheet, CsvWorkbook, ExcelWorkbook, MemoryWorkbook};
pub use header_index::{normalize_header, HeaderIndex};
pub use record_resolver::{resolve_record, Resolution};
pub use row_processor::{BulkImporter, RowOutcome};
pub use spreadsheet_driver::ImportReport;
pub use value_coercer::{coerce_field, ValueCoercer};

// 重导出 Trait 接口
pub use bulk_importer_trait::{AuxiliaryFn, LinkingFn, SheetSource};
