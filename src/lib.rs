// ==========================================
// 表格批量导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + calamine/csv
// 系统定位: 表格行 → 实体记录 的映射与对账引擎
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 取值模型与映射声明
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 映射、对账、表格驱动
pub mod importer;

// 配置层 - 导入配置档
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{EntitySchema, FieldDef, FieldKind, MappingSpec, Record, UniqueKey, Value};

// 导入器
pub use importer::{BulkImporter, HeaderIndex, ImportError, ImportReport, ImportResult, RowOutcome};

// 仓储
pub use repository::{MemoryRecordRepository, RecordRepositoryImpl, RecordStore, SqliteSearchIndex};

// 配置
pub use config::{ImportProfile, ImportSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "表格批量导入";
