// ==========================================
// 表格批量导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 取值一律参数化；标识符来自已校验的实体模式
// ==========================================

pub mod error;
pub mod memory_record_repo;
pub mod record_repo;
pub mod record_repo_impl;
pub mod search_index_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use memory_record_repo::MemoryRecordRepository;
pub use record_repo::RecordStore;
pub use record_repo_impl::RecordRepositoryImpl;
pub use search_index_repo::{SearchIndexer, SqliteSearchIndex};
