// ==========================================
// 表格批量导入 - 领域模型层
// ==========================================
// 职责: 定义取值模型、实体模式、映射声明
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod mapping;
pub mod record;
pub mod types;

// 重导出核心类型
pub use mapping::{MappingSpec, UniqueKey};
pub use record::{EntitySchema, FieldDef, Record, PRIMARY_KEY_FIELD};
pub use types::{FieldKind, Value};
