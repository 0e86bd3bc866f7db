// ==========================================
// 表格批量导入 - 配置层
// ==========================================
// 职责: 导入配置档（JSON）加载与导入参数
// ==========================================

pub mod import_profile;
pub mod import_settings;

pub use import_profile::{ColumnBinding, ForeignKeyLink, ImportProfile, MappingProfile};
pub use import_settings::ImportSettings;
