// ==========================================
// 表格批量导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("表格文件无工作表")]
    EmptyWorkbook,

    #[error("表头行缺失: 第 {0} 行不存在")]
    MissingHeaderRow(usize),

    // ===== 映射/对账错误 =====
    /// 配置的唯一列不在表头中：整个导入立即中止
    #[error("缺少唯一列表头: 上传的表格中应包含 '{column}' 列")]
    MissingUniqueHeader { column: String },

    #[error("映射配置非法: {0}")]
    InvalidMapping(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 ({path}): {message}")]
    ConfigReadError { path: String, message: String },

    // ===== 持久化错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_unique_header_names_column() {
        let err = ImportError::MissingUniqueHeader {
            column: "PersonID".to_string(),
        };
        assert!(err.to_string().contains("'PersonID'"));
    }

    #[test]
    fn test_repository_error_is_transparent() {
        let err: ImportError = RepositoryError::UnknownEntity("ghost".to_string()).into();
        assert_eq!(err.to_string(), "未注册的实体类型: ghost");
    }
}
