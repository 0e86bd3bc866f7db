// ==========================================
// 表格批量导入 - 导入协作接口
// ==========================================
// 职责: 定义表格读取接口与每行回调类型（不包含实现）
// ==========================================

use crate::domain::{Record, Value};
use crate::importer::error::ImportResult;
use crate::importer::header_index::HeaderIndex;

// ==========================================
// SheetSource Trait
// ==========================================
// 用途: 表格文件读取（工作簿 → 工作表 → 单元格网格）
// 实现者: ExcelWorkbook, CsvWorkbook, MemoryWorkbook
pub trait SheetSource {
    /// 列出工作表名称（按工作簿顺序）
    fn sheet_names(&mut self) -> ImportResult<Vec<String>>;

    /// 读取指定工作表的单元格网格（行优先，按位置对齐）
    ///
    /// # 返回
    /// - Ok(Vec<Vec<Value>>): 行列表
    /// - Err: 工作表不存在或解析失败
    fn read_sheet(&mut self, name: &str) -> ImportResult<Vec<Vec<Value>>>;
}

/// 关联函数: 每新增一个实体（且本行已有 ≥2 个）时调用，参数为本行至今的全部实体
pub type LinkingFn = Box<dyn FnMut(&mut [Record]) -> anyhow::Result<()>>;

/// 辅助函数: 每行调用一次，参数为 (表头, 行值)
pub type AuxiliaryFn = Box<dyn FnMut(&HeaderIndex, &[Value]) -> anyhow::Result<()>>;
