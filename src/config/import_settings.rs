// ==========================================
// 表格批量导入 - 导入参数
// ==========================================
// 行号均为 0 起始；缺省字段取默认值
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// 表头所在行（默认 0，即第一行）
    pub header_row: usize,
    /// 首个数据行（默认 1）；不早于表头的下一行，见 data_start_row
    pub first_data_row: usize,
    /// 导入完成后是否重建搜索索引
    pub rebuild_search_index: bool,
    /// 是否跳过全空行（默认关闭：全空行照常处理，辅助函数照常调用）
    pub skip_blank_rows: bool,
}

impl ImportSettings {
    /// 实际起始数据行: 表头及其以上的行永远不作为数据导入
    pub fn data_start_row(&self) -> usize {
        self.first_data_row.max(self.header_row + 1)
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            header_row: 0,
            first_data_row: 1,
            rebuild_search_index: false,
            skip_blank_rows: false,
        }
    }
}
