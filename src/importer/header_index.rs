// ==========================================
// 表格批量导入 - 表头索引
// ==========================================
// 职责: 表头行 → (规范化列名 → 位置) 映射，每个表格只构建一次
// 规范化: TRIM + 小写（列名匹配大小写不敏感）
// ==========================================

use crate::domain::Value;
use std::collections::HashMap;

static NULL: Value = Value::Null;

/// 列名规范化（TRIM + 小写）
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

// ==========================================
// HeaderIndex
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderIndex {
    /// 按位置排列的规范化列名（空单元格保留为空串占位）
    headers: Vec<String>,
    /// 规范化列名 → 位置（重名时取首次出现）
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// 从表头单元格构建
    pub fn from_cells(cells: &[Value]) -> Self {
        Self::build(cells.iter().map(|c| normalize_header(&c.to_string())))
    }

    /// 从列名构建
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::build(names.iter().map(|n| normalize_header(n.as_ref())))
    }

    fn build(normalized: impl Iterator<Item = String>) -> Self {
        let mut headers: Vec<String> = normalized.collect();
        // 去掉尾部空列
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }

        let mut positions = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            if !header.is_empty() {
                positions.entry(header.clone()).or_insert(idx);
            }
        }
        Self { headers, positions }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// 列位置（大小写不敏感）
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(&normalize_header(column)).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// 取行中指定列的值
    ///
    /// # 返回
    /// - None: 列不在表头中
    /// - Some(Null): 列存在但该行长度不足
    pub fn value<'a>(&self, values: &'a [Value], column: &str) -> Option<&'a Value> {
        self.position(column)
            .map(|idx| values.get(idx).unwrap_or(&NULL))
    }

    /// 判定是否为重复出现的表头行（首列值与首个表头相同）
    pub fn is_repeated_header(&self, values: &[Value]) -> bool {
        match (self.headers.first(), values.first()) {
            (Some(first), Some(cell)) if !first.is_empty() => {
                normalize_header(&cell.to_string()) == *first
            }
            _ => false,
        }
    }
}
