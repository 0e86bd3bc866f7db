// ==========================================
// 表格批量导入 - 映射声明
// ==========================================
// 职责: 表格列 → 实体字段的有序映射 + 可选唯一键对账规则
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// UniqueKey - 唯一列/唯一字段对
// ==========================================
// 有唯一列必有唯一字段：两者放在同一结构中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueKey {
    /// 表格中的唯一列名（大小写不敏感）
    pub column: String,
    /// 实体中的唯一字段名
    pub field: String,
}

// ==========================================
// MappingSpec - 映射声明
// ==========================================
// 注册顺序决定每行处理顺序及关联函数的参数顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSpec {
    pub entity_type: String,
    /// (列名, 字段名)，按声明顺序赋值
    pub columns: Vec<(String, String)>,
    pub unique: Option<UniqueKey>,
}

impl MappingSpec {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            columns: Vec::new(),
            unique: None,
        }
    }

    /// 追加列映射
    pub fn column(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.columns.push((column.into(), field.into()));
        self
    }

    /// 设置唯一键（存在则更新，否则新建）
    pub fn unique(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.unique = Some(UniqueKey {
            column: column.into(),
            field: field.into(),
        });
        self
    }

    /// 本映射引用的全部字段（含唯一字段）
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(|(_, field)| field.as_str())
            .chain(self.unique.iter().map(|u| u.field.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_builder_preserves_order() {
        let spec = MappingSpec::new("person")
            .column("Last Name", "last_name")
            .column("First Name", "first_name")
            .unique("ID", "id");

        assert_eq!(spec.columns[0].0, "Last Name");
        assert_eq!(spec.columns[1].1, "first_name");
        let fields: Vec<&str> = spec.referenced_fields().collect();
        assert_eq!(fields, vec!["last_name", "first_name", "id"]);
    }
}
