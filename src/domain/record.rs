// ==========================================
// 表格批量导入 - 记录与实体模式
// ==========================================
// 职责: 实体模式声明（字段 + 语义类型）与实体实例
// 红线: 不含数据访问逻辑
// ==========================================

use crate::domain::types::{FieldKind, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 主键伪字段名（映射/唯一字段可直接指向主键）
pub const PRIMARY_KEY_FIELD: &str = "id";

// ==========================================
// FieldDef - 字段声明
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ==========================================
// EntitySchema - 实体模式
// ==========================================
// 用途: 持久化层建表依据 + 值转换时的字段类型查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// 实体类型名（同时作为表名）
    pub name: String,
    /// 字段声明（不含主键 id）
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// 追加字段声明（构建器风格）
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef::new(name, kind));
        self
    }

    /// 查询字段语义类型，主键视为整数
    pub fn field_kind(&self, field: &str) -> Option<FieldKind> {
        if field == PRIMARY_KEY_FIELD {
            return Some(FieldKind::Integer);
        }
        self.fields.iter().find(|f| f.name == field).map(|f| f.kind)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_kind(field).is_some()
    }

    /// 文本类字段（搜索索引来源）
    pub fn text_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.kind.is_text())
    }

    /// 校验实体名与字段名均为合法 SQL 标识符，且字段不重复
    pub fn validate(&self) -> Result<(), String> {
        if !is_identifier(&self.name) {
            return Err(format!("非法实体名: '{}'", self.name));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !is_identifier(&field.name) {
                return Err(format!("非法字段名: '{}.{}'", self.name, field.name));
            }
            if field.name == PRIMARY_KEY_FIELD {
                return Err(format!("字段 '{}.id' 为保留主键", self.name));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("字段重复: '{}.{}'", self.name, field.name));
            }
        }
        Ok(())
    }
}

/// [A-Za-z_][A-Za-z0-9_]*
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ==========================================
// Record - 实体实例
// ==========================================
// 生命周期: 单行处理期间创建/读取并逐字段修改，保存后交还持久化层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    entity_type: String,
    id: Option<i64>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// 新建未保存实例
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// 从已持久化数据重建实例
    pub fn from_parts(
        entity_type: impl Into<String>,
        id: i64,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: Some(id),
            fields,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    /// 字段赋值；`id` 写入主键（非整数值视为未设置）
    pub fn set(&mut self, field: &str, value: Value) {
        if field == PRIMARY_KEY_FIELD {
            self.id = value.as_i64();
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    /// 读取普通字段（未赋值返回 None）
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// 读取任意字段（含主键），未赋值返回 Null
    pub fn value(&self, field: &str) -> Value {
        if field == PRIMARY_KEY_FIELD {
            return self.id.into();
        }
        self.fields.get(field).cloned().unwrap_or_default()
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}
