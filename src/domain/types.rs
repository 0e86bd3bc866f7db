// ==========================================
// 表格批量导入 - 领域类型定义
// ==========================================
// 职责: 单元格/字段取值模型 + 字段语义类型标签
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 取值 (Value)
// ==========================================
// 单元格原始值与记录字段值共用同一模型
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Value {
    /// 构造文本值
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 空值或零长度文本
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 空值或纯空白文本（用于判定空白行）
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 尝试解释为整数（用于主键赋值）
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ==========================================
// 字段语义类型 (Field Kind)
// ==========================================
// 决定值转换规则: 日期类解析, 文本类空值归一
// 序列化格式: SCREAMING_SNAKE_CASE (与配置文件一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    Text,     // 短文本
    LongText, // 长文本
    Date,     // 日期
    DateTime, // 日期时间
    Integer,  // 整数
    Float,    // 浮点
    Boolean,  // 布尔
    Other,    // 其他（原样透传）
}

impl FieldKind {
    pub fn is_date(self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::DateTime)
    }

    pub fn is_text(self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::LongText)
    }

    /// SQLite 列类型声明（决定列亲和性）
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::LongText | FieldKind::Date | FieldKind::DateTime => {
                "TEXT"
            }
            FieldKind::Integer | FieldKind::Boolean => "INTEGER",
            FieldKind::Float => "REAL",
            FieldKind::Other => "",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => write!(f, "TEXT"),
            FieldKind::LongText => write!(f, "LONG_TEXT"),
            FieldKind::Date => write!(f, "DATE"),
            FieldKind::DateTime => write!(f, "DATE_TIME"),
            FieldKind::Integer => write!(f, "INTEGER"),
            FieldKind::Float => write!(f, "FLOAT"),
            FieldKind::Boolean => write!(f, "BOOLEAN"),
            FieldKind::Other => write!(f, "OTHER"),
        }
    }
}
