// ==========================================
// 表格批量导入 - 值转换器
// ==========================================
// 职责: 按目标字段语义类型转换单元格原始值
// 规则:
// - 日期类: 日在前优先解析，失败 → Null（宽松导入，不报错）
// - 文本类: 空值/空串 → ""（持久化层不接收 Null 文本）
// - 其他: 原样透传
// ==========================================

use crate::domain::{FieldKind, Value};
use crate::importer::error::ImportResult;
use crate::repository::RecordStore;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tracing::debug;

/// 日期解析失败（仅内部使用，从不向外传播）
#[derive(Error, Debug)]
#[error("无法解析为日期: '{0}'")]
struct DateCoercionFailure(String);

/// 日在前的纯日期格式（按优先级）
const DAY_FIRST_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d-%b-%y",
];

/// 日在前解释全部失败时的月在前回退
const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y"];

/// 可附加在日期之后的时间部分
const TIME_SUFFIXES: &[&str] = &[" %H:%M:%S%.f", " %H:%M:%S", " %H:%M", "T%H:%M:%S%.f", "T%H:%M:%S", "T%H:%M"];

// ==========================================
// ValueCoercer
// ==========================================
pub struct ValueCoercer;

impl ValueCoercer {
    /// 按字段语义类型转换原始值
    ///
    /// 文本类字段仅把空值/空串归一为 ""；数值 0 与 false 原样保留，
    /// 不按“假值即空”处理。
    pub fn coerce(&self, kind: FieldKind, raw: Value) -> Value {
        if kind.is_date() {
            return self.coerce_date(kind, raw);
        }
        if kind.is_text() && raw.is_empty() {
            return Value::Text(String::new());
        }
        raw
    }

    fn coerce_date(&self, kind: FieldKind, raw: Value) -> Value {
        let parsed = match raw {
            Value::DateTime(dt) => Ok(dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::default())),
            Value::Text(ref s) => parse_date_dayfirst(s),
            other => Err(DateCoercionFailure(other.to_string())),
        };

        match parsed {
            Ok(dt) if kind == FieldKind::Date => Value::Date(dt.date()),
            Ok(dt) => Value::DateTime(dt),
            Err(e) => {
                debug!(error = %e, "日期转换失败，置为空值");
                Value::Null
            }
        }
    }
}

/// 查询字段类型并转换
///
/// # 返回
/// - Err: 字段不存在（配置错误，直接向上传播）
pub fn coerce_field<S: RecordStore + ?Sized>(
    store: &S,
    entity_type: &str,
    field: &str,
    raw: Value,
) -> ImportResult<Value> {
    let kind = store.field_kind(entity_type, field)?;
    Ok(ValueCoercer.coerce(kind, raw))
}

/// 日在前优先的日期解析
fn parse_date_dayfirst(input: &str) -> Result<NaiveDateTime, DateCoercionFailure> {
    let value = input.trim();
    if value.is_empty() {
        return Err(DateCoercionFailure(input.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }

    DAY_FIRST_DATE_FORMATS
        .iter()
        .chain(MONTH_FIRST_DATE_FORMATS)
        .find_map(|fmt| parse_with_format(value, fmt))
        .ok_or_else(|| DateCoercionFailure(input.to_string()))
}

fn parse_with_format(value: &str, date_fmt: &str) -> Option<NaiveDateTime> {
    // %Y 会把两位年份解析成公元 1 世纪，交给 %y 格式处理
    let plausible = |dt: &NaiveDateTime| !date_fmt.contains("%Y") || dt.year() >= 100;

    if let Ok(date) = NaiveDate::parse_from_str(value, date_fmt) {
        let dt = date.and_time(NaiveTime::default());
        if plausible(&dt) {
            return Some(dt);
        }
    }
    TIME_SUFFIXES.iter().find_map(|suffix| {
        NaiveDateTime::parse_from_str(value, &format!("{}{}", date_fmt, suffix))
            .ok()
            .filter(|dt| plausible(dt))
    })
}
