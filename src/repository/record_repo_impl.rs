// ==========================================
// 表格批量导入 - 记录 Repository 实现
// ==========================================
// 职责: 实现记录持久化（使用 rusqlite）
// 存储: 每个实体模式一张表，主键 id INTEGER PRIMARY KEY
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{configure_sqlite_connection, open_sqlite_connection, table_columns};
use crate::domain::{EntitySchema, FieldKind, Record, Value, PRIMARY_KEY_FIELD};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_repo::RecordStore;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 领域取值 → SQLite 取值（日期统一存为文本）
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// SQLite 取值 → 领域取值（按字段类型还原日期/布尔）
fn from_sql_value(value: ValueRef<'_>, kind: FieldKind) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if kind == FieldKind::Boolean => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes).to_string();
            match kind {
                FieldKind::Date => NaiveDate::parse_from_str(&text, DATE_FORMAT)
                    .map(Value::Date)
                    .unwrap_or(Value::Text(text)),
                FieldKind::DateTime => NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
                    .map(Value::DateTime)
                    .unwrap_or(Value::Text(text)),
                _ => Value::Text(text),
            }
        }
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

// ==========================================
// RecordRepositoryImpl
// ==========================================
pub struct RecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    schemas: HashMap<String, EntitySchema>,
}

impl RecordRepositoryImpl {
    /// 创建新的 Repository 实例（按实体模式建表/补列）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - schemas: 实体模式列表
    pub fn new(db_path: &str, schemas: Vec<EntitySchema>) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), schemas)
    }

    /// 从已有连接创建 Repository
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        schemas: Vec<EntitySchema>,
    ) -> RepositoryResult<Self> {
        let mut map = HashMap::new();
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            for schema in schemas {
                schema.validate().map_err(RepositoryError::InvalidSchema)?;
                Self::ensure_table(&guard, &schema)?;
                map.insert(schema.name.clone(), schema);
            }
        }

        Ok(Self { conn, schemas: map })
    }

    /// 共享连接（供搜索索引等同库组件复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 已注册的实体模式
    pub fn schemas(&self) -> Vec<EntitySchema> {
        let mut schemas: Vec<EntitySchema> = self.schemas.values().cloned().collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// 建表；表已存在时补齐缺失列
    fn ensure_table(conn: &Connection, schema: &EntitySchema) -> RepositoryResult<()> {
        let columns: Vec<String> = schema
            .fields
            .iter()
            .map(|f| format!("{} {}", quote(&f.name), f.kind.sql_type()))
            .collect();
        let mut ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT",
            quote(&schema.name)
        );
        for column in &columns {
            ddl.push_str(", ");
            ddl.push_str(column);
        }
        ddl.push(')');
        conn.execute_batch(&ddl)?;

        let existing = table_columns(conn, &schema.name)?;
        for field in &schema.fields {
            if !existing.iter().any(|c| c == &field.name) {
                info!(entity = %schema.name, field = %field.name, "补齐缺失列");
                conn.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote(&schema.name),
                    quote(&field.name),
                    field.kind.sql_type()
                ))?;
            }
        }
        Ok(())
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn select_sql(schema: &EntitySchema) -> String {
        let mut sql = String::from("SELECT id");
        for field in &schema.fields {
            sql.push_str(", ");
            sql.push_str(&quote(&field.name));
        }
        sql.push_str(" FROM ");
        sql.push_str(&quote(&schema.name));
        sql
    }

    fn map_row(schema: &EntitySchema, row: &Row<'_>) -> rusqlite::Result<Record> {
        let id: i64 = row.get(0)?;
        let mut fields = BTreeMap::new();
        for (idx, field) in schema.fields.iter().enumerate() {
            let value = from_sql_value(row.get_ref(idx + 1)?, field.kind);
            fields.insert(field.name.clone(), value);
        }
        Ok(Record::from_parts(schema.name.clone(), id, fields))
    }
}

impl RecordStore for RecordRepositoryImpl {
    fn schema(&self, entity_type: &str) -> RepositoryResult<&EntitySchema> {
        self.schemas
            .get(entity_type)
            .ok_or_else(|| RepositoryError::UnknownEntity(entity_type.to_string()))
    }

    fn find_one_by_field(
        &self,
        entity_type: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<Record>> {
        let schema = self.schema(entity_type)?;
        self.field_kind(entity_type, field)?;

        let column = if field == PRIMARY_KEY_FIELD {
            "id".to_string()
        } else {
            quote(field)
        };
        let sql = format!("{} WHERE {} = ?1 LIMIT 2", Self::select_sql(schema), column);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([to_sql_value(value)], |row| Self::map_row(schema, row))?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(entity = %entity_type, field = %field, hits = records.len(), "唯一查询");
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.into_iter().next()),
            _ => {
                // LIMIT 2 只用于判定多条，这里补查真实条数
                let count: i64 = conn.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                        quote(entity_type),
                        column
                    ),
                    [to_sql_value(value)],
                    |row| row.get(0),
                )?;
                Err(RepositoryError::MultipleMatches {
                    entity: entity_type.to_string(),
                    field: field.to_string(),
                    value: value.to_string(),
                    count: count as usize,
                })
            }
        }
    }

    fn save(&self, record: &mut Record) -> RepositoryResult<()> {
        let schema = self.schema(record.entity_type())?;
        let table = quote(&schema.name);
        let conn = self.lock()?;

        let mut columns: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(id) = record.id() {
            columns.push("id".to_string());
            values.push(SqlValue::Integer(id));
        }
        for field in &schema.fields {
            columns.push(quote(&field.name));
            values.push(to_sql_value(&record.value(&field.name)));
        }

        if columns.is_empty() {
            conn.execute(&format!("INSERT INTO {} DEFAULT VALUES", table), [])?;
        } else {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let mut sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            );
            if record.id().is_some() {
                // 指定主键：存在则更新（UPSERT，SQLite 3.24.0+）
                let updates: Vec<String> = schema
                    .fields
                    .iter()
                    .map(|f| format!("{0} = excluded.{0}", quote(&f.name)))
                    .collect();
                if updates.is_empty() {
                    sql.push_str(" ON CONFLICT(id) DO NOTHING");
                } else {
                    sql.push_str(" ON CONFLICT(id) DO UPDATE SET ");
                    sql.push_str(&updates.join(", "));
                }
            }
            conn.execute(&sql, params_from_iter(values))?;
        }

        if record.id().is_none() {
            record.set_id(Some(conn.last_insert_rowid()));
        }
        debug!(entity = %schema.name, id = ?record.id(), "记录已保存");
        Ok(())
    }

    fn count(&self, entity_type: &str) -> RepositoryResult<usize> {
        let schema = self.schema(entity_type)?;
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(&schema.name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list(&self, entity_type: &str) -> RepositoryResult<Vec<Record>> {
        let schema = self.schema(entity_type)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", Self::select_sql(schema)))?;
        let records = stmt
            .query_map([], |row| Self::map_row(schema, row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
