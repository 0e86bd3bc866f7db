// ==========================================
// 表格批量导入 - 搜索索引 Repository
// ==========================================
// 职责: 全量重建搜索索引（search_index 表）
// 来源: 各实体模式的文本类字段
// ==========================================

use crate::domain::EntitySchema;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::info;

// ==========================================
// SearchIndexer Trait
// ==========================================
// 用途: 导入完成后的全量索引重建（非交互）
// 实现者: SqliteSearchIndex
pub trait SearchIndexer: Send + Sync {
    /// 全量重建索引
    ///
    /// # 返回
    /// - Ok(usize): 索引条目数
    fn rebuild(&self) -> RepositoryResult<usize>;
}

// ==========================================
// SqliteSearchIndex
// ==========================================
pub struct SqliteSearchIndex {
    conn: Arc<Mutex<Connection>>,
    schemas: Vec<EntitySchema>,
}

impl SqliteSearchIndex {
    /// 创建索引器（与记录仓储共用连接）
    pub fn new(conn: Arc<Mutex<Connection>>, schemas: Vec<EntitySchema>) -> Self {
        Self { conn, schemas }
    }

    /// 按关键字检索（大小写不敏感的子串匹配）
    ///
    /// # 返回
    /// - Vec<(entity_type, record_id)>
    pub fn search(&self, term: &str) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        if !crate::db::table_exists(&conn, "search_index")? {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT entity_type, record_id FROM search_index
             WHERE lower(content) LIKE '%' || lower(?1) || '%'
             ORDER BY entity_type, record_id",
        )?;
        let hits = stmt
            .query_map(params![term], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }
}

impl SearchIndexer for SqliteSearchIndex {
    fn rebuild(&self) -> RepositoryResult<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS search_index (
                entity_type TEXT NOT NULL,
                record_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                PRIMARY KEY (entity_type, record_id)
            );
            DELETE FROM search_index;
            "#,
        )?;

        let mut total = 0;
        for schema in &self.schemas {
            let parts: Vec<String> = schema
                .text_fields()
                .map(|f| format!("COALESCE(\"{}\", '')", f.name))
                .collect();
            if parts.is_empty() {
                continue;
            }
            let sql = format!(
                "INSERT INTO search_index (entity_type, record_id, content)
                 SELECT ?1, id, trim({}) FROM \"{}\"",
                parts.join(" || ' ' || "),
                schema.name
            );
            total += tx.execute(&sql, params![schema.name])?;
        }

        tx.commit()?;
        info!(entries = total, "搜索索引重建完成");
        Ok(total)
    }
}
