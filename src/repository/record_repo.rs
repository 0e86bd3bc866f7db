// ==========================================
// 表格批量导入 - 记录 Repository Trait
// ==========================================
// 职责: 定义导入引擎所需的持久化接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{EntitySchema, FieldKind, Record, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 按实体类型提供字段元数据、唯一查询、新建与保存
// 实现者: RecordRepositoryImpl（rusqlite）, MemoryRecordRepository（内存）
pub trait RecordStore: Send + Sync {
    /// 获取实体模式
    ///
    /// # 返回
    /// - Err(UnknownEntity): 实体类型未注册
    fn schema(&self, entity_type: &str) -> RepositoryResult<&EntitySchema>;

    /// 按字段名获取字段语义类型
    ///
    /// # 返回
    /// - Err(UnknownField): 字段不存在（配置错误）
    fn field_kind(&self, entity_type: &str, field: &str) -> RepositoryResult<FieldKind> {
        self.schema(entity_type)?
            .field_kind(field)
            .ok_or_else(|| RepositoryError::UnknownField {
                entity: entity_type.to_string(),
                field: field.to_string(),
            })
    }

    /// 按字段相等查询唯一记录
    ///
    /// # 返回
    /// - Ok(None): 未找到
    /// - Ok(Some(record)): 恰好一条
    /// - Err(MultipleMatches): 命中多条
    fn find_one_by_field(
        &self,
        entity_type: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<Record>>;

    /// 构造空白未保存实例
    fn new_record(&self, entity_type: &str) -> RepositoryResult<Record> {
        self.schema(entity_type)?;
        Ok(Record::new(entity_type))
    }

    /// 保存实例（新实例保存后获得主键）
    fn save(&self, record: &mut Record) -> RepositoryResult<()>;

    /// 统计指定实体的记录数
    fn count(&self, entity_type: &str) -> RepositoryResult<usize>;

    /// 按主键顺序列出指定实体的全部记录
    fn list(&self, entity_type: &str) -> RepositoryResult<Vec<Record>>;
}
