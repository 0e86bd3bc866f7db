// ==========================================
// 表格批量导入 - 导入配置档
// ==========================================
// 格式: JSON（实体模式 + 映射 + 外键关联规则 + 导入参数）
// 职责: 读取配置档 → 校验 → 构建已注册映射的导入器
// ==========================================

use crate::config::import_settings::ImportSettings;
use crate::domain::{EntitySchema, MappingSpec, Record, PRIMARY_KEY_FIELD};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::row_processor::BulkImporter;
use crate::repository::RecordStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// 列 → 字段 绑定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub column: String,
    pub field: String,
}

/// 映射配置（JSON 形态）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingProfile {
    pub entity: String,
    #[serde(default)]
    pub columns: Vec<ColumnBinding>,
    #[serde(default)]
    pub unique_column: Option<String>,
    #[serde(default)]
    pub unique_field: Option<String>,
}

impl MappingProfile {
    /// 转为领域映射声明
    ///
    /// # 返回
    /// - Err(InvalidMapping): 有唯一列但缺少唯一字段
    pub fn to_spec(&self) -> ImportResult<MappingSpec> {
        let mut spec = self
            .columns
            .iter()
            .fold(MappingSpec::new(&self.entity), |spec, binding| {
                spec.column(&binding.column, &binding.field)
            });

        match (&self.unique_column, &self.unique_field) {
            (Some(column), Some(field)) => spec = spec.unique(column, field),
            (Some(column), None) => {
                return Err(ImportError::InvalidMapping(format!(
                    "实体 {} 指定了唯一列 '{}' 但缺少唯一字段",
                    self.entity, column
                )));
            }
            (None, Some(field)) => {
                warn!(entity = %self.entity, field = %field, "未指定唯一列，唯一字段被忽略");
            }
            (None, None) => {}
        }
        Ok(spec)
    }
}

// ==========================================
// ForeignKeyLink - 外键关联规则
// ==========================================
// 同一行内: records[child].field = records[parent].id
// parent/child 为映射下标；parent 必须先于 child 注册（child 保存前 parent 已有主键）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyLink {
    pub parent: usize,
    pub child: usize,
    pub field: String,
}

impl ForeignKeyLink {
    /// 在本行实体列表上应用（仅在 child 刚加入时生效）
    pub fn apply(&self, records: &mut [Record]) {
        if records.len() != self.child + 1 {
            return;
        }
        let parent_id = records[self.parent].value(PRIMARY_KEY_FIELD);
        records[self.child].set(&self.field, parent_id);
    }
}

// ==========================================
// ImportProfile - 导入配置档
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportProfile {
    #[serde(default)]
    pub entities: Vec<EntitySchema>,
    #[serde(default)]
    pub mappings: Vec<MappingProfile>,
    #[serde(default)]
    pub links: Vec<ForeignKeyLink>,
    #[serde(default)]
    pub settings: ImportSettings,
}

impl ImportProfile {
    /// 从 JSON 文件加载配置档
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let config_error = |message: String| ImportError::ConfigReadError {
            path: path.display().to_string(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let profile = Self::from_json(&content).map_err(|e| match e {
            ImportError::ConfigReadError { message, .. } => config_error(message),
            other => other,
        })?;

        info!(
            path = %path.display(),
            entities = profile.entities.len(),
            mappings = profile.mappings.len(),
            links = profile.links.len(),
            "导入配置档已加载"
        );
        Ok(profile)
    }

    /// 从 JSON 文本解析配置档
    pub fn from_json(content: &str) -> ImportResult<Self> {
        serde_json::from_str(content).map_err(|e| ImportError::ConfigReadError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// 全部映射声明（按配置顺序）
    pub fn to_mapping_specs(&self) -> ImportResult<Vec<MappingSpec>> {
        self.mappings.iter().map(MappingProfile::to_spec).collect()
    }

    fn validate_links(&self) -> ImportResult<()> {
        for link in &self.links {
            if link.child >= self.mappings.len() || link.parent >= link.child {
                return Err(ImportError::InvalidMapping(format!(
                    "外键关联规则非法: parent={} child={}（要求 parent < child < {}）",
                    link.parent,
                    link.child,
                    self.mappings.len()
                )));
            }
        }
        Ok(())
    }

    /// 构建导入器: 注册全部映射，并按外键规则注册关联函数
    ///
    /// # 返回
    /// - Err(UnknownEntity/UnknownField/InvalidMapping): 配置与实体模式不符
    pub fn build_importer<S: RecordStore>(&self, store: S) -> ImportResult<BulkImporter<S>> {
        let mut importer = BulkImporter::new(store).with_settings(self.settings.clone());
        for spec in self.to_mapping_specs()? {
            importer.add_mapping(spec)?;
        }

        if !self.links.is_empty() {
            self.validate_links()?;
            for link in &self.links {
                let child_entity = &self.mappings[link.child].entity;
                importer.store().field_kind(child_entity, &link.field)?;
            }

            let links = self.links.clone();
            importer.add_linking_function(move |records: &mut [Record]| {
                for link in &links {
                    link.apply(records);
                }
                Ok(())
            });
        }
        Ok(importer)
    }
}
