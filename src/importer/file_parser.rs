// ==========================================
// 表格批量导入 - 表格文件读取实现
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls/.ods) / CSV (.csv)
// 输出: 工作表 → 行优先的单元格网格（按位置对齐）
// ==========================================

use crate::domain::Value;
use crate::importer::bulk_importer_trait::SheetSource;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 超过该绝对值的整值浮点数不再转成整数
const MAX_EXACT_INTEGER_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Excel 单元格 → 领域取值
///
/// 说明: xlsx 中整数通常以浮点存储，整值浮点数还原为整数
pub fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER_FLOAT {
                Value::Int(*f as i64)
            } else {
                Value::Float(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                Value::Float(dt.as_f64())
            } else {
                dt.as_datetime()
                    .map(Value::DateTime)
                    .unwrap_or(Value::Float(dt.as_f64()))
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => {
            debug!(error = ?e, "单元格错误值，按空值处理");
            Value::Null
        }
    }
}

/// CSV 字段 → 领域取值（TRIM，空串视为空值）
fn csv_field_to_value(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Text(trimmed.to_string())
    }
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// Excel 工作簿
// ==========================================
pub struct ExcelWorkbook {
    workbook: Sheets<BufReader<File>>,
}

impl ExcelWorkbook {
    pub fn open<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        check_exists(path)?;
        let workbook = open_workbook_auto(path)?;
        Ok(Self { workbook })
    }
}

impl SheetSource for ExcelWorkbook {
    fn sheet_names(&mut self) -> ImportResult<Vec<String>> {
        Ok(self.workbook.sheet_names())
    }

    fn read_sheet(&mut self, name: &str) -> ImportResult<Vec<Vec<Value>>> {
        let range = self.workbook.worksheet_range(name)?;
        Ok(range
            .rows()
            .map(|row| row.iter().map(cell_to_value).collect())
            .collect())
    }
}

// ==========================================
// CSV 文件（视为只有一个工作表的工作簿）
// ==========================================
pub struct CsvWorkbook {
    path: PathBuf,
    sheet_name: String,
}

impl CsvWorkbook {
    pub fn open<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        check_exists(path)?;
        let sheet_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet1")
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            sheet_name,
        })
    }
}

impl SheetSource for CsvWorkbook {
    fn sheet_names(&mut self) -> ImportResult<Vec<String>> {
        Ok(vec![self.sheet_name.clone()])
    }

    fn read_sheet(&mut self, name: &str) -> ImportResult<Vec<Vec<Value>>> {
        if name != self.sheet_name {
            return Err(ImportError::ExcelParseError(format!("工作表不存在: {}", name)));
        }

        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头由导入驱动按配置行号读取
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(csv_field_to_value).collect());
        }
        Ok(rows)
    }
}

// ==========================================
// 内存工作簿（测试与程序化导入）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Vec<Vec<Value>>)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加工作表（构建器风格）
    pub fn sheet(mut self, name: impl Into<String>, rows: Vec<Vec<Value>>) -> Self {
        self.sheets.push((name.into(), rows));
        self
    }
}

impl SheetSource for MemoryWorkbook {
    fn sheet_names(&mut self) -> ImportResult<Vec<String>> {
        Ok(self.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_sheet(&mut self, name: &str) -> ImportResult<Vec<Vec<Value>>> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| ImportError::ExcelParseError(format!("工作表不存在: {}", name)))
    }
}

// ==========================================
// 通用打开入口（根据扩展名自动选择）
// ==========================================
pub fn open_spreadsheet<P: AsRef<Path>>(path: P) -> ImportResult<Box<dyn SheetSource>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => Ok(Box::new(CsvWorkbook::open(path)?)),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Box::new(ExcelWorkbook::open(path)?)),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}
