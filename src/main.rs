// ==========================================
// 表格批量导入 - 命令行入口
// ==========================================
// 用法: sheet-bulk-import <FILE> --profile <JSON> [--db <PATH>] [--rebuild-index] [--dry-run]
// 日志输出到 stderr；导入报告输出到 stdout
// ==========================================

use clap::Parser;
use sheet_bulk_import::config::ImportProfile;
use sheet_bulk_import::i18n::{t, t_with_args};
use sheet_bulk_import::importer::ImportReport;
use sheet_bulk_import::repository::{
    MemoryRecordRepository, RecordRepositoryImpl, SqliteSearchIndex,
};
use sheet_bulk_import::{db, i18n, logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "sheet-bulk-import",
    version,
    about = "Map spreadsheet rows to records and reconcile them against a SQLite database."
)]
struct Cli {
    /// 表格文件 (.xlsx/.xlsm/.xlsb/.xls/.ods/.csv)
    file: PathBuf,

    /// 导入配置档（JSON）
    #[arg(long, value_name = "JSON")]
    profile: PathBuf,

    /// SQLite 数据库路径（缺省: 环境变量 SHEET_BULK_IMPORT_DB_PATH，再缺省: 用户数据目录）
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// 导入完成后重建搜索索引
    #[arg(long)]
    rebuild_index: bool,

    /// 试运行: 使用内存仓储，不写数据库
    #[arg(long)]
    dry_run: bool,

    /// 以 JSON 输出完整导入报告
    #[arg(long)]
    json: bool,

    /// 日志以 JSON 格式输出到 stderr
    #[arg(long)]
    log_json: bool,

    /// 界面语言 (zh-CN | en)
    #[arg(long, default_value = "zh-CN")]
    locale: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    i18n::set_locale(&cli.locale);

    tracing::info!("{}", t_with_args("cli.banner", &[("version", sheet_bulk_import::VERSION)]));

    match run(&cli) {
        Ok(report) => match print_report(&cli, &report) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", t_with_args("cli.import_failed", &[("error", e.to_string().as_str())]));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("{}", t_with_args("cli.import_failed", &[("error", format!("{:#}", e).as_str())]));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ImportReport> {
    if !cli.file.is_file() {
        let path = cli.file.display().to_string();
        anyhow::bail!(t_with_args("cli.file_not_found", &[("path", path.as_str())]));
    }
    let profile = ImportProfile::load(&cli.profile)?;

    if cli.dry_run {
        eprintln!("{}", t("cli.dry_run"));
        let store = MemoryRecordRepository::new(profile.entities.clone())?;
        let mut importer = profile.build_importer(store)?;
        return Ok(importer.process_file(&cli.file, false)?);
    }

    let db_path = db::resolve_db_path(cli.db.as_deref());
    tracing::info!("{}", t_with_args("cli.using_database", &[("path", db_path.as_str())]));

    let store = RecordRepositoryImpl::new(&db_path, profile.entities.clone())?;
    let indexer = SqliteSearchIndex::new(store.connection(), profile.entities.clone());
    let mut importer = profile
        .build_importer(store)?
        .with_search_indexer(Box::new(indexer));

    let rebuild = cli.rebuild_index || profile.settings.rebuild_search_index;
    Ok(importer.process_file(&cli.file, rebuild)?)
}

fn print_report(cli: &Cli, report: &ImportReport) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let rows = report.processed_rows().to_string();
    let created = report.created.to_string();
    let updated = report.updated.to_string();
    println!(
        "{}",
        t_with_args(
            "cli.import_done",
            &[
                ("sheet", report.sheet_name.as_str()),
                ("rows", rows.as_str()),
                ("created", created.as_str()),
                ("updated", updated.as_str()),
            ],
        )
    );

    let headers = report.skipped_header_rows.to_string();
    let blank = report.skipped_blank_rows.to_string();
    println!(
        "{}",
        t_with_args(
            "cli.skipped",
            &[("headers", headers.as_str()), ("blank", blank.as_str())],
        )
    );
    if report.search_index_rebuilt {
        println!("{}", t("cli.index_rebuilt"));
    }
    Ok(())
}
