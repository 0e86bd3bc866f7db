// ==========================================
// 国际化 (i18n) - 命令行文案
// ==========================================
// 文案位于 locales/*.yml（zh-CN 默认，en 可选）
// 占位符写法: %{name}，由 t_with_args 替换
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 设置界面语言（不支持的语言代码回退到 zh-CN）
pub fn set_locale(locale: &str) {
    if SUPPORTED_LOCALES.contains(&locale) {
        rust_i18n::set_locale(locale);
    } else {
        tracing::warn!(locale, "不支持的语言，使用默认语言 zh-CN");
        rust_i18n::set_locale("zh-CN");
    }
}

/// 取文案（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 取文案并替换 %{name} 占位符
///
/// # 示例
/// ```no_run
/// use sheet_bulk_import::i18n::t_with_args;
/// let msg = t_with_args("cli.file_not_found", &[("path", "/tmp/people.xlsx")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(rust_i18n::t!(key).to_string(), |msg, (name, value)| {
            msg.replace(&format!("%{{{}}}", name), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为进程级全局状态，相关测试串行执行
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale_falls_back_to_default() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(&*rust_i18n::locale(), "en");

        set_locale("fr");
        assert_eq!(&*rust_i18n::locale(), "zh-CN");
    }

    #[test]
    fn test_dry_run_notice_in_both_locales() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("cli.dry_run"), "试运行模式: 结果不写入数据库");

        set_locale("en");
        assert_eq!(t("cli.dry_run"), "Dry run: nothing is written to the database");
        set_locale("zh-CN");
    }

    #[test]
    fn test_report_lines_fill_placeholders() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args(
            "cli.import_done",
            &[("sheet", "Names"), ("rows", "3"), ("created", "2"), ("updated", "1")],
        );
        assert_eq!(
            msg,
            "Import finished: sheet Names, 3 rows processed, 2 created, 1 updated"
        );

        set_locale("zh-CN");
        let msg = t_with_args("cli.file_not_found", &[("path", "/tmp/people.xlsx")]);
        assert_eq!(msg, "文件不存在: /tmp/people.xlsx");
    }
}
