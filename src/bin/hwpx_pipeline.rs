use clap::Parser;
use hwpx_automation::app::pipelines::automation_pipeline::{
    final_file_name, processed_file_name, INVOICE_FILE, SUMMARY_FILE, TERMS_FILE,
};
use hwpx_automation::core::ocr::default_engine;
use hwpx_automation::core::preflight::{run_preflight, PreflightOptions};
use hwpx_automation::domain::ports::ConfigProvider;
use hwpx_automation::utils::{logger, validation::Validate};
use hwpx_automation::{AutomationPipeline, EtlEngine, LocalStorage, TomlConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hwpx-pipeline")]
#[command(about = "Invoice to HWPX report automation driven by a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "hwpx-pipeline.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - check inputs and show what would be produced without writing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting HWPX pipeline");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No documents will be written");
        if !perform_dry_run(&config) {
            std::process::exit(1);
        }
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 設定中的路徑以工作目錄為起點
    let storage = LocalStorage::new(".".to_string());
    let pipeline = AutomationPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Pipeline completed successfully!");
            println!("✅ Pipeline completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("0.0.0")
    );
    if let Some(description) = &config.pipeline.description {
        println!("  Description: {}", description);
    }
    println!("  Invoice: {}", config.invoice_path().unwrap_or("(none)"));
    println!("  Template: {}", config.template_path());
    println!("  Reference: {}", config.reference_path().unwrap_or("(none)"));
    println!("  Inline terms: {}", config.inline_terms().len());
    if let Some(image) = config.image_path() {
        println!("  Image: {} at {}", image, config.image_target());
    }
    println!("  Output: {}", config.output_dir());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

/// 檢查輸入並列出預期的輸出；有檢查失敗時回傳 false
fn perform_dry_run(config: &TomlConfig) -> bool {
    println!("🔍 Dry Run Analysis:");
    println!();

    let mut documents = vec![PathBuf::from(config.template_path())];
    documents.extend(config.invoice_path().map(PathBuf::from));
    documents.extend(config.image_path().map(PathBuf::from));

    let options = PreflightOptions {
        require_ocr: false,
        reference: config.reference_path().map(PathBuf::from),
        documents,
        output_dir: Some(PathBuf::from(config.output_dir())),
        dry_run: true,
    };
    let ocr = default_engine();
    let report = run_preflight(&options, ocr.as_ref());

    println!("🩺 Checks:");
    for check in &report.checks {
        println!("  {} {}: {}", check.status.symbol(), check.name, check.detail);
    }

    let replace = config.replace_options();
    println!();
    println!("⚙️ Replacement:");
    println!("  Case sensitive: {}", replace.case_sensitive);
    println!("  Whole word only: {}", replace.whole_word_only);
    println!("  Regex: {}", replace.use_regex);
    match replace.max_replacements_per_term {
        Some(max) => println!("  Max per term: {}", max),
        None => println!("  Max per term: unlimited"),
    }

    let processed = processed_file_name(config.template_path(), config.output_name());

    println!();
    println!("💾 Expected outputs in {}:", config.output_dir());
    println!("  {}", processed);
    if config.image_path().is_some() {
        println!("  {}", final_file_name(&processed));
    }
    if config.invoice_path().is_some() {
        println!("  {}", INVOICE_FILE);
    }
    println!("  {}", TERMS_FILE);
    println!("  {}", SUMMARY_FILE);

    println!();
    if report.has_failures() {
        println!("❌ Dry run found problems; fix them before running.");
        false
    } else {
        println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
        true
    }
}
