use clap::Parser;
use hwpx_automation::config::{
    Command, DoctorArgs, ExtractArgs, InsertImageArgs, ReplaceArgs, SamplesArgs, TablesArgs,
    TermsArgs,
};
use hwpx_automation::core::image_inserter::ImageInserter;
use hwpx_automation::core::invoice::InvoiceExtractor;
use hwpx_automation::core::ocr::default_engine;
use hwpx_automation::core::preflight::{run_preflight, PreflightOptions};
use hwpx_automation::core::reference::{
    create_sample_files, default_terms, save_reference, ReferenceSource,
};
use hwpx_automation::core::terms::generate_terms;
use hwpx_automation::core::text_source::read_source_text;
use hwpx_automation::domain::model::ReplaceSummary;
use hwpx_automation::utils::logger;
use hwpx_automation::utils::validation::{validate_existing_dir, validate_existing_file, Validate};
use hwpx_automation::{AutomationError, CliConfig, HwpxProcessor, Result};
use std::path::{Path, PathBuf};

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.log_format);

    tracing::info!("🚀 Starting hwpx-automation");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證參數
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&config) {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
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

fn run(config: &CliConfig) -> Result<()> {
    match &config.command {
        Command::Extract(args) => extract(args),
        Command::Terms(args) => terms(args),
        Command::Replace(args) => replace(args, !config.verbose),
        Command::InsertImage(args) => insert_image(args),
        Command::Tables(args) => tables(args),
        Command::Samples(args) => samples(args),
        Command::Doctor(args) => doctor(args),
    }
}

fn require_file(field: &str, path: &Path) -> Result<()> {
    validate_existing_file(field, &path.to_string_lossy())
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}

fn extract(args: &ExtractArgs) -> Result<()> {
    let ocr = default_engine();
    let text = read_source_text(&args.input, ocr.as_ref())?;
    let report = InvoiceExtractor::new()?.extract_report(&text);

    let json = serde_json::to_string_pretty(&report)?;
    write_text(&args.output, &json)?;
    println!("{}", json);
    println!("📁 Output saved to: {}", args.output.display());

    match report.error {
        Some(error) if !report.success => Err(AutomationError::processing(error)),
        _ => Ok(()),
    }
}

fn terms(args: &TermsArgs) -> Result<()> {
    let ocr = default_engine();
    let text = read_source_text(&args.input, ocr.as_ref())?;
    let invoice = InvoiceExtractor::new()?.extract(&text)?;
    let terms = generate_terms(&invoice);

    save_reference(&terms, &args.output)?;
    println!("📋 {} terms:", terms.len());
    for (search, replacement) in terms.iter() {
        println!("  {} → {}", search, replacement);
    }
    println!("📁 Output saved to: {}", args.output.display());
    Ok(())
}

fn reference_source(path: &Path) -> ReferenceSource {
    if path.exists() {
        println!("📋 Reference data: {}", path.display());
        ReferenceSource::File(path.to_path_buf())
    } else {
        tracing::warn!("⚠️ Reference file not found: {}", path.display());
        println!("⚠️ Reference file not found: {}", path.display());
        println!("   Run `hwpx-automation samples` to create sample_terms.csv");
        println!("   Using the built-in default terms.");
        ReferenceSource::Table(default_terms())
    }
}

fn print_summary(summary: &ReplaceSummary, name: &str) {
    if !summary.success {
        println!("❌ {} failed", name);
        println!("   Error: {}", summary.error.as_deref().unwrap_or("unknown error"));
        return;
    }

    println!("✅ {} processed", name);
    if summary.preview_only {
        let matches: usize = summary.replacements.iter().filter_map(|r| r.matches).sum();
        println!("   🔍 Preview: {} matches", matches);
    } else {
        println!("   📊 {} replacements", summary.total_replacements);
    }
    println!("   ⏱️  {:.2}s", summary.processing_time);

    for record in summary.replacements.iter().take(10) {
        let count = record.count.or(record.matches).unwrap_or_default();
        println!(
            "      '{}' → '{}' ({})",
            record.search_term, record.replacement_term, count
        );
    }
    if summary.replacements.len() > 10 {
        println!("      ... and {} more", summary.replacements.len() - 10);
    }

    if let Some(output) = &summary.output_file {
        println!("   📄 Output: {}", output);
    }
    if let Some(error) = &summary.output_error {
        println!("   ⚠️ Output not written: {}", error);
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_processed.hwpx", stem))
}

fn replace(args: &ReplaceArgs, show_progress: bool) -> Result<()> {
    let processor = HwpxProcessor::new(show_progress);
    let source = reference_source(&args.reference);
    let options = args.options();

    if let Some(folder) = &args.batch {
        validate_existing_dir("batch", &folder.to_string_lossy())?;
        println!("📁 Batch processing: {}", folder.display());
        let batch = processor.batch_process_folder(
            folder,
            &source,
            Some(&args.output_dir),
            &args.pattern,
            &options,
        )?;

        let stats = &batch.processing_stats;
        println!();
        println!("📊 Batch complete!");
        println!("   Succeeded: {}/{}", stats.files_successful, stats.files_processed);
        println!("   Replacements: {}", stats.total_replacements);
        println!("   Output folder: {}", args.output_dir.display());
        return Ok(());
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| AutomationError::MissingConfigError {
            field: "input".to_string(),
        })?;
    require_file("input", input)?;
    if !input
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("hwpx"))
    {
        println!("⚠️ {} may not be an HWPX file", input.display());
    }

    let output = args.output.clone().unwrap_or_else(|| default_output(input));
    let summary = processor.search_and_replace(input, &source, Some(&output), &options);

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    print_summary(&summary, &name);

    match summary.error {
        Some(error) => Err(AutomationError::processing(error)),
        None => Ok(()),
    }
}

fn insert_image(args: &InsertImageArgs) -> Result<()> {
    require_file("input", &args.input)?;
    require_file("image", &args.image)?;

    let result = ImageInserter::new().insert_image_to_table(
        &args.input,
        &args.image,
        &args.output,
        args.position(),
        &args.image_options(),
    )?;

    println!();
    println!("✅ Image inserted!");
    println!("   Input: {}", result.input_file);
    println!("   Output: {}", result.output_file);
    println!("   Position: {}", result.position);
    println!("   Size: {}", result.image_size);
    Ok(())
}

fn tables(args: &TablesArgs) -> Result<()> {
    let layouts = ImageInserter::new().list_tables(&args.input)?;

    println!("📋 Tables in {}:", args.input.display());
    for layout in &layouts {
        println!(
            "  Table {} ({}): {} rows",
            layout.index,
            layout.section,
            layout.rows.len()
        );
        for (row, cells) in layout.rows.iter().enumerate() {
            println!("    Row {}: {} cells", row, cells);
        }
    }
    println!("Total: {} tables", layouts.len());
    Ok(())
}

fn samples(args: &SamplesArgs) -> Result<()> {
    let files = create_sample_files(&args.dir)?;
    println!("📁 Sample reference files created:");
    for file in files {
        println!("  - {}", file.display());
    }
    Ok(())
}

fn doctor(args: &DoctorArgs) -> Result<()> {
    let options = PreflightOptions {
        require_ocr: args.require_ocr,
        reference: args.reference.clone(),
        documents: args.documents.clone(),
        output_dir: args.output_dir.clone(),
        dry_run: false,
    };
    let ocr = default_engine();
    let report = run_preflight(&options, ocr.as_ref());
    report.log();

    for check in &report.checks {
        println!("{} {}: {}", check.status.symbol(), check.name, check.detail);
    }
    if report.has_failures() {
        return Err(AutomationError::validation("one or more preflight checks failed"));
    }
    println!(
        "✅ Ready ({} warning{})",
        report.warnings(),
        if report.warnings() == 1 { "" } else { "s" }
    );
    Ok(())
}
