use crate::infra::{InMemoryMemberDirectory, StaticGeoLookup};
use clap::Args;
use member_intake::config::PipelineConfig;
use member_intake::error::AppError;
use member_intake::pipeline::{
    build_report, BatchProcessor, CsvRowSource, OutcomeCategory, RecordValidator, UploadJobId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// Path to the member-application spreadsheet (CSV)
    pub(crate) file: PathBuf,
    /// Print every row outcome instead of only the summary counts
    #[arg(long)]
    pub(crate) verbose: bool,
}

/// One-shot import: validate a file against an empty in-memory directory
/// and print the categorized outcome, without starting the HTTP service.
pub(crate) async fn run_ingest(args: IngestArgs) -> Result<(), AppError> {
    let config = PipelineConfig::from_env()?;
    let validator = RecordValidator::new(&config);
    let directory = Arc::new(InMemoryMemberDirectory::default());
    let geo = Arc::new(StaticGeoLookup::permissive());
    let processor = BatchProcessor::new(validator, directory, geo);

    let source = CsvRowSource::open(&args.file)?;
    let run = processor.process(Box::new(source)).await;
    let report = build_report(UploadJobId::generate(), &run.rows);

    println!("Processed {} rows from {}", run.rows.len(), args.file.display());
    for section in &report.sections {
        println!("- {}: {}", section.category.label(), section.rows.len());
    }

    if args.verbose {
        for section in &report.sections {
            if section.category == OutcomeCategory::Valid || section.rows.is_empty() {
                continue;
            }
            println!("\n{} rows", section.category.label());
            for row in &section.rows {
                let id = row.id_number.as_deref().unwrap_or("<missing ID>");
                println!("  row {} ({id}): {}", row.row, row.reasons.join("; "));
            }
        }
    }

    if let Some(cause) = run.failure {
        println!("\nUpload aborted before the end of the file: {cause}");
        println!("Counts above cover the rows processed before the failure.");
    }

    Ok(())
}
