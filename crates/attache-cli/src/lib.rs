use attache_core::FileRecord;

/// Build the record a command-line reference stands for.
///
/// Anything with a `/` or a scheme is treated as a file URL, anything else as
/// a bare file name.
pub fn reference_record(reference: &str, is_private: bool, is_remote: bool) -> FileRecord {
    let record = if reference.contains('/') || reference.contains("://") {
        FileRecord::from_url(reference)
    } else {
        FileRecord::new(reference)
    };
    let record = record.private(is_private);
    if is_remote {
        record.remote()
    } else {
        record
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
