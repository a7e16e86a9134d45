use crate::auth::CryptoService;
use crate::cli::OutputFormat;

/// Print a fresh Fernet key for `FERNET_KEY`.
pub fn generate_key(output_format: &OutputFormat) -> anyhow::Result<()> {
    let key = CryptoService::generate_key();
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "fernet_key": key })),
        OutputFormat::Text => println!("{key}"),
    }
    Ok(())
}
