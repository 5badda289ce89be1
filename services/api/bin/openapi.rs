//! Writes the Sikho OpenAPI document to disk.
//!
//! Usage: `openapi [OUTPUT]`, defaulting to `openapi.json`.

use sikho_api::router::ApiDoc;
use utoipa::OpenApi;

fn write_openapi(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = api_doc.to_pretty_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    write_openapi(ApiDoc::openapi(), &path)?;
    println!("OpenAPI document written to {path}");
    Ok(())
}
