use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fsbridge_transfer::HashAlgorithm;
use fsbridge_types::UploadFileItem;

#[derive(Debug, Parser)]
#[command(name = "fsbridge", version, about = "Chunked HTTP downloads and uploads")]
pub struct Cli {
    /// Id the job is registered under; shows up in every event
    #[arg(long, default_value_t = 1)]
    pub job_id: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download URL into DEST
    Download {
        url: String,
        dest: PathBuf,
        /// Request header, `Name: value`
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Minimum milliseconds between progress events
        #[arg(long, default_value_t = 0)]
        progress_interval: u64,
        /// Report progress only at multiples of this percentage
        #[arg(long, default_value_t = 0)]
        progress_divider: i32,
        /// Milliseconds, 0 waits forever
        #[arg(long)]
        connect_timeout: Option<u64>,
        /// Milliseconds, 0 waits forever
        #[arg(long)]
        read_timeout: Option<u64>,
        #[arg(long)]
        max_redirects: Option<u8>,
        /// Only print the result
        #[arg(short, long)]
        quiet: bool,
    },
    /// Upload local files to URL
    Upload {
        url: String,
        /// `field=path`, optionally `field=path;type=mime/type`
        #[arg(long = "file", value_parser = parse_file, required = true)]
        files: Vec<UploadFileItem>,
        /// Form field, `name=value`
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// HTTP verb, POST when omitted
        #[arg(long)]
        method: Option<String>,
        /// Send the files back to back with no multipart envelope
        #[arg(long)]
        binary: bool,
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print a file digest
    Hash {
        path: PathBuf,
        #[arg(long, default_value = "sha256")]
        algorithm: HashAlgorithm,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name missing in {:?}", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `name=value`, got {:?}", raw))?;
    Ok((name.to_string(), value.to_string()))
}

fn parse_file(raw: &str) -> Result<UploadFileItem, String> {
    let (spec, filetype) = match raw.split_once(";type=") {
        Some((spec, filetype)) => (spec, Some(filetype.to_string())),
        None => (raw, None),
    };
    let (field, path) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected `field=path`, got {:?}", raw))?;
    let path = PathBuf::from(path);
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("no file name in {:?}", raw))?
        .to_string();

    let mut item = UploadFileItem::new(field, filename, path);
    item.filetype = filetype;
    Ok(item)
}
