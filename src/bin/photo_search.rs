use std::error::Error;

use clap::Parser;
use photo_chat_rs::{FilterDate, GooglePhotosService, PagedSearchClient, SearchFilter};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Search the Google Photos library and print each match's base URL.
///
/// Requires an OAuth access token with the photoslibrary.readonly scope in
/// GOOGLE_PHOTOS_ACCESS_TOKEN.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Content category to include (repeatable)
    #[arg(long = "category", default_value = "LANDSCAPES")]
    categories: Vec<String>,

    /// Items requested per page
    #[arg(long, default_value_t = 25)]
    page_size: u32,

    /// Stop paging once this many items are collected
    #[arg(long, default_value_t = 100)]
    max_items: u32,

    /// Range start, YYYY-MM-DD (requires --end)
    #[arg(long, value_parser = parse_date, requires = "end")]
    start: Option<FilterDate>,

    /// Range end, YYYY-MM-DD (requires --start)
    #[arg(long, value_parser = parse_date, requires = "start")]
    end: Option<FilterDate>,
}

fn parse_date(value: &str) -> Result<FilterDate, String> {
    let parts = value
        .split('-')
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid date '{value}': {err}"))?;

    match parts.as_slice() {
        [year, month, day] => Ok(FilterDate::new(*year, *month, *day)),
        _ => Err(format!("invalid date '{value}': expected YYYY-MM-DD")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut filters = SearchFilter::new().content_categories(args.categories.iter().cloned());
    if let (Some(start), Some(end)) = (args.start, args.end) {
        filters = filters.date_range(start, end);
    }

    let client = PagedSearchClient::new(GooglePhotosService::from_env()?);
    let items = client
        .search(&filters, args.page_size, args.max_items)
        .await?;

    info!(count = items.len(), "search complete");
    for item in &items {
        if let Some(url) = item.base_url() {
            println!("{url}");
        }
    }

    Ok(())
}
