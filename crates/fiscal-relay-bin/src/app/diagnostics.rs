use super::fetcher_config;
use anyhow::bail;
use fiscal_config::Config;
use fiscal_courier::{HttpJobFetcher, JobSource};
use fiscal_printer::HttpPrinterClient;

/// Printer address used when none is given.
pub const DEFAULT_PRINTER_IP: &str = "192.168.0.99";

/// Print a diagnostic receipt on the printer at `ip`.
pub async fn test_printer(ip: &str) -> anyhow::Result<()> {
    let report = HttpPrinterClient::new().self_test(ip).await;
    println!("{report}");
    if !report.success {
        bail!("printer self-test failed");
    }
    Ok(())
}

/// List pending jobs once. Nothing is sent to any printer.
pub async fn fetch_once(config: &Config) -> anyhow::Result<()> {
    let fetcher = HttpJobFetcher::new(fetcher_config(config))?;
    let batch = fetcher.fetch_pending().await?;

    if batch.is_empty() {
        println!("No pending print jobs");
        return Ok(());
    }

    println!("{} pending print job(s), batch {}", batch.len(), batch.id());
    for (index, job) in batch.jobs().iter().enumerate() {
        println!("\n[{}] {}", index + 1, job.target_url);
        println!("{}", job.unescaped_body());
    }
    Ok(())
}
