use owo_colors::OwoColorize;
use snipnote_core::{ExtractionError, ExtractionResult};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "SnipNote".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Archive web articles as clean Markdown\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print an extraction failure as `error[<kind>]: <detail>`
pub fn print_extraction_error(err: &ExtractionError) {
    eprintln!("{} {}", format!("error[{}]:", err.kind()).red().bold(), err);
}

/// Print any other failure
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "error:".red().bold(), err);
}

/// Print timing information with color coding
pub fn print_timing(label: &str, duration: std::time::Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let timing = format!("{:>8.2}ms", ms);
    if ms < 500.0 {
        eprintln!("  {} {}", format!("{}:", label).dimmed(), timing.green());
    } else if ms < 3000.0 {
        eprintln!("  {} {}", format!("{}:", label).dimmed(), timing.bright_yellow());
    } else {
        eprintln!("  {} {}", format!("{}:", label).dimmed(), timing.bright_red());
    }
}

/// Print extraction details summary
pub fn print_extraction_details(result: &ExtractionResult) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    if !result.title.is_empty() {
        eprintln!("  {} {}", "Title:".dimmed(), result.title.bright_white());
    }
    if result.final_url != result.source_url {
        eprintln!("  {} {}", "Served from:".dimmed(), result.final_url.bright_white());
    }
    eprintln!(
        "  {} {}",
        "Body:".dimmed(),
        format_size(result.markdown.len()).bright_white()
    );
    eprintln!(
        "  {} {}\n",
        "Images:".dimmed(),
        result.images.len().to_string().bright_white()
    );
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
