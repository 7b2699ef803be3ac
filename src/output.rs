use crate::types::{FindReport, ManifestReport, Resolution, Warning};
use colored::*;
use serde::Serialize;
use std::io;

const BOX_TL: &str = "╭";
const BOX_TR: &str = "╮";
const BOX_BL: &str = "╰";
const BOX_BR: &str = "╯";
const BOX_H: &str = "─";
const BOX_V: &str = "│";
const BOX_LT: &str = "├";
const BOX_RT: &str = "┤";

const WIDTH: usize = 62;

pub struct TerminalRenderer {
    use_color: bool,
    verbose: bool,
}

impl TerminalRenderer {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    pub fn render_find(&self, report: &FindReport) {
        println!();
        self.print_box(
            &format!("  Project: {}", report.project_dir),
            &format!(
                "  Flavor: {}  │  Files: {}{}  │  Resolved: {}/{}",
                report.flavor,
                report.totals.project_files,
                if report.totals.from_cache { " (cached)" } else { "" },
                report.totals.resolved,
                report.totals.resolved + report.totals.unresolved
            ),
        );
        println!();

        for resolution in &report.resolutions {
            self.print_resolution(resolution);
        }

        if self.verbose && !report.warnings.is_empty() {
            println!();
            self.print_warnings(&report.warnings);
        }
        println!();
    }

    pub fn render_manifests(&self, reports: &[ManifestReport]) {
        println!();
        for report in reports {
            let status = if report.valid {
                format!("  valid  │  {} resources", report.resource_count)
            } else {
                "  invalid".to_string()
            };
            self.print_box(&format!("  Manifest: {}", report.manifest), &status);

            if !report.errors.is_empty() {
                for error in &report.errors {
                    println!("    {}", self.colorize(error, "red", false));
                }
            }

            let languages: Vec<String> = report
                .languages
                .iter()
                .map(|l| if l.is_empty() { "(default)".to_string() } else { l.clone() })
                .collect();
            if !languages.is_empty() {
                println!(
                    "    {} {}",
                    self.colorize("Languages:", "white", true),
                    languages.join(", ")
                );
            }

            if let Some(query) = &report.query {
                println!("    {} {}", self.colorize("Query:", "white", true), query);
                if report.matches.is_empty() {
                    println!("      {}", self.colorize("no match", "yellow", false));
                }
                for entry in &report.matches {
                    if entry.files.is_empty() {
                        println!("      {}", self.colorize(&entry.resource, "blue", true));
                        continue;
                    }
                    for file in &entry.files {
                        println!(
                            "      {} {} {}",
                            self.colorize(&entry.resource, "cyan", false),
                            self.colorize("→", "bright_black", false),
                            file
                        );
                    }
                }
            }
            println!();
        }
    }

    fn print_box(&self, title: &str, stats: &str) {
        // Top border
        println!(
            "  {}{}{}",
            self.colorize(BOX_TL, "bright_black", false),
            self.colorize(&BOX_H.repeat(WIDTH), "bright_black", false),
            self.colorize(BOX_TR, "bright_black", false)
        );

        let title_display = truncate_front(title, WIDTH - 2);
        println!(
            "  {} {}{} {}",
            self.colorize(BOX_V, "bright_black", false),
            self.colorize(&title_display, "cyan", true),
            " ".repeat(WIDTH.saturating_sub(title_display.chars().count() + 2)),
            self.colorize(BOX_V, "bright_black", false)
        );

        // Separator
        println!(
            "  {}{}{}",
            self.colorize(BOX_LT, "bright_black", false),
            self.colorize(&BOX_H.repeat(WIDTH), "bright_black", false),
            self.colorize(BOX_RT, "bright_black", false)
        );

        let stats_display = truncate_front(stats, WIDTH - 2);
        println!(
            "  {} {}{} {}",
            self.colorize(BOX_V, "bright_black", false),
            stats_display,
            " ".repeat(WIDTH.saturating_sub(stats_display.chars().count() + 2)),
            self.colorize(BOX_V, "bright_black", false)
        );

        // Bottom border
        println!(
            "  {}{}{}",
            self.colorize(BOX_BL, "bright_black", false),
            self.colorize(&BOX_H.repeat(WIDTH), "bright_black", false),
            self.colorize(BOX_BR, "bright_black", false)
        );
    }

    fn print_resolution(&self, resolution: &Resolution) {
        let (marker, color) = if resolution.success { ("✓", "green") } else { ("✗", "red") };
        println!(
            "  {} {}",
            self.colorize(marker, color, true),
            self.colorize(&resolution.reference, "white", true)
        );

        if !resolution.success {
            println!("      {}", self.colorize("not found in project", "bright_black", false));
            return;
        }

        for path in &resolution.paths {
            println!("      {} {}", self.colorize("→", "bright_black", false), self.colorize(path, color, false));
        }
        if self.verbose {
            if let Some(length) = resolution.match_length {
                println!(
                    "      {}",
                    self.colorize(&format!("matched {} trailing characters", length), "bright_black", false)
                );
            }
        }
    }

    fn print_warnings(&self, warnings: &[Warning]) {
        println!(
            "  {} {}",
            self.colorize("⚠", "yellow", true),
            self.colorize(&format!("Skipped {} paths while enumerating", warnings.len()), "yellow", true)
        );

        let display_count = warnings.len().min(5);
        for warning in warnings.iter().take(display_count) {
            println!(
                "    {} {}",
                self.colorize(&truncate_front(&warning.path, 40), "bright_black", false),
                self.colorize(&format!("({})", warning.error), "red", false)
            );
        }

        if warnings.len() > display_count {
            println!(
                "    {}",
                self.colorize(
                    &format!("... and {} more", warnings.len() - display_count),
                    "bright_black",
                    false
                )
            );
        }
    }

    fn colorize(&self, text: &str, color: &str, bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }

        let colored = match color {
            "red" => text.red(),
            "green" => text.green(),
            "yellow" => text.yellow(),
            "blue" => text.blue(),
            "cyan" => text.cyan(),
            "white" => text.white(),
            "bright_black" => text.bright_black(),
            _ => text.normal(),
        };

        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }
}

/// Keeps the tail of `text`, which is the informative end of a path.
fn truncate_front(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let skip = count - max_chars + 3;
    format!("...{}", text.chars().skip(skip).collect::<String>())
}

pub struct JsonRenderer;

impl JsonRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render<T: Serialize + ?Sized>(&self, results: &T, output_file: Option<&std::path::Path>) -> io::Result<()> {
        let json = serde_json::to_string_pretty(results)?;

        if let Some(path) = output_file {
            std::fs::write(path, json)?;
        } else {
            println!("{}", json);
        }

        Ok(())
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Totals;
    use tempfile::tempdir;

    #[test]
    fn test_truncate_front() {
        assert_eq!(truncate_front("short", 10), "short");
        assert_eq!(truncate_front("/very/long/path/main.qml", 12), ".../main.qml");
        assert_eq!(truncate_front("/very/long/path/main.qml", 12).chars().count(), 12);
    }

    #[test]
    fn test_json_to_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.json");
        let report = FindReport {
            project_dir: "/home/x/app".to_string(),
            flavor: "linux".to_string(),
            totals: Totals::default(),
            resolutions: vec![Resolution {
                reference: "/build/main.qml".to_string(),
                success: true,
                paths: vec!["/home/x/app/main.qml".to_string()],
                match_length: Some(9),
            }],
            warnings: vec![],
        };

        JsonRenderer::new().render(&report, Some(&out)).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["resolutions"][0]["paths"][0], "/home/x/app/main.qml");
        assert_eq!(value["resolutions"][0]["match_length"], 9);
    }

    #[test]
    fn test_unmatched_length_is_omitted() {
        let resolution = Resolution {
            reference: "x".to_string(),
            success: false,
            paths: vec!["x".to_string()],
            match_length: None,
        };
        let json = serde_json::to_string(&resolution).unwrap();
        assert!(!json.contains("match_length"));
    }
}
