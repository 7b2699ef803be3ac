use indicatif::{ProgressBar, ProgressStyle};

pub struct ScanProgress {
    bar: ProgressBar,
    enabled: bool,
}

impl ScanProgress {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
                enabled: false,
            };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(style);
        }

        Self { bar, enabled: true }
    }

    pub fn update(&self, files: u64, current_path: &str) {
        if self.enabled {
            // Truncate path if too long
            let display_path = match current_path.char_indices().rev().nth(56) {
                Some((idx, _)) if current_path.chars().count() > 60 => format!("...{}", &current_path[idx..]),
                _ => current_path.to_string(),
            };

            self.bar.set_message(format!("{} project files | {}", files, display_path));
            self.bar.tick();
        }
    }

    pub fn finish(&self) {
        if self.enabled {
            self.bar.finish_and_clear();
        }
    }
}
