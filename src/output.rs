//! CLI output formatting.
//!
//! Each command has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions are pure: no
//! I/O, no side effects.
//!
//! # Output Format
//!
//! ## Presets
//!
//! ```text
//! 001 Original [original]
//!     brightness=0 contrast=0 saturation=0 warmth=0 sharpness=0
//! 002 Ad Ready [adReady]
//!     brightness=10 contrast=20 saturation=25 warmth=5 sharpness=30
//! ```
//!
//! ## Apply
//!
//! ```text
//! mug.png
//!     Preset: Product
//!     Settings: brightness=15 contrast=15 saturation=20 warmth=-5 sharpness=40
//!     Output: mug-enhanced.jpg (640x480, 48213 bytes)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Enhancing 3 images
//!     001 mug.png → mug.jpg: enhanced
//!     002 lifestyle/sofa.png → lifestyle/sofa.jpg: cached
//!     003 broken.jpg: failed (Failed to decode image: ...)
//! ```

use crate::batch::{BatchEvent, BatchSummary, ImageStatus};
use crate::imaging::EncodedImage;
use crate::presets::PresetRegistry;
use crate::settings::{ImageSettings, Locale};
use crate::source::SourceRef;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// presets
// ============================================================================

pub fn format_presets(registry: &PresetRegistry, locale: Locale) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, preset) in registry.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}]",
            format_index(i + 1),
            preset.label.get(locale),
            preset.name.key()
        ));
        lines.push(format!("{}{}", indent(1), preset.settings));
    }
    lines
}

pub fn print_presets(registry: &PresetRegistry, locale: Locale) {
    for line in format_presets(registry, locale) {
        println!("{}", line);
    }
}

// ============================================================================
// apply
// ============================================================================

/// `preset` is the label of the exactly matching preset, if any.
/// `written` is `None` when the source could not be decoded.
pub fn format_apply(
    source: &SourceRef,
    preset: Option<&str>,
    settings: &ImageSettings,
    written: Option<(&Path, &EncodedImage)>,
) -> Vec<String> {
    let mut lines = vec![source.display_short()];
    lines.push(format!("{}Preset: {}", indent(1), preset.unwrap_or("custom")));
    lines.push(format!("{}Settings: {}", indent(1), settings));
    match written {
        Some((path, image)) => lines.push(format!(
            "{}Output: {} ({}x{}, {} bytes)",
            indent(1),
            path.display(),
            image.width,
            image.height,
            image.bytes.len()
        )),
        None => lines.push(format!(
            "{}Output: none (source could not be decoded, original kept)",
            indent(1)
        )),
    }
    lines
}

pub fn print_apply(
    source: &SourceRef,
    preset: Option<&str>,
    settings: &ImageSettings,
    written: Option<(&Path, &EncodedImage)>,
) {
    for line in format_apply(source, preset, settings, written) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

fn status_str(status: ImageStatus) -> &'static str {
    match status {
        ImageStatus::Cached => "cached",
        ImageStatus::Copied => "copied",
        ImageStatus::Enhanced => "enhanced",
    }
}

pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Enhancing {} {}", total, noun)]
        }
        BatchEvent::ImageDone {
            index,
            source_path,
            output_path,
            status,
        } => vec![format!(
            "{}{} {} \u{2192} {}: {}",
            indent(1),
            format_index(*index),
            source_path,
            output_path,
            status_str(*status)
        )],
        BatchEvent::ImageFailed {
            index,
            source_path,
            error,
        } => vec![format!(
            "{}{} {}: failed ({})",
            indent(1),
            format_index(*index),
            source_path,
            error
        )],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Done: {} written, {} failed",
        summary.outputs.len(),
        summary.failures.len()
    )];
    lines.push(format!("Cache: {}", summary.cache_stats));
    for failure in &summary.failures {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            failure.source_path,
            failure.error
        ));
    }
    lines
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchFailure, BatchOutput};
    use crate::cache::CacheStats;
    use std::path::PathBuf;

    #[test]
    fn presets_list_in_declaration_order() {
        let lines = format_presets(&PresetRegistry::standard(), Locale::Primary);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "001 Original [original]");
        assert_eq!(
            lines[1],
            "    brightness=0 contrast=0 saturation=0 warmth=0 sharpness=0"
        );
        assert_eq!(lines[2], "002 Ad Ready [adReady]");
        assert_eq!(
            lines[3],
            "    brightness=10 contrast=20 saturation=25 warmth=5 sharpness=30"
        );
    }

    #[test]
    fn presets_use_secondary_labels() {
        let lines = format_presets(&PresetRegistry::standard(), Locale::Secondary);
        assert_eq!(lines[0], "001 မူရင်း [original]");
    }

    #[test]
    fn apply_with_output() {
        let image = EncodedImage {
            bytes: vec![0; 1234],
            width: 640,
            height: 480,
        };
        let out = PathBuf::from("mug-enhanced.jpg");
        let lines = format_apply(
            &SourceRef::new("mug.png"),
            Some("Product"),
            &ImageSettings::new(15, 15, 20, -5, 40),
            Some((out.as_path(), &image)),
        );
        assert_eq!(
            lines,
            vec![
                "mug.png",
                "    Preset: Product",
                "    Settings: brightness=15 contrast=15 saturation=20 warmth=-5 sharpness=40",
                "    Output: mug-enhanced.jpg (640x480, 1234 bytes)",
            ]
        );
    }

    #[test]
    fn apply_custom_settings_and_fallback() {
        let lines = format_apply(
            &SourceRef::new("broken.jpg"),
            None,
            &ImageSettings::new(1, 2, 3, 4, 5),
            None,
        );
        assert_eq!(lines[1], "    Preset: custom");
        assert!(lines[3].contains("original kept"));
    }

    #[test]
    fn batch_events() {
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 1 }),
            vec!["Enhancing 1 image"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::ImageDone {
                index: 2,
                source_path: "lifestyle/sofa.png".into(),
                output_path: "lifestyle/sofa.jpg".into(),
                status: ImageStatus::Cached,
            }),
            vec!["    002 lifestyle/sofa.png \u{2192} lifestyle/sofa.jpg: cached"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::ImageFailed {
                index: 3,
                source_path: "broken.jpg".into(),
                error: "bad header".into(),
            }),
            vec!["    003 broken.jpg: failed (bad header)"]
        );
    }

    #[test]
    fn batch_summary_lists_failures() {
        let summary = BatchSummary {
            outputs: vec![BatchOutput {
                source_path: "a.png".into(),
                output_path: "a.jpg".into(),
                status: ImageStatus::Enhanced,
            }],
            failures: vec![BatchFailure {
                source_path: "b.jpg".into(),
                error: "bad header".into(),
            }],
            cache_stats: CacheStats {
                hits: 0,
                copies: 0,
                misses: 1,
            },
        };
        assert_eq!(
            format_batch_summary(&summary),
            vec![
                "Done: 1 written, 1 failed",
                "Cache: 1 enhanced",
                "    b.jpg: bad header",
            ]
        );
    }
}
