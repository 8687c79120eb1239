use std::collections::HashMap;
use std::fs;

use sentry_backtrace::current_stacktrace;
use sentry_core::protocol::{Frame, Stacktrace};

use crate::Severity;

const CAPTURE_FUNCTION: &str = "sentry_output::stacktrace::capture_stacktrace";

/// Controls when and how stack traces are attached to events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackTraceConfiguration {
    /// Whether stack traces are captured at all.
    pub enable: bool,
    /// The lowest severity at which a stack trace is captured.
    pub level: Severity,
    /// How many innermost frames to drop before the trace starts.
    ///
    /// Counted from the caller of the capture, so the first frames are
    /// `SentryOutput::write` and its internals. The default of 4 lines up
    /// with records coming through `OutputLogger`; a direct `write` call
    /// loses two frames of its callers as well.
    pub skip: usize,
    /// How many source lines around each frame to include.
    pub context: usize,
    /// Module prefixes that mark a frame as application code (`in_app`).
    pub in_app_prefixes: Vec<String>,
}

impl Default for StackTraceConfiguration {
    fn default() -> Self {
        Self {
            enable: false,
            level: Severity::Error,
            skip: 4,
            context: 0,
            in_app_prefixes: Vec::new(),
        }
    }
}

impl StackTraceConfiguration {
    /// Returns `true` if a record of the given severity gets a stack trace.
    pub fn applies_to(&self, severity: Severity) -> bool {
        self.enable && severity >= self.level
    }
}

/// Captures the stack of the calling thread.
///
/// Frames belonging to the capture itself are removed, then `skip` more
/// innermost frames are dropped. Returns `None` if no frames could be
/// resolved.
#[inline(never)]
pub fn capture_stacktrace(config: &StackTraceConfiguration) -> Option<Stacktrace> {
    let mut stacktrace = current_stacktrace()?;
    if let Some(cutoff) = stacktrace.frames.iter().rev().position(|frame| {
        frame
            .function
            .as_deref()
            .is_some_and(|func| func.starts_with(CAPTURE_FUNCTION))
    }) {
        let len = stacktrace.frames.len() - cutoff - 1;
        stacktrace.frames.truncate(len);
    }

    let keep = stacktrace.frames.len().saturating_sub(config.skip);
    stacktrace.frames.truncate(keep);

    let mut sources = SourceCache::default();
    for frame in &mut stacktrace.frames {
        frame.in_app = Some(is_in_app(frame, &config.in_app_prefixes));
        if config.context > 0 {
            sources.apply_context(frame, config.context);
        }
    }
    Some(stacktrace)
}

fn is_in_app(frame: &Frame, prefixes: &[String]) -> bool {
    let name = match frame.module.as_deref().or(frame.function.as_deref()) {
        Some(name) => name,
        None => return false,
    };
    prefixes
        .iter()
        .any(|prefix| function_starts_with(name, prefix))
}

/// Checks whether the function name starts with the given pattern, looking
/// through the `<...>` wrapping of trait implementations.
fn function_starts_with(func_name: &str, pattern: &str) -> bool {
    func_name
        .trim_start_matches('<')
        .trim_start_matches("_<")
        .starts_with(pattern.trim_start_matches('<'))
}

/// Source files read during one capture, keyed by path.
#[derive(Default)]
struct SourceCache {
    files: HashMap<String, Option<Vec<String>>>,
}

impl SourceCache {
    fn apply_context(&mut self, frame: &mut Frame, context: usize) {
        let (Some(path), Some(lineno)) = (
            frame.abs_path.as_ref().or(frame.filename.as_ref()),
            frame.lineno,
        ) else {
            return;
        };
        let Some(lines) = self
            .files
            .entry(path.clone())
            .or_insert_with(|| read_lines(path))
            .as_ref()
        else {
            return;
        };

        let lineno = lineno as usize;
        if lineno == 0 || lineno > lines.len() {
            return;
        }
        let idx = lineno - 1;
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(lines.len());

        frame.pre_context = lines[start..idx].to_vec();
        frame.context_line = Some(lines[idx].clone());
        frame.post_context = lines[idx + 1..end].to_vec();
    }
}

fn read_lines(path: &str) -> Option<Vec<String>> {
    fs::read_to_string(path)
        .ok()
        .map(|source| source.lines().map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(skip: usize) -> StackTraceConfiguration {
        StackTraceConfiguration {
            enable: true,
            level: Severity::Debug,
            skip,
            context: 0,
            in_app_prefixes: vec!["sentry_output::".into()],
        }
    }

    #[test]
    fn test_applies_to() {
        let mut config = StackTraceConfiguration {
            enable: true,
            level: Severity::Info,
            ..Default::default()
        };
        assert!(config.applies_to(Severity::Info));
        assert!(config.applies_to(Severity::Error));
        assert!(!config.applies_to(Severity::Debug));

        config.level = Severity::Error;
        assert!(!config.applies_to(Severity::Info));

        config.enable = false;
        assert!(!config.applies_to(Severity::Error));
    }

    #[test]
    fn test_capture_trims_own_frames() {
        let stacktrace = capture_stacktrace(&config(0)).unwrap();
        assert!(!stacktrace.frames.is_empty());
        assert!(stacktrace.frames.iter().all(|frame| !frame
            .function
            .as_deref()
            .unwrap_or_default()
            .starts_with(CAPTURE_FUNCTION)));
        assert!(stacktrace
            .frames
            .iter()
            .any(|frame| frame.in_app == Some(true)));
    }

    #[test]
    fn test_capture_skips_frames() {
        let full = capture_stacktrace(&config(0)).unwrap();
        let skipped = capture_stacktrace(&config(2)).unwrap();
        assert_eq!(full.frames.len(), skipped.frames.len() + 2);
    }

    #[test]
    fn test_in_app_prefixes() {
        let frame = Frame {
            function: Some("<myapp::db::Pool as core::ops::Drop>::drop".into()),
            ..Default::default()
        };
        assert!(is_in_app(&frame, &["myapp::".into()]));
        assert!(!is_in_app(&frame, &["core::".into()]));
        assert!(!is_in_app(&frame, &[]));
        assert!(!is_in_app(&Frame::default(), &["myapp::".into()]));
    }

    #[test]
    fn test_source_context() {
        let lineno = line!(); // context marker
        let mut frame = Frame {
            abs_path: Some(concat!(env!("CARGO_MANIFEST_DIR"), "/src/stacktrace.rs").into()),
            lineno: Some(lineno.into()),
            ..Default::default()
        };

        SourceCache::default().apply_context(&mut frame, 1);
        assert!(frame.context_line.unwrap().contains("context marker"));
        assert_eq!(frame.pre_context.len(), 1);
        assert!(frame.pre_context[0].contains("fn test_source_context"));
        assert_eq!(frame.post_context.len(), 1);
    }

    #[test]
    fn test_source_context_unreadable() {
        let mut frame = Frame {
            abs_path: Some("/nonexistent/file.rs".into()),
            lineno: Some(3),
            ..Default::default()
        };
        SourceCache::default().apply_context(&mut frame, 5);
        assert_eq!(frame.context_line, None);
        assert!(frame.pre_context.is_empty());
    }
}
