//! # Config Rendering
//!
//! Renders gateway configuration templates and reindents the result so it can
//! be embedded as a block scalar inside the ConfigMap.
//!
//! Placeholders use the Go-template shape the gateway configs were written
//! with: `{{ .EtcdServiceFQDN }}` or `{{ EtcdServiceFQDN }}`. Substitution is a
//! flat key lookup; there are no conditionals, loops or pipelines.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{Result, ScaffoldError};

/// Substitution values keyed by placeholder name
pub type RenderValues = BTreeMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// A configuration template read from disk
///
/// Immutable once loaded; rendering borrows it.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    path: PathBuf,
    raw: String,
}

impl ConfigTemplate {
    /// Read a template from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path).map_err(|source| {
            ScaffoldError::TemplateNotFound {
                path: path.clone(),
                source,
            }
        })?;
        Ok(Self { path, raw })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names referenced by the template, sorted and deduplicated
    pub fn placeholders(&self) -> BTreeSet<&str> {
        PLACEHOLDER
            .captures_iter(&self.raw)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Substitute every placeholder with its value
    ///
    /// Fails with `RenderError` listing every key that has no value; nothing is
    /// partially rendered.
    pub fn render(&self, values: &RenderValues) -> Result<String> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|key| !values.contains_key(*key))
            .map(str::to_owned)
            .collect();

        if !missing.is_empty() {
            return Err(ScaffoldError::RenderError {
                path: self.path.clone(),
                missing,
            });
        }

        let rendered = PLACEHOLDER.replace_all(&self.raw, |caps: &Captures<'_>| {
            // Presence checked above.
            values.get(&caps[1]).cloned().unwrap_or_default()
        });

        debug!(path = %self.path.display(), "Rendered config template");
        Ok(rendered.into_owned())
    }
}

/// Read the template at `path` and render it with `values`
pub fn render(path: impl AsRef<Path>, values: &RenderValues) -> Result<String> {
    ConfigTemplate::load(path)?.render(values)
}

/// Prefix every line of `text` with `unit`
///
/// Lines are split on `\n` only, so an empty string is one empty line and comes
/// back as `unit` alone. A trailing newline likewise produces a final indented
/// empty line.
pub fn indent(text: &str, unit: &str) -> String {
    text.split('\n')
        .map(|line| format!("{unit}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove one `unit` prefix from every line of `text`
///
/// Returns `None` if any line does not start with `unit`.
pub fn strip_indent(text: &str, unit: &str) -> Option<String> {
    text.split('\n')
        .map(|line| line.strip_prefix(unit))
        .collect::<Option<Vec<_>>>()
        .map(|lines| lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const UNIT: &str = "    ";

    fn values(pairs: &[(&str, &str)]) -> RenderValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn template_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_indent_prefixes_every_line() {
        let text = "apisix:\n  node_listen: 9080\netcd:\n  host: x";
        let out = indent(text, UNIT);

        assert_eq!(out.lines().count(), text.lines().count());
        for (indented, original) in out.split('\n').zip(text.split('\n')) {
            assert_eq!(indented, format!("{UNIT}{original}"));
        }
    }

    #[test]
    fn test_indent_empty_text_is_one_indented_line() {
        assert_eq!(indent("", UNIT), UNIT);
    }

    #[test]
    fn test_indent_keeps_trailing_newline_as_indented_line() {
        assert_eq!(indent("a\n", UNIT), "    a\n    ");
    }

    #[test]
    fn test_strip_indent_recovers_original() {
        let text = "a\n  b\n\nc";
        assert_eq!(strip_indent(&indent(text, UNIT), UNIT).as_deref(), Some(text));
    }

    #[test]
    fn test_strip_indent_rejects_unindented_line() {
        assert_eq!(strip_indent("    a\nb", UNIT), None);
    }

    #[test]
    fn test_render_substitutes_both_placeholder_forms() {
        let file = template_file("etcd: {{ .EtcdHost }}\nport: {{Port}}\n");
        let out = render(
            file.path(),
            &values(&[("EtcdHost", "etcd.svc"), ("Port", "2379")]),
        )
        .unwrap();
        assert_eq!(out, "etcd: etcd.svc\nport: 2379\n");
    }

    #[test]
    fn test_render_without_placeholders_is_verbatim() {
        let file = template_file("plain: true\n");
        assert_eq!(render(file.path(), &RenderValues::new()).unwrap(), "plain: true\n");
    }

    #[test]
    fn test_render_reports_all_missing_keys() {
        let file = template_file("{{ .B }} {{ .A }} {{ .C }}");
        let err = render(file.path(), &values(&[("C", "c")])).unwrap_err();
        match err {
            ScaffoldError::RenderError { missing, .. } => assert_eq!(missing, vec!["A", "B"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_render_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(dir.path().join("nope.yaml"), &RenderValues::new()).unwrap_err();
        assert!(matches!(err, ScaffoldError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_render_then_double_indent_strips_to_single() {
        let file = template_file("apisix:\n  admin_key: {{ .Key }}\n");
        let rendered = render(file.path(), &values(&[("Key", "edd1c9f0")])).unwrap();

        let once = indent(&rendered, UNIT);
        let twice = indent(&once, UNIT);
        assert_eq!(strip_indent(&twice, UNIT).unwrap(), once);
    }
}
