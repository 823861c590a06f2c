//! Layered request resolution: per-job fields win over CLI-level defaults,
//! which win over the built-in constants below. Output paths are derived
//! from an explicit path, an explicit base name, or a slug of the prompt.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-image-1.5";
pub const DEFAULT_SIZE: &str = "1024x1024";
pub const DEFAULT_QUALITY: &str = "high";
pub const DEFAULT_OUT_DIR: &str = "output/imagegen";

/// Derived slug filenames are cut to this many characters.
/// Explicit names, ids, and out paths are never truncated.
pub const MAX_SLUG_LEN: usize = 72;

/// A fully resolved request, ready to be sent to the image backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub quality: String,
    /// `None` means the field is left out of the API payload entirely,
    /// letting the remote service pick its own default.
    pub background: Option<String>,
}

/// CLI-level fallbacks applied to every job that does not override them.
#[derive(Debug, Clone)]
pub struct RequestDefaults {
    pub model: String,
    pub size: String,
    pub quality: String,
    pub background: Option<String>,
    pub out_dir: PathBuf,
    /// Explicit output path (`--out`), single-prompt mode only.
    pub out: Option<PathBuf>,
    /// Explicit base name (`--name`), single-prompt mode only.
    pub name: Option<String>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            size: DEFAULT_SIZE.into(),
            quality: DEFAULT_QUALITY.into(),
            background: None,
            out_dir: DEFAULT_OUT_DIR.into(),
            out: None,
            name: None,
        }
    }
}

/// One parsed line of the JSONL job source. Unknown fields are ignored,
/// a JSON `null` counts as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSpec {
    pub prompt: Option<String>,
    pub out: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub quality: Option<String>,
    pub background: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("missing prompt")]
    MissingPrompt,
}

impl JobSpec {
    /// The single-prompt invocation is a one-job batch with nothing but the
    /// prompt set at job level.
    pub fn prompt_only(prompt: String) -> Self {
        Self {
            prompt: Some(prompt),
            ..Self::default()
        }
    }

    /// Resolves the final request. A missing or empty prompt is an input
    /// error, reported before the backend is ever contacted.
    pub fn resolve_request(
        &self,
        defaults: &RequestDefaults,
    ) -> Result<GenerationRequest, ResolveError> {
        let prompt = self.prompt.as_deref().unwrap_or("");
        if prompt.is_empty() {
            return Err(ResolveError::MissingPrompt);
        }

        Ok(GenerationRequest {
            prompt: prompt.to_string(),
            model: pick(self.model.as_deref(), &defaults.model),
            size: pick(self.size.as_deref(), &defaults.size),
            quality: pick(self.quality.as_deref(), &defaults.quality),
            // Job layer wins over the CLI layer; a resolved empty string is
            // dropped so the payload omits the field instead of sending "".
            background: self
                .background
                .as_deref()
                .or(defaults.background.as_deref())
                .filter(|bg| !bg.is_empty())
                .map(str::to_string),
        })
    }

    /// Resolves where the image bytes go: explicit `out` path first, then
    /// the output directory joined with `id`, `name`, or a prompt slug.
    /// Empty strings count as absent, like missing keys.
    pub fn resolve_output(&self, defaults: &RequestDefaults) -> PathBuf {
        if let Some(out) = non_empty(&self.out) {
            return PathBuf::from(out);
        }
        if let Some(out) = &defaults.out {
            return out.clone();
        }

        let base = non_empty(&self.id)
            .or(non_empty(&self.name))
            .or(defaults.name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| truncated_slug(self.prompt.as_deref().unwrap_or("")));

        defaults.out_dir.join(format!("{base}.png"))
    }
}

fn pick(job: Option<&str>, cli: &str) -> String {
    job.unwrap_or(cli).to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single hyphen, and strips edge hyphens. An input with nothing usable
/// yields `"image"`. Idempotent.
pub fn slugify(value: &str) -> String {
    let mut slug = String::new();
    let mut pending_hyphen = false;

    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() { "image".into() } else { slug }
}

fn truncated_slug(prompt: &str) -> String {
    let mut slug = slugify(prompt);
    // Slugs are ASCII, so the byte index is a char boundary.
    slug.truncate(MAX_SLUG_LEN);
    slug
}

/// Creates the parent directory of `path` (and intermediates) if absent.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn slugify_collapses_and_lowercases() {
        expect![["hello-world"]].assert_eq(&slugify("Hello, World!"));
        expect![["a-cat"]].assert_eq(&slugify("a cat"));
        expect![["rusty-crab-2"]].assert_eq(&slugify("  Rusty__Crab  #2 "));
    }

    #[test]
    fn slugify_is_idempotent() {
        for input in ["Hello, World!", "a cat", "", "---", "héllo", "x  y"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn slugify_never_produces_edge_or_double_hyphens() {
        for input in ["", "!!!", "--a--b--", "héllo", " spaced out "] {
            let slug = slugify(input);
            assert!(!slug.is_empty());
            assert!(!slug.starts_with('-'));
            assert!(!slug.ends_with('-'));
            assert!(!slug.contains("--"));
        }
    }

    #[test]
    fn empty_input_slugs_to_image() {
        assert_eq!(slugify(""), "image");
        assert_eq!(slugify("  \t "), "image");
    }

    #[test]
    fn job_fields_win_over_cli_defaults() {
        let job = JobSpec {
            prompt: Some("a cat".into()),
            model: Some("job-model".into()),
            size: Some("512x512".into()),
            quality: Some("low".into()),
            background: Some("opaque".into()),
            ..JobSpec::default()
        };
        let defaults = RequestDefaults {
            background: Some("transparent".into()),
            ..RequestDefaults::default()
        };

        let request = job.resolve_request(&defaults).unwrap();
        assert_eq!(request.model, "job-model");
        assert_eq!(request.size, "512x512");
        assert_eq!(request.quality, "low");
        assert_eq!(request.background.as_deref(), Some("opaque"));
    }

    #[test]
    fn absent_fields_fall_back_to_cli_defaults() {
        let job = JobSpec::prompt_only("a cat".into());
        let defaults = RequestDefaults::default();

        let request = job.resolve_request(&defaults).unwrap();
        assert_eq!(request.model, DEFAULT_MODEL);
        assert_eq!(request.size, DEFAULT_SIZE);
        assert_eq!(request.quality, DEFAULT_QUALITY);
        assert_eq!(request.background, None);
    }

    #[test]
    fn empty_background_is_dropped_not_forwarded() {
        // Job-level "" overrides the CLI value, then the empty string is
        // omitted from the request rather than sent verbatim.
        let job = JobSpec {
            prompt: Some("a cat".into()),
            background: Some(String::new()),
            ..JobSpec::default()
        };
        let defaults = RequestDefaults {
            background: Some("transparent".into()),
            ..RequestDefaults::default()
        };

        let request = job.resolve_request(&defaults).unwrap();
        assert_eq!(request.background, None);
    }

    #[test]
    fn missing_or_empty_prompt_is_an_input_error() {
        let defaults = RequestDefaults::default();
        assert_eq!(
            JobSpec::default().resolve_request(&defaults),
            Err(ResolveError::MissingPrompt)
        );
        assert_eq!(
            JobSpec::prompt_only(String::new()).resolve_request(&defaults),
            Err(ResolveError::MissingPrompt)
        );
    }

    #[test]
    fn null_and_unknown_json_fields_are_tolerated() {
        let job: JobSpec =
            serde_json::from_str(r#"{"prompt": "ok", "background": null, "extra": 7}"#).unwrap();
        assert_eq!(job.prompt.as_deref(), Some("ok"));
        assert_eq!(job.background, None);
    }

    #[test]
    fn derived_name_is_the_truncated_prompt_slug() {
        let prompt = "x".repeat(100);
        let job = JobSpec::prompt_only(prompt.clone());
        let path = job.resolve_output(&RequestDefaults::default());

        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(stem.len(), MAX_SLUG_LEN);
        assert_eq!(stem, &slugify(&prompt)[..MAX_SLUG_LEN]);
        assert_eq!(path.extension().unwrap(), "png");
        assert!(path.starts_with(DEFAULT_OUT_DIR));
    }

    #[test]
    fn output_precedence_out_then_id_then_name_then_slug() {
        let defaults = RequestDefaults::default();

        let job = JobSpec {
            prompt: Some("a cat".into()),
            out: Some("custom/spot.png".into()),
            id: Some("id7".into()),
            name: Some("named".into()),
            ..JobSpec::default()
        };
        assert_eq!(job.resolve_output(&defaults), PathBuf::from("custom/spot.png"));

        let job = JobSpec { out: None, ..job };
        assert_eq!(
            job.resolve_output(&defaults),
            PathBuf::from(DEFAULT_OUT_DIR).join("id7.png")
        );

        let job = JobSpec { id: None, ..job };
        assert_eq!(
            job.resolve_output(&defaults),
            PathBuf::from(DEFAULT_OUT_DIR).join("named.png")
        );

        let job = JobSpec { name: None, ..job };
        assert_eq!(
            job.resolve_output(&defaults),
            PathBuf::from(DEFAULT_OUT_DIR).join("a-cat.png")
        );
    }

    #[test]
    fn empty_out_id_and_name_fall_through() {
        let defaults = RequestDefaults::default();
        let job = JobSpec {
            prompt: Some("a cat".into()),
            out: Some(String::new()),
            id: Some(String::new()),
            name: Some(String::new()),
            ..JobSpec::default()
        };
        assert_eq!(
            job.resolve_output(&defaults),
            PathBuf::from(DEFAULT_OUT_DIR).join("a-cat.png")
        );
    }

    #[test]
    fn explicit_names_are_never_truncated() {
        let long_id = "i".repeat(100);
        let job = JobSpec {
            prompt: Some("a cat".into()),
            id: Some(long_id.clone()),
            ..JobSpec::default()
        };
        let path = job.resolve_output(&RequestDefaults::default());
        assert_eq!(path.file_stem().unwrap().to_str().unwrap(), long_id);
    }

    #[test]
    fn cli_out_path_wins_in_single_prompt_mode() {
        let job = JobSpec::prompt_only("a cat".into());
        let defaults = RequestDefaults {
            out: Some("direct.png".into()),
            name: Some("ignored".into()),
            ..RequestDefaults::default()
        };
        assert_eq!(job.resolve_output(&defaults), PathBuf::from("direct.png"));
    }

    #[test]
    fn ensure_parent_is_idempotent() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("a/b/c.png");

        ensure_parent(&target)?;
        ensure_parent(&target)?;
        assert!(target.parent().unwrap().is_dir());

        // A bare filename has no parent to create.
        ensure_parent(Path::new("c.png"))?;
        Ok(())
    }
}
