//! Template rendering for receiver fields.
//!
//! Receiver settings such as `summary` are handlebars strings rendered
//! against the alert payload. A template file adds named partials they can
//! pull in with `{{> name}}`.

use std::collections::BTreeMap;
use std::path::Path;

use handlebars::{handlebars_helper, no_escape, Handlebars};

use crate::alert::Data;

/// Failure loading the template file.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The file could not be read.
    #[error("failed to read template file {path}: {source}")]
    Io {
        /// Template file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a YAML map of name to template.
    #[error("failed to parse template file {path}: {source}")]
    Parse {
        /// Template file path.
        path: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// A partial did not compile.
    #[error("invalid template {name:?}: {source}")]
    Compile {
        /// Partial name.
        name: String,
        /// Underlying handlebars error.
        source: Box<handlebars::TemplateError>,
    },
}

/// A single failed render.
#[derive(Debug, thiserror::Error)]
#[error("failed to render template {template:?}: {source}")]
pub struct RenderFailure {
    /// The template source that failed.
    pub template: String,
    /// Underlying handlebars error.
    #[source]
    pub source: Box<handlebars::RenderError>,
}

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(join: |list: array, sep: str| {
    list.iter()
        .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
        .collect::<Vec<_>>()
        .join(sep)
});

/// Handlebars registry holding the shared partials and helpers.
pub struct Template {
    registry: Handlebars<'static>,
}

impl Template {
    /// A template with helpers but no partials.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.register_helper("upper", Box::new(upper));
        registry.register_helper("lower", Box::new(lower));
        registry.register_helper("join", Box::new(join));
        Self { registry }
    }

    /// Builds a template from `(name, source)` partials.
    ///
    /// # Errors
    ///
    /// Returns an error if a partial does not compile.
    pub fn from_partials<I, N, S>(partials: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut template = Self::new();
        for (name, source) in partials {
            let name = name.as_ref();
            template.registry.register_partial(name, source.as_ref()).map_err(|e| {
                TemplateError::Compile { name: name.to_string(), source: Box::new(e) }
            })?;
        }
        Ok(template)
    }

    /// Loads partials from a YAML file mapping names to template sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a partial
    /// does not compile.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|source| TemplateError::Io { path: display.clone(), source })?;
        let partials: BTreeMap<String, String> = serde_yaml::from_str(&content)
            .map_err(|source| TemplateError::Parse { path: display, source })?;
        Self::from_partials(partials)
    }

    /// Renders one template string against the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not compile or fails to render.
    pub fn execute(&self, template: &str, data: &Data) -> Result<String, RenderFailure> {
        if template.is_empty() {
            return Ok(String::new());
        }
        self.registry.render_template(template, data).map_err(|e| RenderFailure {
            template: template.to_string(),
            source: Box::new(e),
        })
    }

    /// Starts a batch of renders against one payload.
    #[must_use]
    pub fn batch<'a>(&'a self, data: &'a Data) -> RenderBatch<'a> {
        RenderBatch { template: self, data, first_error: None }
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders several strings and keeps the first failure.
///
/// Each `render` call returns a string so a payload can be assembled in one
/// pass; a failed render yields `""`. Call [`RenderBatch::finish`] before
/// using any of the results.
pub struct RenderBatch<'a> {
    template: &'a Template,
    data: &'a Data,
    first_error: Option<RenderFailure>,
}

impl RenderBatch<'_> {
    /// Renders `template`, recording the failure if this is the first one.
    pub fn render(&mut self, template: &str) -> String {
        match self.template.execute(template, self.data) {
            Ok(rendered) => rendered,
            Err(err) => {
                tracing::debug!(template, error = %err, "render failed");
                self.first_error.get_or_insert(err);
                String::new()
            }
        }
    }

    /// Reports the first failure of the batch, if any.
    ///
    /// # Errors
    ///
    /// Returns the first render failure.
    pub fn finish(self) -> Result<(), RenderFailure> {
        self.first_error.map_or(Ok(()), Err)
    }
}
