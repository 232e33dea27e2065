use minijinja::Environment;
use suzu_core::alert::template::TemplateData;
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::port::TemplateRenderer;

/// # Summary
/// Template renderer backed by minijinja.
///
/// # Invariants
/// - Undefined variables render as empty strings (lenient mode).
pub struct JinjaRenderer {
    env: Environment<'static>,
}

impl JinjaRenderer {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }
}

impl Default for JinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for JinjaRenderer {
    fn render(&self, template: &str, data: &TemplateData) -> Result<String, NotifyError> {
        self.env
            .render_str(template, data)
            .map_err(|e| NotifyError::TemplateRenderFailed(e.to_string()))
    }
}
