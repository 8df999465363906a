use std::path::PathBuf;

/// Settings for transpiling and writing templates.
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    pub icon_helper: String,       // mustache helper rendered as `{% carbon_icon %}`
    pub icon_class_prefix: String, // prepended to class fragments built with `add`
    pub source_extension: String,
    pub target_extension: String,
    pub strict_partials: bool, // fail on partials that pass a whole context
    pub source_comment: bool,  // append the original template as a `{% comment %}`
    pub out_dir: Option<PathBuf>,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TranspileOptions {
    pub fn new() -> Self {
        TranspileOptions {
            icon_helper: "carbon-icon".to_string(),
            icon_class_prefix: "bx".to_string(),
            source_extension: "hbs".to_string(),
            target_extension: "html".to_string(),
            strict_partials: true,
            source_comment: true,
            out_dir: None,
        }
    }

    pub fn icon_helper(mut self, icon_helper: &str) -> Self {
        self.icon_helper = icon_helper.to_string();
        self
    }

    pub fn icon_class_prefix(mut self, prefix: &str) -> Self {
        self.icon_class_prefix = prefix.to_string();
        self
    }

    pub fn source_extension(mut self, extension: &str) -> Self {
        self.source_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn target_extension(mut self, extension: &str) -> Self {
        self.target_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn strict_partials(mut self, strict: bool) -> Self {
        self.strict_partials = strict;
        self
    }

    pub fn source_comment(mut self, source_comment: bool) -> Self {
        self.source_comment = source_comment;
        self
    }

    pub fn out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }
}
