//! Provenance comments written at the top of generated files.

use serde::{Deserialize, Serialize};

/// Prepended to the generated JavaScript bundle.
pub const JS_BANNER: &str = "/**
 * This is a bundled file generated by obpack.
 * If you want to view the source, please visit the GitHub repo of this plugin.
 */
";

/// Prepended to the generated stylesheet.
pub const CSS_BANNER: &str = "/* *************************************************************************

This is a bundled file generated by obpack.
It will be available in Obsidian when the plugin is enabled.
If you want to view the source, please visit the GitHub repo of this plugin.

************************************************************************* */
";

/// Banner text for each output kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banners {
    pub js: String,
    pub css: String,
}

impl Default for Banners {
    fn default() -> Self {
        Self {
            js: JS_BANNER.to_string(),
            css: CSS_BANNER.to_string(),
        }
    }
}
