//! Per-extension loaders that turn non-code files into JavaScript modules.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use obpack_config::Loader;
use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};

/// Loads files by extension according to a [`Loader`] table.
///
/// Every loader produces a module with a single default export.
#[derive(Debug, Clone)]
pub struct LoaderPlugin {
    /// Keys include the leading dot.
    loaders: BTreeMap<String, Loader>,
}

impl LoaderPlugin {
    pub fn new(loaders: BTreeMap<String, Loader>) -> Self {
        Self { loaders }
    }

    fn loader_for(&self, id: &str) -> Option<Loader> {
        let ext = Path::new(id).extension()?.to_str()?;
        self.loaders.get(&format!(".{ext}")).copied()
    }
}

impl Plugin for LoaderPlugin {
    fn name(&self) -> Cow<'static, str> {
        "obpack-loader".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let loader = self.loader_for(&id);

        async move {
            let Some(loader) = loader else {
                return Ok(None);
            };

            let bytes = std::fs::read(&id).with_context(|| format!("Failed to read {id}"))?;
            let code = render_module(loader, Path::new(&id), &bytes)
                .with_context(|| format!("Failed to load {id}"))?;

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

/// JavaScript source whose default export is `bytes` in the loader's form.
pub fn render_module(loader: Loader, path: &Path, bytes: &[u8]) -> anyhow::Result<String> {
    let value = match loader {
        Loader::DataUrl => format!(
            "data:{};base64,{}",
            mime_type(path),
            STANDARD.encode(bytes)
        ),
        Loader::Base64 => STANDARD.encode(bytes),
        Loader::Text => String::from_utf8(bytes.to_vec()).context("file is not valid UTF-8")?,
    };

    Ok(format!("export default {};\n", serde_json::to_string(&value)?))
}

/// Media type used in `data:` URLs, by extension.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("wasm") => "application/wasm",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;

    #[test]
    fn dataurl_svg() {
        let code = render_module(Loader::DataUrl, Path::new("icon.svg"), SVG).unwrap();
        assert!(code.starts_with("export default \"data:image/svg+xml;base64,"));
        assert!(code.contains(&STANDARD.encode(SVG)));
    }

    #[test]
    fn text_is_escaped() {
        let code = render_module(Loader::Text, Path::new("a.txt"), b"say \"hi\"\n").unwrap();
        assert_eq!(code, "export default \"say \\\"hi\\\"\\n\";\n");
    }

    #[test]
    fn text_rejects_binary() {
        assert!(render_module(Loader::Text, Path::new("a.bin"), &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn base64_has_no_prefix() {
        let code = render_module(Loader::Base64, Path::new("a.bin"), b"abc").unwrap();
        assert_eq!(code, "export default \"YWJj\";\n");
    }

    #[test]
    fn loader_lookup_by_extension() {
        let plugin = LoaderPlugin::new(BTreeMap::from([(".svg".to_string(), Loader::DataUrl)]));
        assert_eq!(plugin.loader_for("/src/icon.svg"), Some(Loader::DataUrl));
        assert_eq!(plugin.loader_for("/src/main.ts"), None);
        assert_eq!(plugin.loader_for("/src/Makefile"), None);
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type(Path::new("a.SVG")), "image/svg+xml");
        assert_eq!(mime_type(Path::new("a.woff2")), "font/woff2");
        assert_eq!(mime_type(Path::new("a")), "application/octet-stream");
    }
}
