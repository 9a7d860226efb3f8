//! Rolldown plugin for Vue single-file components.
//!
//! ```text
//! App.vue --load--> JS/TS module ----import----> obpack-vue-style:0:/abs/App.vue
//!                   (scripts + template)          --load--> CSS module
//! ```
//!
//! Scripts are combined with `<script setup>` first. There is no template
//! compiler: the raw template is attached as the component's `template`
//! option and compiled by the Vue runtime at load time. A script without an
//! `export default` (the usual `<script setup>` component) gets a plain
//! options object as its default export. Every `<style>` block becomes a
//! virtual CSS module imported by the component, so component styles end up
//! in the entry's stylesheet next to the bundle. Style contents are captured
//! when the component loads, so a style module always matches the
//! component that imported it.

pub mod sfc;

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use memchr::memmem;
use rolldown_common::{ModuleType, ResolvedExternal};
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use sfc::{ScriptBlock, SfcDescriptor, StyleBlock};

/// Specifier prefix of style blocks imported by a compiled component.
pub const STYLE_SPECIFIER_PREFIX: &str = "obpack-vue-style:";

/// Resolved ids of style modules carry rolldown's virtual-module marker.
const STYLE_ID_PREFIX: &str = "\0obpack-vue-style:";

const COMPONENT_BINDING: &str = "__obpack_component__";

#[derive(Debug, Clone, Default)]
pub struct VueSfcPlugin {
    /// Style block contents keyed by `"<index>:<component path>"`.
    styles: Arc<DashMap<String, String>>,
}

impl VueSfcPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the component at `id` and remember its style blocks.
    fn load_component(&self, id: &str) -> anyhow::Result<(String, ModuleType)> {
        let source =
            std::fs::read_to_string(id).with_context(|| format!("Failed to read Vue file: {id}"))?;
        let descriptor =
            sfc::parse(&source).with_context(|| format!("Failed to parse Vue file: {id}"))?;

        check_styles(&descriptor.styles)
            .with_context(|| format!("Unsupported style block in {id}"))?;

        let compiled = compile_component(id, &descriptor)?;
        for (index, style) in descriptor.styles.iter().enumerate() {
            self.styles
                .insert(format!("{index}:{id}"), style.content.to_string());
        }
        tracing::trace!(id = %id, styles = descriptor.styles.len(), "loaded component");

        Ok(compiled)
    }

    /// CSS for a style id without the prefix.
    ///
    /// Served from what the component load captured; a style imported
    /// without its component is read from disk.
    fn load_style(&self, key: &str) -> anyhow::Result<String> {
        if let Some(content) = self.styles.get(key) {
            return Ok(content.value().clone());
        }

        let (index, path) =
            parse_style_id(key).with_context(|| format!("Malformed component style id: {key}"))?;
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Vue file: {path}"))?;
        let descriptor =
            sfc::parse(&source).with_context(|| format!("Failed to parse Vue file: {path}"))?;
        let style = descriptor
            .styles
            .get(index)
            .with_context(|| format!("Vue file {path} has no style block #{index}"))?;

        Ok(style.content.to_string())
    }
}

impl Plugin for VueSfcPlugin {
    fn name(&self) -> Cow<'static, str> {
        "obpack-vue".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();

        async move {
            if !specifier.starts_with(STYLE_SPECIFIER_PREFIX) {
                return Ok(None);
            }

            Ok(Some(HookResolveIdOutput {
                id: format!("\0{specifier}").into(),
                external: Some(ResolvedExternal::Bool(false)),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let plugin = self.clone();

        async move {
            if let Some(key) = id.strip_prefix(STYLE_ID_PREFIX) {
                let css = plugin.load_style(key)?;
                return Ok(Some(HookLoadOutput {
                    code: css.into(),
                    module_type: Some(ModuleType::Css),
                    ..Default::default()
                }));
            }

            if !id.ends_with(".vue") {
                return Ok(None);
            }

            let (code, module_type) = plugin.load_component(&id)?;

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(module_type),
                ..Default::default()
            }))
        }
    }
}

/// `"<index>:<path>"` -> `(index, path)`.
fn parse_style_id(rest: &str) -> Option<(usize, &str)> {
    let (index, path) = rest.split_once(':')?;
    Some((index.parse().ok()?, path))
}

fn check_styles(styles: &[StyleBlock<'_>]) -> anyhow::Result<()> {
    for style in styles {
        if style.lang != "css" {
            anyhow::bail!(
                "<style lang=\"{}\"> needs a preprocessor; only plain CSS is bundled",
                style.lang
            );
        }
        if style.scoped {
            tracing::debug!("scoped component styles are bundled unscoped");
        }
    }
    Ok(())
}

/// Produce the module that stands in for a component.
fn compile_component(id: &str, descriptor: &SfcDescriptor<'_>) -> anyhow::Result<(String, ModuleType)> {
    let mut code = String::new();

    for index in 0..descriptor.styles.len() {
        let specifier = serde_json::to_string(&format!("{STYLE_SPECIFIER_PREFIX}{index}:{id}"))?;
        code.push_str(&format!("import {specifier};\n"));
    }

    if descriptor.scripts.is_empty() {
        match descriptor.template {
            Some(template) => {
                let template = serde_json::to_string(template)?;
                code.push_str(&format!("export default {{ template: {template} }};\n"));
            }
            None => code.push_str("export default {};\n"),
        }
        return Ok((code, ModuleType::Js));
    }

    let (script, module_type) = combine_scripts(&descriptor.scripts);

    match (descriptor.template, find_default_export(&script)) {
        (Some(template), Some(export)) => {
            code.push_str(&script[..export.start]);
            code.push_str(&format!("const {COMPONENT_BINDING} ="));
            code.push_str(&script[export.end..]);
            let template = serde_json::to_string(template)?;
            code.push_str(&format!(
                "\n;{COMPONENT_BINDING}.template = {template};\nexport default {COMPONENT_BINDING};\n"
            ));
        }
        (None, Some(_)) => code.push_str(&script),
        (Some(template), None) => {
            let template = serde_json::to_string(template)?;
            code.push_str(&script);
            code.push_str(&format!("\nexport default {{ template: {template} }};\n"));
        }
        (None, None) => {
            code.push_str(&script);
            code.push_str("\nexport default {};\n");
        }
    }

    Ok((code, module_type))
}

/// Span of the first `export default` in code, ignoring comments and
/// string literals.
///
/// Regex literals are not recognised; a quote inside one can hide a later
/// export.
fn find_default_export(script: &str) -> Option<Range<usize>> {
    let bytes = script.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = memchr::memchr(b'\n', &bytes[i..]).map_or(bytes.len(), |n| i + n + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = memmem::find(&bytes[i + 2..], b"*/").map_or(bytes.len(), |n| i + n + 4);
            }
            quote @ (b'"' | b'\'' | b'`') => i = skip_string(bytes, i + 1, quote),
            b'e' if i == 0 || (!is_ident_byte(bytes[i - 1]) && bytes[i - 1] != b'.') => {
                match match_default_export(bytes, i) {
                    Some(end) => return Some(i..end),
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }

    None
}

/// End of `export <whitespace> default` starting at `start`.
fn match_default_export(bytes: &[u8], start: usize) -> Option<usize> {
    let rest = bytes[start..].strip_prefix(b"export")?;
    let gap = rest.iter().take_while(|b| b.is_ascii_whitespace()).count();
    if gap == 0 {
        return None;
    }
    let after = rest[gap..].strip_prefix(b"default")?;
    if after.first().is_some_and(|&b| is_ident_byte(b)) {
        return None;
    }
    Some(bytes.len() - after.len())
}

/// Index just past the closing `quote`, honouring backslash escapes.
fn skip_string(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            // Unterminated single-line string; resume on the next line.
            b'\n' if quote != b'`' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Combine script blocks, `<script setup>` first, with the strongest language.
fn combine_scripts(scripts: &[ScriptBlock<'_>]) -> (String, ModuleType) {
    if let [script] = scripts {
        return (script.content.to_string(), determine_module_type(script.lang));
    }

    let setup = scripts.iter().find(|s| s.setup);
    let regular = scripts.iter().find(|s| !s.setup);

    let mut combined = String::new();
    let mut lang = "js";

    if let Some(setup) = setup {
        combined.push_str(setup.content);
        lang = setup.lang;
    }

    if let Some(regular) = regular {
        if !combined.is_empty() {
            combined.push_str("\n\n");
        }
        combined.push_str(regular.content);
        lang = choose_stronger_lang(lang, regular.lang);
    }

    (combined, determine_module_type(lang))
}

fn determine_module_type(lang: &str) -> ModuleType {
    match lang {
        "ts" | "typescript" => ModuleType::Ts,
        "jsx" => ModuleType::Jsx,
        "tsx" => ModuleType::Tsx,
        _ => ModuleType::Js,
    }
}

/// tsx > jsx > ts > js
fn choose_stronger_lang<'a>(a: &'a str, b: &'a str) -> &'a str {
    let strength = |lang: &str| match lang {
        "tsx" => 4,
        "jsx" => 3,
        "ts" | "typescript" => 2,
        _ => 1,
    };

    if strength(a) >= strength(b) { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script<'a>(content: &'a str, lang: &'a str, setup: bool) -> ScriptBlock<'a> {
        ScriptBlock {
            content,
            lang,
            setup,
        }
    }

    #[test]
    fn plugin_name() {
        assert_eq!(VueSfcPlugin::new().name(), "obpack-vue");
    }

    #[test]
    fn module_types() {
        assert!(matches!(determine_module_type("js"), ModuleType::Js));
        assert!(matches!(determine_module_type("ts"), ModuleType::Ts));
        assert!(matches!(determine_module_type("typescript"), ModuleType::Ts));
        assert!(matches!(determine_module_type("jsx"), ModuleType::Jsx));
        assert!(matches!(determine_module_type("tsx"), ModuleType::Tsx));
    }

    #[test]
    fn stronger_lang_wins() {
        assert_eq!(choose_stronger_lang("js", "ts"), "ts");
        assert_eq!(choose_stronger_lang("tsx", "ts"), "tsx");
        assert_eq!(choose_stronger_lang("jsx", "js"), "jsx");
    }

    #[test]
    fn setup_script_comes_first() {
        let scripts = [
            script("export default {}", "js", false),
            script("const count = ref(0)", "ts", true),
        ];
        let (code, module_type) = combine_scripts(&scripts);
        assert!(code.starts_with("const count = ref(0)"));
        assert!(code.ends_with("export default {}"));
        assert!(matches!(module_type, ModuleType::Ts));
    }

    #[test]
    fn template_is_attached_to_default_export() {
        let descriptor = SfcDescriptor {
            scripts: vec![script("export default { name: \"Hello\" }", "js", false)],
            template: Some("<p class=\"x\">{{ name }}</p>"),
            styles: vec![],
        };
        let (code, _) = compile_component("/src/Hello.vue", &descriptor).unwrap();
        assert!(code.contains("const __obpack_component__ = { name: \"Hello\" }"));
        assert!(code.contains(r#"__obpack_component__.template = "<p class=\"x\">{{ name }}</p>";"#));
        assert!(code.trim_end().ends_with("export default __obpack_component__;"));
    }

    #[test]
    fn setup_only_component_gets_default_export() {
        let descriptor = SfcDescriptor {
            scripts: vec![script("const a = 1;", "ts", true)],
            template: Some("<p>{{ a }}</p>"),
            styles: vec![],
        };
        let (code, module_type) = compile_component("/src/A.vue", &descriptor).unwrap();
        assert!(code.starts_with("const a = 1;"));
        assert!(code.trim_end().ends_with(r#"export default { template: "<p>{{ a }}</p>" };"#));
        assert!(matches!(module_type, ModuleType::Ts));
    }

    #[test]
    fn script_without_template_or_export_gets_empty_default() {
        let descriptor = SfcDescriptor {
            scripts: vec![script("console.log(1);", "js", false)],
            template: None,
            styles: vec![],
        };
        let (code, _) = compile_component("/src/A.vue", &descriptor).unwrap();
        assert_eq!(code, "console.log(1);\nexport default {};\n");
    }

    #[test]
    fn default_export_in_comment_is_not_spliced() {
        let source = "// export default is below\nexport default { name: \"C\" };";
        let descriptor = SfcDescriptor {
            scripts: vec![script(source, "js", false)],
            template: Some("<p>x</p>"),
            styles: vec![],
        };
        let (code, _) = compile_component("/src/C.vue", &descriptor).unwrap();
        assert!(code.starts_with("// export default is below\nconst __obpack_component__ = { name"));
        assert_eq!(code.matches("export default").count(), 2);
    }

    #[test]
    fn default_export_skips_comments_and_strings() {
        let cases = [
            "// export default x\nexport default {}",
            "/* export default */ export default {}",
            "const s = \"export default\";\nexport default {}",
            "const s = 'it\\'s export default';\nexport default {}",
            "const t = `\nexport default\n`;\nexport default {}",
        ];
        for source in cases {
            let span = find_default_export(source).unwrap();
            assert_eq!(Some(span.start), source.rfind("export default"), "{source}");
            assert_eq!(&source[span], "export default");
        }
    }

    #[test]
    fn default_export_needs_word_boundaries() {
        assert_eq!(find_default_export("reexport default"), None);
        assert_eq!(find_default_export("obj.export default"), None);
        assert_eq!(find_default_export("export defaults"), None);
        assert_eq!(find_default_export("export\n  default {}"), Some(0..16));
    }

    #[test]
    fn styles_become_imports() {
        let descriptor = SfcDescriptor {
            scripts: vec![],
            template: None,
            styles: vec![
                StyleBlock {
                    content: ".a{}",
                    lang: "css",
                    scoped: false,
                },
                StyleBlock {
                    content: ".b{}",
                    lang: "css",
                    scoped: true,
                },
            ],
        };
        let (code, _) = compile_component("/src/A.vue", &descriptor).unwrap();
        assert!(code.contains("import \"obpack-vue-style:0:/src/A.vue\";"));
        assert!(code.contains("import \"obpack-vue-style:1:/src/A.vue\";"));
        assert!(code.contains("export default {};"));
    }

    #[test]
    fn style_ids_round_trip_paths_with_colons() {
        assert_eq!(parse_style_id("2:C:/src/A.vue"), Some((2, "C:/src/A.vue")));
        assert_eq!(parse_style_id("x:/a.vue"), None);
    }

    #[test]
    fn preprocessor_styles_are_rejected() {
        let styles = [StyleBlock {
            content: "$c: red;",
            lang: "scss",
            scoped: false,
        }];
        assert!(check_styles(&styles).is_err());
    }

    #[test]
    fn styles_are_served_from_the_loaded_component() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.vue");
        std::fs::write(&path, "<template><p/></template><style>.a{}</style><style>.b{}</style>").unwrap();
        let id = path.to_string_lossy().into_owned();

        let plugin = VueSfcPlugin::new();
        plugin.load_component(&id).unwrap();

        // Edits after the component load don't leak into its styles.
        std::fs::write(&path, "<style>.changed{}</style>").unwrap();
        assert_eq!(plugin.load_style(&format!("0:{id}")).unwrap(), ".a{}");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(plugin.load_style(&format!("1:{id}")).unwrap(), ".b{}");
    }

    #[test]
    fn uncached_style_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B.vue");
        std::fs::write(&path, "<style>.b{}</style>").unwrap();
        let id = path.to_string_lossy().into_owned();

        let plugin = VueSfcPlugin::new();
        assert_eq!(plugin.load_style(&format!("0:{id}")).unwrap(), ".b{}");
        assert!(plugin.load_style(&format!("1:{id}")).is_err());
        assert!(plugin.load_style("nonsense").is_err());
    }
}
