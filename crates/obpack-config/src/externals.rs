//! Modules the host application provides at load time.
//!
//! Everything listed here is left as a `require()` call in the output instead
//! of being bundled.

/// Runtime modules injected by the host application.
pub const HOST_MODULES: &[&str] = &[
    "obsidian",
    "electron",
    "@codemirror/autocomplete",
    "@codemirror/collab",
    "@codemirror/commands",
    "@codemirror/language",
    "@codemirror/lint",
    "@codemirror/search",
    "@codemirror/state",
    "@codemirror/view",
    "@lezer/common",
    "@lezer/highlight",
    "@lezer/lr",
];

/// Node.js built-in modules, including public subpath modules.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Full externals list: host modules, then built-ins in bare and `node:` form.
pub fn default_externals() -> Vec<String> {
    let mut externals = Vec::with_capacity(HOST_MODULES.len() + NODE_BUILTINS.len() * 2);
    externals.extend(HOST_MODULES.iter().map(|m| m.to_string()));
    externals.extend(NODE_BUILTINS.iter().map(|m| m.to_string()));
    externals.extend(NODE_BUILTINS.iter().map(|m| format!("node:{m}")));
    externals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_host_and_builtin_modules() {
        let externals = default_externals();
        assert!(externals.iter().any(|e| e == "obsidian"));
        assert!(externals.iter().any(|e| e == "@codemirror/view"));
        assert!(externals.iter().any(|e| e == "fs"));
        assert!(externals.iter().any(|e| e == "node:fs/promises"));
    }

    #[test]
    fn no_duplicates() {
        let externals = default_externals();
        let mut sorted = externals.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), externals.len());
    }
}
