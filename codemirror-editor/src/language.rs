use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Language modes bundled into the editor runtime. The serialized form is
/// the id the runtime's `setLanguage` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Jsx,
    #[default]
    Json,
    Vue,
    Html,
    Xml,
    Css,
    Sass,
    Less,
    Python,
    Cpp,
    Php,
    Java,
    Rust,
    Yaml,
    Go,
    Sql,
    Mysql,
    Pgsql,
    Liquid,
    Wast,
    Swift,
    Txt,
}

impl Language {
    pub const ALL: [Language; 23] = [
        Language::Javascript,
        Language::Jsx,
        Language::Json,
        Language::Vue,
        Language::Html,
        Language::Xml,
        Language::Css,
        Language::Sass,
        Language::Less,
        Language::Python,
        Language::Cpp,
        Language::Php,
        Language::Java,
        Language::Rust,
        Language::Yaml,
        Language::Go,
        Language::Sql,
        Language::Mysql,
        Language::Pgsql,
        Language::Liquid,
        Language::Wast,
        Language::Swift,
        Language::Txt,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Jsx => "jsx",
            Language::Json => "json",
            Language::Vue => "vue",
            Language::Html => "html",
            Language::Xml => "xml",
            Language::Css => "css",
            Language::Sass => "sass",
            Language::Less => "less",
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Php => "php",
            Language::Java => "java",
            Language::Rust => "rust",
            Language::Yaml => "yaml",
            Language::Go => "go",
            Language::Sql => "sql",
            Language::Mysql => "mysql",
            Language::Pgsql => "pgsql",
            Language::Liquid => "liquid",
            Language::Wast => "wast",
            Language::Swift => "swift",
            Language::Txt => "txt",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::Javascript => "JavaScript",
            Language::Jsx => "JSX",
            Language::Json => "JSON",
            Language::Vue => "Vue",
            Language::Html => "HTML",
            Language::Xml => "XML",
            Language::Css => "CSS",
            Language::Sass => "Sass",
            Language::Less => "Less",
            Language::Python => "Python",
            Language::Cpp => "C++",
            Language::Php => "PHP",
            Language::Java => "Java",
            Language::Rust => "Rust",
            Language::Yaml => "YAML",
            Language::Go => "Go",
            Language::Sql => "SQL",
            Language::Mysql => "MySQL",
            Language::Pgsql => "PostgreSQL",
            Language::Liquid => "Liquid",
            Language::Wast => "WebAssembly Text",
            Language::Swift => "Swift",
            Language::Txt => "Plain Text",
        }
    }

    pub fn from_id(id: &str) -> Option<Language> {
        Language::ALL.iter().copied().find(|l| l.id() == id)
    }

    /// Pick a language mode from a file path or `file://` URI.
    ///
    /// Unknown extensions fall back to plain text.
    pub fn from_path(path_or_uri: &str) -> Language {
        let path = match Url::parse(path_or_uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| url.path().to_string()),
            _ => path_or_uri.to_string(),
        };
        let ext = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "js" | "mjs" | "cjs" | "ts" | "mts" | "cts" => Language::Javascript,
            "jsx" | "tsx" => Language::Jsx,
            "json" | "jsonc" => Language::Json,
            "vue" => Language::Vue,
            "html" | "htm" => Language::Html,
            "xml" | "svg" | "plist" => Language::Xml,
            "css" => Language::Css,
            "sass" | "scss" => Language::Sass,
            "less" => Language::Less,
            "py" | "pyi" => Language::Python,
            "c" | "h" | "cpp" | "cxx" | "cc" | "hpp" | "hxx" => Language::Cpp,
            "php" => Language::Php,
            "java" => Language::Java,
            "rs" => Language::Rust,
            "yaml" | "yml" => Language::Yaml,
            "go" => Language::Go,
            "sql" => Language::Sql,
            "liquid" => Language::Liquid,
            "wast" | "wat" => Language::Wast,
            "swift" => Language::Swift,
            _ => Language::Txt,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_runtime_ids() {
        for language in Language::ALL {
            let json = serde_json::to_string(&language).unwrap();
            assert_eq!(json, format!("\"{}\"", language.id()));
            let back: Language = serde_json::from_str(&json).unwrap();
            assert_eq!(back, language);
        }
    }

    #[test]
    fn from_id_rejects_unknown() {
        assert_eq!(Language::from_id("pgsql"), Some(Language::Pgsql));
        assert_eq!(Language::from_id("cobol"), None);
    }

    #[test]
    fn from_path_plain_paths() {
        assert_eq!(Language::from_path("/src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("/web/App.tsx"), Language::Jsx);
        assert_eq!(Language::from_path("/web/style.SCSS"), Language::Sass);
        assert_eq!(Language::from_path("/etc/config.yml"), Language::Yaml);
    }

    #[test]
    fn from_path_file_uri_percent_encoded() {
        assert_eq!(
            Language::from_path("file:///home/user/my%20project/main.py"),
            Language::Python
        );
    }

    #[test]
    fn from_path_unknown_is_plain_text() {
        assert_eq!(Language::from_path("/foo/Makefile"), Language::Txt);
        assert_eq!(Language::from_path("/foo/bar.xyz"), Language::Txt);
    }

    #[test]
    fn default_is_json() {
        assert_eq!(Language::default(), Language::Json);
    }
}
