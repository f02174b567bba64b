use std::collections::HashMap;

/// Fallback for tokens Notion's code blocks do not know about.
pub const FALLBACK_LANGUAGE: &str = "plain text";

lazy_static::lazy_static! {
    static ref LANGUAGE_MAP: HashMap<&'static str, &'static str> = HashMap::from([
        ("cpp", "c++"),
        ("c++", "c++"),
        ("java", "java"),
        ("python", "python"),
        ("javascript", "javascript"),
        ("js", "javascript"),
        ("c", "c"),
        ("csharp", "c#"),
        ("c#", "c#"),
        ("go", "go"),
        ("rust", "rust"),
        ("php", "php"),
        ("ruby", "ruby"),
        ("swift", "swift"),
        ("kotlin", "kotlin"),
        ("scala", "scala"),
        ("perl", "perl"),
        ("r", "r"),
        ("matlab", "matlab"),
        ("sql", "sql"),
        ("html", "html"),
        ("css", "css"),
        ("json", "json"),
        ("xml", "xml"),
        ("yaml", "yaml"),
        ("markdown", "markdown"),
        ("bash", "bash"),
        ("shell", "bash"),
        ("powershell", "powershell"),
    ]);
}

/// Maps a detected language token to the vocabulary Notion accepts for code
/// blocks. Total over its domain: absent or empty input defaults to
/// "javascript", unknown tokens fall back to [`FALLBACK_LANGUAGE`].
pub fn normalize(language: Option<&str>) -> &'static str {
    let token = match language {
        Some(l) if !l.trim().is_empty() => l.trim().to_lowercase(),
        _ => "javascript".to_string(),
    };
    LANGUAGE_MAP
        .get(token.as_str())
        .copied()
        .unwrap_or(FALLBACK_LANGUAGE)
}
