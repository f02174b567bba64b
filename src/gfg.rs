use crate::record::{get_now, Difficulty, ProblemRecord};
use crate::Extractor;
use itertools::Itertools;
use lazy_regex::regex;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::borrow::Borrow;
use tracing::debug;

const E: &str = "Invalid selector";
lazy_static! {
    static ref PROBLEM_TITLE: Selector =
        Selector::parse(r#"div[class*="problems_header_content__title"] h3"#).expect(E);
    static ref BREADCRUMB: Selector =
        Selector::parse(r#".breadcrumbs a, nav[class*="breadcrumb"] a"#).expect(E);
    static ref H1: Selector = Selector::parse("h1").expect(E);
    static ref DIFFICULTY: Selector = Selector::parse(
        r#"div[class*="problems_header_content__difficulty"], .difficulty-level"#
    )
    .expect(E);
    static ref SECTIONS: Selector = Selector::parse("section, div").expect(E);
    static ref TAGS: Selector = Selector::parse("a, span.tag").expect(E);
    static ref CODEMIRROR_LINES: Selector =
        Selector::parse(".CodeMirror-code .CodeMirror-line").expect(E);
    static ref EDITOR_TEXTAREAS: Selector = Selector::parse(
        r#".monaco-editor textarea, .CodeMirror textarea, #editor textarea, .ace_text-input, [class*="editor"] textarea, .code-editor textarea"#
    )
    .expect(E);
    // `pre` alone; matching `pre code` as well would emit nested blocks twice.
    static ref CODE_BLOCKS: Selector = Selector::parse("pre").expect(E);
    static ref LANGUAGE_SELECT: Selector =
        Selector::parse(r#"select[class*="lang"], .language-selector"#).expect(E);
    static ref SUCCESS_MARKERS: Selector = Selector::parse(
        r#".success-message, [class*="success"], .accepted, [class*="accepted"], .correct, [class*="correct"]"#
    )
    .expect(E);
    static ref SUCCESS_ICONS: Selector =
        Selector::parse(r#".fa-check, .checkmark, [class*="check"]"#).expect(E);
}

/// Generic `pre`/`code` blocks shorter than this are assumed to be inline
/// snippets, not the solution editor.
const MIN_CODE_BLOCK_LEN: usize = 40;

/// Vocabulary scanned over the whole page when no topic-tags section exists.
const TOPIC_VOCABULARY: [&str; 3] = ["Arrays", "Data Structures", "Algorithms"];

const UNKNOWN_TITLE: &str = "Unknown Problem";
const DEFAULT_TOPIC: &str = "Data Structures";

#[derive(Debug)]
pub struct GfgExtractor {
    default_language: String,
}

impl Default for GfgExtractor {
    fn default() -> Self {
        GfgExtractor {
            default_language: "cpp".to_string(),
        }
    }
}

impl GfgExtractor {
    pub fn with_default_language<S: Into<String>>(language: S) -> Self {
        GfgExtractor {
            default_language: language.into(),
        }
    }

    fn extract_title(&self, doc: &Html, url: &str) -> String {
        let candidates = [
            element_text(doc, &PROBLEM_TITLE),
            breadcrumb_title(doc),
            element_text(doc, &H1),
            title_from_url(url),
        ];
        for candidate in candidates.into_iter().flatten() {
            let title = clean_title(&candidate);
            if !title.is_empty() {
                return title;
            }
        }
        UNKNOWN_TITLE.to_string()
    }

    fn extract_difficulty(&self, doc: &Html) -> Difficulty {
        element_text(doc, &DIFFICULTY)
            .and_then(|text| Difficulty::classify(&text))
            .unwrap_or_default()
    }

    fn extract_topics(&self, doc: &Html) -> Vec<String> {
        let topics: Vec<String> = tag_section_entries(doc, "topic tags")
            .into_iter()
            .filter(|t| {
                !t.contains("Company") && !t.contains("Interview") && !t.eq_ignore_ascii_case("Topic Tags")
            })
            .unique()
            .collect();
        if !topics.is_empty() {
            return topics;
        }

        // No tag section on this revision of the page, scan the full text
        // for a fixed vocabulary instead.
        let page_text = doc.root_element().text().collect::<String>().to_lowercase();
        let topics: Vec<String> = TOPIC_VOCABULARY
            .iter()
            .filter(|t| page_text.contains(&t.to_lowercase()))
            .map(ToString::to_string)
            .collect();
        if !topics.is_empty() {
            return topics;
        }

        vec![DEFAULT_TOPIC.to_string()]
    }

    fn extract_company_tags(&self, doc: &Html) -> Vec<String> {
        tagged_entries(doc, "company tags", &["Company Tags", "Companies"])
    }

    fn extract_interview_tags(&self, doc: &Html) -> Vec<String> {
        tagged_entries(doc, "interview", &["Interview Experiences", "Interview"])
    }

    fn extract_solution(&self, doc: &Html) -> String {
        let lines: Vec<String> = doc
            .select(&CODEMIRROR_LINES)
            .map(|line| line.text().collect::<String>())
            .collect();
        if !lines.is_empty() {
            return lines.join("\n").trim().to_string();
        }

        for textarea in doc.select(&EDITOR_TEXTAREAS) {
            let code = textarea.text().collect::<String>().trim().to_string();
            if !code.is_empty() {
                return code;
            }
        }

        doc.select(&CODE_BLOCKS)
            .map(|block| block.text().collect::<String>().trim().to_string())
            .filter(|code| code.len() >= MIN_CODE_BLOCK_LEN)
            .join("\n")
            .trim()
            .to_string()
    }

    fn extract_language(&self, doc: &Html) -> String {
        if let Some(text) = element_text(doc, &LANGUAGE_SELECT) {
            let text = text.to_lowercase();
            // Checked in this order; the dropdown renders one label at a time.
            let known = [
                ("java", "java"),
                ("python", "python"),
                ("javascript", "javascript"),
                ("c++", "cpp"),
            ];
            for (needle, token) in known {
                if text.contains(needle) {
                    return token.to_string();
                }
            }
        }
        self.default_language.clone()
    }
}

impl Extractor for GfgExtractor {
    type Record = ProblemRecord;

    fn can_extract(&self, url: &str) -> bool {
        url.contains("geeksforgeeks.org/problems/")
    }

    fn extract(&self, doc: &Html, url: &str) -> Option<ProblemRecord> {
        if !self.can_extract(url) {
            debug!("Not a problem page: {}", url);
            return None;
        }

        let record = ProblemRecord {
            title: self.extract_title(doc, url),
            difficulty: self.extract_difficulty(doc),
            topics: self.extract_topics(doc),
            company_tags: self.extract_company_tags(doc),
            interview_tags: self.extract_interview_tags(doc),
            url: url.to_string(),
            solution: self.extract_solution(doc),
            language: self.extract_language(doc),
            timestamp: get_now(),
        };
        Some(record)
    }
}

/// Looks for acceptance markers left on the page after a submission. The
/// caller only logs a detection; it never triggers a sync on its own.
pub fn detect_successful_submission(doc: &Html) -> bool {
    for el in doc.select(&SUCCESS_MARKERS) {
        if el
            .text()
            .collect::<String>()
            .to_lowercase()
            .contains("accept")
        {
            return true;
        }
    }
    doc.select(&SUCCESS_ICONS).next().is_some()
}

fn element_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .map(|el| normalized_text(&el))
        .find(|text| !text.is_empty())
}

fn normalized_text(el: &ElementRef) -> String {
    let text = el.text().collect::<String>();
    regex!(r"\s+").replace_all(text.trim(), " ").into_owned()
}

fn breadcrumb_title(doc: &Html) -> Option<String> {
    doc.select(&BREADCRUMB)
        .map(|el| normalized_text(&el))
        .filter(|text| {
            !text.is_empty() && !text.eq_ignore_ascii_case("home") && !text.eq_ignore_ascii_case("problems")
        })
        .last()
}

fn title_from_url(url: &str) -> Option<String> {
    let slug = url
        .split("/problems/")
        .nth(1)?
        .split(|c| c == '/' || c == '?')
        .next()?;
    let slug = regex!(r"-?\d+$").replace(slug, "");
    let title = slug
        .split('-')
        .filter(|w| !w.is_empty())
        .map(title_case)
        .join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn clean_title(raw: &str) -> String {
    let t = regex!(r"\s+").replace_all(raw.trim(), " ");
    let t = regex!(r"^\s*(Problem|Practice|Question)\s*:\s*"i).replace(t.borrow(), "");
    let t = regex!(r"\s*[|-]\s*Practice\s*([|-]\s*GeeksforGeeks)?\s*$"i).replace(t.borrow(), "");
    let t = regex!(r"\s*[|-]\s*GeeksforGeeks\s*$"i).replace(t.borrow(), "");
    t.trim().to_string()
}

/// Tag texts found inside the tightest `section`/`div` whose text mentions
/// `header`. Nested wrappers all match and innermost ones come last in
/// document order, so walk from the inside out and stop at the first
/// container that actually holds tag elements (the label often sits in a
/// small div of its own).
fn tag_section_entries(doc: &Html, header: &str) -> Vec<String> {
    let sections: Vec<_> = doc
        .select(&SECTIONS)
        .filter(|el| {
            el.text()
                .collect::<String>()
                .to_lowercase()
                .contains(header)
        })
        .collect();
    for section in sections.iter().rev() {
        let entries: Vec<String> = section
            .select(&TAGS)
            .map(|el| normalized_text(&el))
            .filter(|text| !text.is_empty())
            .collect();
        if !entries.is_empty() {
            return entries;
        }
    }
    vec![]
}

fn tagged_entries(doc: &Html, header: &str, label_prefixes: &[&str]) -> Vec<String> {
    tag_section_entries(doc, header)
        .into_iter()
        .map(|entry| strip_label_prefix(&entry, label_prefixes))
        .filter(|entry| {
            entry.len() > 1
                && !label_prefixes
                    .iter()
                    .any(|p| entry.eq_ignore_ascii_case(p))
                && !entry.eq_ignore_ascii_case("Topic Tags")
        })
        .unique()
        .collect()
}

fn strip_label_prefix(entry: &str, label_prefixes: &[&str]) -> String {
    for prefix in label_prefixes {
        let lower = entry.to_lowercase();
        let prefix_lower = prefix.to_lowercase();
        if lower.starts_with(&prefix_lower) && lower.len() > prefix_lower.len() {
            return entry[prefix.len()..]
                .trim_start_matches(|c| c == ':' || c == ' ')
                .to_string();
        }
    }
    entry.to_string()
}
