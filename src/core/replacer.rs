//! 參照表驅動的搜尋與置換

use crate::domain::model::{ReferenceTable, ReplaceOptions, ReplacementRecord};
use crate::utils::error::Result;
use indicatif::ProgressBar;
use regex::{NoExpand, Regex, RegexBuilder};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// 一般詞彙的樣式：跳脫特殊字元，詞內空白可對應任意長度的空白
fn literal_pattern(search: &str, whole_word: bool) -> String {
    let escaped = WHITESPACE
        .split(search)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    if whole_word {
        format!(r"\b{}\b", escaped)
    } else {
        escaped
    }
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    search: String,
    replacement: String,
    pattern: Regex,
}

/// 依參照表順序套用的置換器
#[derive(Debug, Clone)]
pub struct TermReplacer {
    terms: Vec<CompiledTerm>,
    options: ReplaceOptions,
}

/// 置換結果
#[derive(Debug, Clone, Default)]
pub struct ReplaceOutcome {
    pub records: Vec<ReplacementRecord>,
    pub total_replacements: usize,
}

impl TermReplacer {
    pub fn new(table: &ReferenceTable, options: ReplaceOptions) -> Result<Self> {
        let mut terms = Vec::with_capacity(table.len());
        for (search, replacement) in table.iter() {
            if search.trim().is_empty() {
                continue;
            }
            // 單字邊界只套用在一般詞彙，正規表示式照原樣使用
            let source = if options.use_regex {
                search.to_string()
            } else {
                literal_pattern(search, options.whole_word_only)
            };
            let pattern = RegexBuilder::new(&source)
                .case_insensitive(!options.case_sensitive)
                .build()?;
            terms.push(CompiledTerm {
                search: search.to_string(),
                replacement: replacement.to_string(),
                pattern,
            });
        }
        Ok(Self { terms, options })
    }

    pub fn options(&self) -> &ReplaceOptions {
        &self.options
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    fn limit(&self) -> Option<usize> {
        self.options.max_replacements_per_term.filter(|&n| n > 0)
    }

    fn replace_limited(&self, term: &CompiledTerm, text: &str, limit: Option<usize>) -> (String, usize) {
        let count = term
            .pattern
            .find_iter(text)
            .take(limit.unwrap_or(usize::MAX))
            .count();
        if count == 0 {
            return (text.to_string(), 0);
        }
        let replaced = if self.options.use_regex {
            term.pattern.replacen(text, count, term.replacement.as_str())
        } else {
            term.pattern.replacen(text, count, NoExpand(&term.replacement))
        };
        (replaced.into_owned(), count)
    }

    /// 只找出符合位置 (字元偏移)，不修改文字
    pub fn preview(&self, text: &str, progress: &ProgressBar) -> ReplaceOutcome {
        let mut outcome = ReplaceOutcome::default();
        for term in &self.terms {
            progress.set_message(term.search.clone());
            let positions: Vec<usize> = term
                .pattern
                .find_iter(text)
                .map(|m| text[..m.start()].chars().count())
                .collect();
            if !positions.is_empty() {
                outcome.records.push(ReplacementRecord {
                    search_term: term.search.clone(),
                    replacement_term: term.replacement.clone(),
                    count: None,
                    matches: Some(positions.len()),
                    positions: Some(positions),
                });
            }
            progress.inc(1);
        }
        outcome
    }

    /// 依序對所有文字節點套用詞彙，每個詞彙的次數上限由全部節點共用
    pub fn apply_nodes(&self, nodes: &mut [String], progress: &ProgressBar) -> ReplaceOutcome {
        let mut outcome = ReplaceOutcome::default();

        for term in &self.terms {
            progress.set_message(term.search.clone());
            let mut remaining = self.limit();
            let mut count = 0;

            for node in nodes.iter_mut() {
                if remaining == Some(0) {
                    break;
                }
                let (replaced, n) = self.replace_limited(term, node, remaining);
                if n > 0 {
                    *node = replaced;
                    count += n;
                    remaining = remaining.map(|r| r - n);
                }
            }

            if count > 0 {
                tracing::debug!("'{}' → '{}' ({} times)", term.search, term.replacement, count);
                outcome.total_replacements += count;
                outcome.records.push(ReplacementRecord {
                    search_term: term.search.clone(),
                    replacement_term: term.replacement.clone(),
                    count: Some(count),
                    matches: None,
                    positions: None,
                });
            }
            progress.inc(1);
        }
        outcome
    }
}
