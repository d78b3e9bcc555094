//! In-memory document index over page titles and content.
//!
//! Each field keeps its own inverted index (`term -> doc -> frequency`).
//! Documents are keyed by path; only `path` and `title` are stored for
//! retrieval. A query returns one ranked result set per field that matched.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use booksearch_shared::{BookSearchError, IndexedPage, QueryResult};

use crate::render::format_path;

/// How words are broken into index terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenize {
    /// Whole words only.
    Strict,
    /// Every prefix of each word, so partial input matches while typing.
    Forward,
    /// Every substring of each word.
    Full,
}

impl FromStr for Tokenize {
    type Err = BookSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "forward" => Ok(Self::Forward),
            "full" => Ok(Self::Full),
            other => Err(BookSearchError::config(format!(
                "unknown tokenize mode `{other}` (expected strict, forward or full)"
            ))),
        }
    }
}

/// Indexed document fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Content,
}

impl Field {
    const ALL: [Field; 2] = [Field::Title, Field::Content];

    fn slot(self) -> usize {
        match self {
            Field::Title => 0,
            Field::Content => 1,
        }
    }
}

/// A stored document returned with a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub path: String,
    pub title: String,
    pub score: u32,
}

/// Ranked hits for one field.
#[derive(Debug, Clone)]
pub struct FieldResult {
    pub field: Field,
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    path: String,
    title: String,
}

type Postings = HashMap<String, HashMap<usize, u32>>;

#[derive(Debug, Clone)]
pub struct SearchIndex {
    tokenize: Tokenize,
    docs: Vec<StoredDoc>,
    ids: HashMap<String, usize>,
    fields: [Postings; 2],
}

impl SearchIndex {
    pub fn new(tokenize: Tokenize) -> Self {
        Self {
            tokenize,
            docs: Vec::new(),
            ids: HashMap::new(),
            fields: [HashMap::new(), HashMap::new()],
        }
    }

    /// Build an index over every page of an artifact.
    pub fn from_pages(tokenize: Tokenize, pages: &[IndexedPage]) -> Self {
        let mut index = Self::new(tokenize);
        for page in pages {
            index.add(page);
        }
        index
    }

    /// Number of distinct documents.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index a page. Adding a path that is already present replaces it.
    pub fn add(&mut self, page: &IndexedPage) {
        let id = match self.ids.get(&page.path) {
            Some(&id) => {
                self.remove_postings(id);
                self.docs[id].title = page.title.clone();
                id
            }
            None => {
                let id = self.docs.len();
                self.docs.push(StoredDoc {
                    path: page.path.clone(),
                    title: page.title.clone(),
                });
                self.ids.insert(page.path.clone(), id);
                id
            }
        };

        for (field, text) in [(Field::Title, &page.title), (Field::Content, &page.content)] {
            let postings = &mut self.fields[field.slot()];
            for word in words(text) {
                for term in expand_terms(&word, self.tokenize) {
                    *postings.entry(term).or_default().entry(id).or_default() += 1;
                }
            }
        }
    }

    fn remove_postings(&mut self, id: usize) {
        for postings in &mut self.fields {
            postings.retain(|_, docs| {
                docs.remove(&id);
                !docs.is_empty()
            });
        }
    }

    /// Search every field. A document matches a field when that field
    /// contains all query words; hits rank by total term frequency, then by
    /// insertion order. Fields without hits are omitted.
    pub fn search(&self, query: &str, limit: usize) -> Vec<FieldResult> {
        let terms: Vec<String> = words(query).collect();
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        Field::ALL
            .iter()
            .filter_map(|&field| {
                let hits = self.search_field(field, &terms, limit);
                (!hits.is_empty()).then_some(FieldResult { field, hits })
            })
            .collect()
    }

    fn search_field(&self, field: Field, terms: &[String], limit: usize) -> Vec<Hit> {
        let postings = &self.fields[field.slot()];

        let mut scores: Option<HashMap<usize, u32>> = None;
        for term in terms {
            let Some(docs) = postings.get(term) else {
                return Vec::new();
            };
            scores = Some(match scores {
                None => docs.clone(),
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(id, score)| docs.get(&id).map(|freq| (id, score + freq)))
                    .collect(),
            });
        }

        let mut ranked: Vec<(usize, u32)> = scores.unwrap_or_default().into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(limit)
            .map(|(id, score)| Hit {
                path: self.docs[id].path.clone(),
                title: self.docs[id].title.clone(),
                score,
            })
            .collect()
    }
}

/// Flatten per-field result sets into one list, keeping the first
/// occurrence of each path. Untitled pages get a title derived from the path.
pub fn flatten_results(results: &[FieldResult]) -> Vec<QueryResult> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for hit in results.iter().flat_map(|r| &r.hits) {
        if seen.insert(hit.path.as_str()) {
            let title = if hit.title.is_empty() {
                format_path(&hit.path)
            } else {
                hit.title.clone()
            };
            items.push(QueryResult {
                path: hit.path.clone(),
                title,
            });
        }
    }

    items
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split text into normalized words: lowercase, Latin diacritics folded,
/// separated by anything that is not alphanumeric.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(normalize)
}

fn normalize(word: &str) -> String {
    word.chars().flat_map(char::to_lowercase).map(fold_diacritic).collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

/// Longest prefix or substring generated from a single word. Longer words
/// (hashes, base64 runs) are still indexed whole, so an exact query finds them.
const MAX_PARTIAL_TERM_CHARS: usize = 32;

fn expand_terms(word: &str, mode: Tokenize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let cap = chars.len().min(MAX_PARTIAL_TERM_CHARS);
    let mut terms = match mode {
        Tokenize::Strict => return vec![word.to_string()],
        Tokenize::Forward => (1..=cap)
            .map(|end| chars[..end].iter().collect())
            .collect::<HashSet<String>>(),
        Tokenize::Full => {
            let mut terms = HashSet::new();
            for start in 0..chars.len() {
                let longest = (chars.len() - start).min(MAX_PARTIAL_TERM_CHARS);
                for len in 1..=longest {
                    terms.insert(chars[start..start + len].iter().collect::<String>());
                }
            }
            terms
        }
    };
    terms.insert(word.to_string());
    terms.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str, title: &str, content: &str) -> IndexedPage {
        IndexedPage {
            path: path.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    fn sample() -> Vec<IndexedPage> {
        vec![
            page("intro.md", "Introduction", "Welcome to the installation docs."),
            page("guide/install.md", "Install Guide", "Install the CLI, then install plugins."),
            page("faq.md", "", "Common questions about configuration."),
        ]
    }

    #[test]
    fn tokenize_parses_modes() {
        assert_eq!("forward".parse::<Tokenize>().unwrap(), Tokenize::Forward);
        assert!("fuzzy".parse::<Tokenize>().is_err());
    }

    #[test]
    fn forward_matches_prefixes() {
        let index = SearchIndex::from_pages(Tokenize::Forward, &sample());
        let results = index.search("inst", 20);

        let title = results.iter().find(|r| r.field == Field::Title).unwrap();
        assert_eq!(title.hits[0].path, "guide/install.md");

        let content = results.iter().find(|r| r.field == Field::Content).unwrap();
        // Two "install" occurrences outrank one "installation".
        assert_eq!(content.hits[0].path, "guide/install.md");
        assert_eq!(content.hits[1].path, "intro.md");
    }

    #[test]
    fn strict_requires_whole_words() {
        let index = SearchIndex::from_pages(Tokenize::Strict, &sample());
        assert!(index.search("inst", 20).is_empty());
        assert_eq!(index.search("install", 20).len(), 2);
    }

    #[test]
    fn full_matches_substrings() {
        let index = SearchIndex::from_pages(Tokenize::Full, &sample());
        let results = index.search("figur", 20);
        assert_eq!(results[0].hits[0].path, "faq.md");
    }

    #[test]
    fn multi_word_query_requires_all_words() {
        let index = SearchIndex::from_pages(Tokenize::Forward, &sample());
        let results = index.search("install plugins", 20);
        let paths: Vec<_> = flatten_results(&results).into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["guide/install.md"]);
    }

    #[test]
    fn normalization_folds_case_and_accents() {
        let index = SearchIndex::from_pages(Tokenize::Forward, &[page("cafe.md", "Café Menu", "")]);
        assert_eq!(index.search("CAFE", 20).len(), 1);
    }

    #[test]
    fn limit_caps_hits_per_field() {
        let pages: Vec<_> = (0..30)
            .map(|i| page(&format!("p{i}.md"), "Page", "shared words"))
            .collect();
        let index = SearchIndex::from_pages(Tokenize::Forward, &pages);
        let results = index.search("shared", 20);
        assert_eq!(results[0].hits.len(), 20);
        // Equal scores keep insertion order.
        assert_eq!(results[0].hits[0].path, "p0.md");
    }

    #[test]
    fn re_adding_path_replaces_document() {
        let mut index = SearchIndex::new(Tokenize::Forward);
        index.add(&page("a.md", "Old", "alpha"));
        index.add(&page("a.md", "New", "beta"));

        assert_eq!(index.len(), 1);
        assert!(index.search("alpha", 20).is_empty());
        assert_eq!(index.search("beta", 20)[0].hits[0].title, "New");
    }

    #[test]
    fn flatten_dedupes_in_first_seen_order() {
        let index = SearchIndex::from_pages(Tokenize::Forward, &sample());
        let items = flatten_results(&index.search("install", 20));

        let paths: Vec<_> = items.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["guide/install.md", "intro.md"]);
    }

    #[test]
    fn flatten_derives_missing_titles() {
        let index = SearchIndex::from_pages(Tokenize::Forward, &sample());
        let items = flatten_results(&index.search("questions", 20));
        assert_eq!(items[0].title, "Faq");
    }

    #[test]
    fn long_words_expand_to_bounded_terms() {
        let word = "a".repeat(40) + &"b".repeat(4960);
        let terms = expand_terms(&word, Tokenize::Full);
        assert!(terms.len() < 10_000);
        assert!(terms.iter().all(|t| t.chars().count() <= MAX_PARTIAL_TERM_CHARS || *t == word));

        let index = SearchIndex::from_pages(Tokenize::Full, &[page("blob.md", "", &word)]);
        assert_eq!(index.search("aab", 20).len(), 1);
        assert_eq!(index.search(&word, 20).len(), 1);
    }

    #[test]
    fn empty_query_has_no_results() {
        let index = SearchIndex::from_pages(Tokenize::Forward, &sample());
        assert!(index.search("   ", 20).is_empty());
        assert!(index.search("!!", 20).is_empty());
    }
}
