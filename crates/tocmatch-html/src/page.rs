//! One issue's table-of-contents page.
//!
//! Pages follow the Open Journal Systems layout: the issue label sits in
//! the `<h2>` (or `<title>`, or the breadcrumb), and every article is a
//! `table.tocArticle` with `tocTitle` / `tocAuthors` / `tocPages` cells.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use tocmatch_core::{BibliographicRecord, split_authors};

static H2_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").unwrap());
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BREADCRUMB_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#breadcrumb a.current").unwrap());
static ARTICLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("table.tocArticle").unwrap());
static ARTICLE_TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("td.tocTitle").unwrap());
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static AUTHORS_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("td.tocAuthors").unwrap());
static PAGES_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("td.tocPages").unwrap());

static ISSUE_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bVol\.?\s*(\d+)\s*,?\s*No\.?\s*(\d+)\s*\((\d{4})\)").unwrap()
});

/// Articles whose title is shorter than this are navigation noise.
const MIN_ARTICLE_TITLE_CHARS: usize = 5;

pub const UNKNOWN_ISSUE: &str = "Unknown Issue";

/// Volume, number and year of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IssueLabel {
    pub volume: u32,
    pub issue: u32,
    pub year: u32,
}

/// Parse `"Vol 2, No 3 (2012)"` out of a heading.
pub fn parse_issue_label(text: &str) -> Option<IssueLabel> {
    let caps = ISSUE_LABEL_RE.captures(text)?;
    Some(IssueLabel {
        volume: caps[1].parse().ok()?,
        issue: caps[2].parse().ok()?,
        year: caps[3].parse().ok()?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocArticle {
    pub title: String,
    pub authors: String,
    pub pages: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePage {
    /// Heading the label was read from, or [`UNKNOWN_ISSUE`].
    pub heading: String,
    pub label: Option<IssueLabel>,
    pub articles: Vec<TocArticle>,
}

impl IssuePage {
    /// Records for every article, or `None` when the issue label is unknown.
    pub fn records(&self) -> Option<Vec<BibliographicRecord>> {
        let label = self.label?;
        Some(
            self.articles
                .iter()
                .map(|a| {
                    BibliographicRecord::new(label.volume, label.issue, Some(label.year), &a.title)
                        .with_authors(split_authors(&a.authors))
                        .with_pages(&a.pages)
                })
                .collect(),
        )
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).next().map(element_text)
}

fn issue_heading(document: &Html) -> String {
    let root = document.root_element();
    if let Some(h2) = first_text(root, &H2_SEL).filter(|t| t.contains("Vol")) {
        return h2;
    }
    if let Some(title) = first_text(root, &TITLE_SEL).filter(|t| t.contains("Vol")) {
        return title;
    }
    first_text(root, &BREADCRUMB_SEL)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_ISSUE.to_string())
}

fn parse_article(table: ElementRef<'_>) -> Option<TocArticle> {
    let title_cell = table.select(&ARTICLE_TITLE_SEL).next()?;
    let title = match title_cell.select(&LINK_SEL).next() {
        Some(link) => element_text(link),
        None => element_text(title_cell),
    };
    if title.chars().count() < MIN_ARTICLE_TITLE_CHARS {
        return None;
    }
    Some(TocArticle {
        title,
        authors: first_text(table, &AUTHORS_SEL).unwrap_or_default(),
        pages: first_text(table, &PAGES_SEL).unwrap_or_default(),
    })
}

/// Parse one issue TOC page.
pub fn parse_issue_page(html: &str) -> IssuePage {
    let document = Html::parse_document(html);
    let heading = issue_heading(&document);
    let label = parse_issue_label(&heading);
    let articles = document
        .select(&ARTICLE_SEL)
        .filter_map(parse_article)
        .collect();

    IssuePage {
        heading,
        label,
        articles,
    }
}
