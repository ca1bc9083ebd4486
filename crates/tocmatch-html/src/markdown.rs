//! Markdown table of contents for parsed issue pages.

use crate::page::IssuePage;

fn md_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '_' | '[' | ']' | '`' | '|' | '#') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render `pages` as one Markdown document: a `##` heading per year, a
/// `###` heading per issue and a numbered article list under each issue.
///
/// Pages are rendered in the order given; pass them through
/// [`load_directory`](crate::load_directory) for chronological order.
pub fn render_markdown(pages: &[IssuePage]) -> String {
    let mut out = String::from("# Table of Contents\n\n");
    let mut current_year = None;

    for page in pages {
        if let Some(label) = page.label
            && current_year != Some(label.year)
        {
            out.push_str(&format!("## {}\n\n", label.year));
            current_year = Some(label.year);
        }
        out.push_str(&format!("### {}\n\n", md_escape(&page.heading)));

        if page.articles.is_empty() {
            out.push_str("_No articles listed._\n\n");
            continue;
        }
        for (i, article) in page.articles.iter().enumerate() {
            out.push_str(&format!("{}. **{}**", i + 1, md_escape(&article.title)));
            if !article.authors.is_empty() {
                out.push_str(&format!("  \n   {}", md_escape(&article.authors)));
            }
            if !article.pages.is_empty() {
                out.push_str(&format!(" (pp. {})", md_escape(&article.pages)));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
