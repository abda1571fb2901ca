use crate::story::Story;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the finished book to the output folder: the raw story as JSON and a
/// self-contained HTML reader (the data-URL images embed directly, so the file
/// opens offline). Returns (json path, html path).
pub fn export(story: &Story, output_folder: &str) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_folder)
        .with_context(|| format!("Failed to create output folder {}", output_folder))?;

    let slug = slugify(&story.title);
    let json_path = Path::new(output_folder).join(format!("{}.json", slug));
    let html_path = Path::new(output_folder).join(format!("{}.html", slug));

    fs::write(&json_path, serde_json::to_string_pretty(story)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    fs::write(&html_path, render_html(story))
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    Ok((json_path, html_path))
}

fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "storybook".to_string()
    } else {
        slug
    }
}

fn render_html(story: &Story) -> String {
    let mut pages_html = String::new();
    for page in &story.pages {
        let image = page.image_url.as_deref().unwrap_or("");
        pages_html.push_str(&format!(
            "  <section class=\"page\">\n    <img src=\"{}\" alt=\"Illustration for page {}\">\n    <p>{}</p>\n    <span class=\"number\">{}</span>\n  </section>\n",
            escape(image),
            page.page_number,
            escape(&page.text),
            page.page_number,
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
        <style>\n\
        body {{ font-family: Georgia, serif; background: #faf7f2; margin: 0; }}\n\
        h1 {{ text-align: center; padding: 1.5rem 0 0.25rem; }}\n\
        .moral {{ text-align: center; color: #777; font-style: italic; margin-bottom: 2rem; }}\n\
        .page {{ max-width: 640px; margin: 0 auto 3rem; text-align: center; position: relative; }}\n\
        .page img {{ width: 100%; border-radius: 12px; box-shadow: 0 4px 16px rgba(0,0,0,0.15); }}\n\
        .page p {{ font-size: 1.2rem; line-height: 1.6; padding: 0 1rem; }}\n\
        .number {{ color: #bbb; font-size: 0.8rem; }}\n\
        </style>\n</head>\n<body>\n<h1>{title}</h1>\n<p class=\"moral\">{moral}</p>\n{pages}</body>\n</html>\n",
        title = escape(&story.title),
        moral = escape(&story.moral),
        pages = pages_html,
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
