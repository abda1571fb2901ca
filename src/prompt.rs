use crate::story::{Story, StoryPage, UserInput};
use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const SYSTEM_PROMPT: &str =
    "You are a world-class children's book author and illustrator art director. \
     Return only valid JSON.";

/// Builds the structure-generation prompt. The character description and art
/// style are repeated into every image prompt so the child looks consistent
/// across pages.
pub fn structure_prompt(input: &UserInput) -> String {
    format!(
        "Task: Create a short, engaging, and educational storybook based on a child's real-day activity.\n\
        \n\
        Child's Name: {name}\n\
        Gender: {gender}\n\
        Activity/Event: \"{activity}\"\n\
        Visual Style: {style} (e.g., watercolor, 3D clay, cartoon, pencil sketch)\n\
        \n\
        Requirements:\n\
        1. The story should have a clear beginning, middle, and end.\n\
        2. Be positive, encouraging, and easy for a child to understand.\n\
        3. Length: Exactly {pages} pages.\n\
        4. For each page, provide the Story Text (2-3 sentences max) and a detailed Image Prompt.\n\
        5. In every Image Prompt, describe the character \"{name}\" the same way on each page so they \
        look consistent (e.g., \"a cute little boy wearing a red hoodie\"), and include the art style \
        \"{style}\".\n\
        \n\
        Return strictly a JSON object of the form:\n\
        {{ \"title\": \"...\", \"theme\": \"...\", \"moral\": \"...\", \
        \"pages\": [ {{ \"text\": \"...\", \"imagePrompt\": \"...\" }} ] }}",
        name = input.child_name,
        gender = input.child_gender,
        activity = input.activity_description,
        style = input.style_preference,
        pages = input.page_count,
    )
}

#[derive(Deserialize)]
struct StructureResponse {
    title: String,
    theme: String,
    moral: String,
    pages: Vec<StructurePage>,
}

#[derive(Deserialize)]
struct StructurePage {
    text: String,
    #[serde(rename = "imagePrompt")]
    image_prompt: String,
}

/// Parses the model's structure response into a Story with every page still
/// awaiting its illustration. Rejects payloads that are empty, malformed, or
/// carry the wrong page count.
pub fn parse_structure(response: &str, expected_pages: usize) -> Result<Story> {
    let clean = strip_code_blocks(response);
    if clean.is_empty() {
        bail!("Story model returned an empty response");
    }

    let parsed: StructureResponse = serde_json::from_str(&clean)
        .with_context(|| format!("Failed to parse story structure JSON: {}", clean))?;

    if parsed.pages.len() != expected_pages {
        bail!(
            "Story model returned {} pages, expected {}",
            parsed.pages.len(),
            expected_pages
        );
    }

    Ok(Story {
        title: parsed.title,
        theme: parsed.theme,
        moral: parsed.moral,
        pages: parsed
            .pages
            .into_iter()
            .enumerate()
            .map(|(i, p)| StoryPage {
                page_number: i + 1,
                text: p.text,
                image_prompt: p.image_prompt,
                image_url: None,
                is_loading_image: true,
            })
            .collect(),
    })
}

/// Models often wrap JSON in markdown fences despite instructions.
pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::ChildGender;

    const VALID_JSON: &str = r#"{
        "title": "Mia's First Ride",
        "theme": "A breezy spring afternoon",
        "moral": "Practice makes progress",
        "pages": [
            { "text": "Mia looked at her shiny bike.", "imagePrompt": "Watercolor of Mia by a bike" },
            { "text": "She wobbled, then pedaled.", "imagePrompt": "Watercolor of Mia pedaling" },
            { "text": "Mia rode all the way home.", "imagePrompt": "Watercolor of Mia riding home" }
        ]
    }"#;

    #[test]
    fn parse_valid_structure() {
        let story = parse_structure(VALID_JSON, 3).unwrap();
        assert_eq!(story.title, "Mia's First Ride");
        assert_eq!(story.pages.len(), 3);
        for (i, page) in story.pages.iter().enumerate() {
            assert_eq!(page.page_number, i + 1);
            assert!(page.image_url.is_none());
            assert!(page.is_loading_image);
        }
        assert_eq!(story.pages[1].image_prompt, "Watercolor of Mia pedaling");
    }

    #[test]
    fn parse_tolerates_code_fences() {
        let fenced = format!("```json\n{}\n```", VALID_JSON);
        let story = parse_structure(&fenced, 3).unwrap();
        assert_eq!(story.pages.len(), 3);
    }

    #[test]
    fn parse_rejects_wrong_page_count() {
        let err = parse_structure(VALID_JSON, 5).unwrap_err();
        assert!(err.to_string().contains("expected 5"));
    }

    #[test]
    fn parse_rejects_empty_response() {
        assert!(parse_structure("", 3).is_err());
        assert!(parse_structure("```json\n```", 3).is_err());
    }

    #[test]
    fn parse_rejects_missing_fields() {
        let json = r#"{ "title": "T", "pages": [] }"#;
        assert!(parse_structure(json, 0).is_err());
    }

    #[test]
    fn strip_code_blocks_variants() {
        assert_eq!(strip_code_blocks("{}"), "{}");
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  ```json  \n  {}  \n  ```  "), "{}");
    }

    #[test]
    fn prompt_embeds_input_fields() {
        let input = UserInput {
            child_name: "Mia".to_string(),
            child_gender: ChildGender::Girl,
            activity_description: "Mia rode a bike for the first time".to_string(),
            style_preference: "Watercolor".to_string(),
            page_count: 3,
        };
        let prompt = structure_prompt(&input);
        assert!(prompt.contains("Child's Name: Mia"));
        assert!(prompt.contains("Gender: girl"));
        assert!(prompt.contains("Exactly 3 pages"));
        assert!(prompt.contains("Watercolor"));
        assert!(prompt.contains("imagePrompt"));
    }
}
