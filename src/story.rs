use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_PAGE_COUNT: usize = 3;
pub const MAX_PAGE_COUNT: usize = 10;

/// Overall generation state driving the UI. Only moves forward; Error and
/// Completed return to Idle via an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    Idle,
    GeneratingStory,
    GeneratingImages,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildGender {
    Boy,
    Girl,
    Other,
}

impl ChildGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildGender::Boy => "boy",
            ChildGender::Girl => "girl",
            ChildGender::Other => "other",
        }
    }
}

impl fmt::Display for ChildGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    pub child_name: String,
    pub child_gender: ChildGender,
    pub activity_description: String,
    pub style_preference: String,
    pub page_count: usize,
}

impl UserInput {
    pub fn validate(&self) -> Result<()> {
        if self.child_name.trim().is_empty() {
            bail!("Child name must not be empty");
        }
        if self.activity_description.trim().is_empty() {
            bail!("Activity description must not be empty");
        }
        if self.page_count < MIN_PAGE_COUNT || self.page_count > MAX_PAGE_COUNT {
            bail!(
                "Page count {} out of range ({}-{})",
                self.page_count,
                MIN_PAGE_COUNT,
                MAX_PAGE_COUNT
            );
        }
        Ok(())
    }
}

/// One page of the book. `text` and `image_prompt` are fixed at creation;
/// `image_url` and `is_loading_image` flip exactly once when the page settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPage {
    pub page_number: usize,
    pub text: String,
    pub image_prompt: String,
    pub image_url: Option<String>,
    pub is_loading_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub theme: String,
    pub moral: String,
    pub pages: Vec<StoryPage>,
}

impl Story {
    /// Pure merge of one page's image outcome: returns a story identical to
    /// `self` except that the page at `index` carries `image_url` and is no
    /// longer loading. A page that already settled is left untouched, so the
    /// transition happens at most once. Out-of-range indices are a no-op.
    pub fn settle_page(mut self, index: usize, image_url: String) -> Story {
        if let Some(page) = self.pages.get_mut(index) {
            if page.is_loading_image {
                page.image_url = Some(image_url);
                page.is_loading_image = false;
            }
        }
        self
    }

    pub fn all_settled(&self) -> bool {
        self.pages.iter().all(|p| !p.is_loading_image)
    }
}

/// Placeholder illustration used when a page's image attempt fails.
/// Deterministic in the 0-based page index.
pub fn fallback_image_url(index: usize) -> String {
    format!("https://picsum.photos/800/600?random={}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_story(pages: usize) -> Story {
        Story {
            title: "The Big Day".to_string(),
            theme: "A sunny park".to_string(),
            moral: "Keep trying".to_string(),
            pages: (1..=pages)
                .map(|n| StoryPage {
                    page_number: n,
                    text: format!("Page {} text", n),
                    image_prompt: format!("Page {} prompt", n),
                    image_url: None,
                    is_loading_image: true,
                })
                .collect(),
        }
    }

    #[test]
    fn settle_page_touches_only_target_page() {
        let story = sample_story(4);
        let settled = story.clone().settle_page(2, "data:image/png;base64,x".to_string());

        assert_eq!(settled.pages[2].image_url.as_deref(), Some("data:image/png;base64,x"));
        assert!(!settled.pages[2].is_loading_image);
        for i in [0usize, 1, 3] {
            assert_eq!(settled.pages[i], story.pages[i]);
        }
        assert_eq!(settled.title, story.title);
    }

    #[test]
    fn settle_page_is_one_shot() {
        let story = sample_story(2)
            .settle_page(0, "first".to_string())
            .settle_page(0, "second".to_string());
        assert_eq!(story.pages[0].image_url.as_deref(), Some("first"));
    }

    #[test]
    fn settle_page_order_independent() {
        let base = sample_story(3);
        let forward = base
            .clone()
            .settle_page(0, "a".to_string())
            .settle_page(1, "b".to_string())
            .settle_page(2, "c".to_string());
        let backward = base
            .settle_page(2, "c".to_string())
            .settle_page(0, "a".to_string())
            .settle_page(1, "b".to_string());
        assert_eq!(forward, backward);
        assert!(forward.all_settled());
    }

    #[test]
    fn settle_page_out_of_range_is_noop() {
        let story = sample_story(2).settle_page(9, "x".to_string());
        assert!(!story.all_settled());
        assert!(story.pages.iter().all(|p| p.image_url.is_none()));
    }

    #[test]
    fn fallback_url_is_deterministic() {
        assert_eq!(fallback_image_url(4), fallback_image_url(4));
        assert_ne!(fallback_image_url(0), fallback_image_url(1));
    }

    #[test]
    fn validate_rejects_bad_input() {
        let mut input = UserInput {
            child_name: "Mia".to_string(),
            child_gender: ChildGender::Girl,
            activity_description: "Rode a bike".to_string(),
            style_preference: "Watercolor".to_string(),
            page_count: 5,
        };
        assert!(input.validate().is_ok());

        input.child_name = "  ".to_string();
        assert!(input.validate().is_err());
        input.child_name = "Mia".to_string();

        input.activity_description = String::new();
        assert!(input.validate().is_err());
        input.activity_description = "Rode a bike".to_string();

        input.page_count = 2;
        assert!(input.validate().is_err());
        input.page_count = 11;
        assert!(input.validate().is_err());
    }
}
