use crate::config::Config;
use crate::image::ImageClient;
use crate::llm::LlmClient;
use crate::prompt;
use crate::story::{fallback_image_url, GenerationStatus, Story, UserInput};
use anyhow::{ensure, Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Shown when story-structure generation fails; per-page image failures are
/// silent apart from the placeholder illustration.
pub const GENERATION_ERROR_MESSAGE: &str =
    "Something went wrong while weaving the magic. Please try again.";

/// Drives the two-phase book generation: one structure call, then one
/// concurrent image call per page. Owns the in-progress story and the
/// process-wide status.
pub struct StoryWorkflow {
    llm: Box<dyn LlmClient>,
    image: Arc<dyn ImageClient>,
    image_timeout: Duration,
    show_progress: bool,
    status: GenerationStatus,
    story: Option<Story>,
    error: Option<String>,
}

impl StoryWorkflow {
    pub fn new(config: &Config, llm: Box<dyn LlmClient>, image: Arc<dyn ImageClient>) -> Self {
        Self {
            llm,
            image,
            image_timeout: Duration::from_secs(config.image.timeout_seconds),
            show_progress: true,
            status: GenerationStatus::Idle,
            story: None,
            error: None,
        }
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    /// The in-progress or finished story. None until a structure response has
    /// been received, and again after reset.
    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    /// User-facing error message, set only when structure generation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Discards the current story and returns to Idle. In-flight remote calls
    /// are not aborted; their results land on a story nobody holds anymore.
    pub fn reset(&mut self) {
        self.status = GenerationStatus::Idle;
        self.story = None;
        self.error = None;
    }

    pub async fn run(&mut self, input: &UserInput) -> Result<()> {
        self.request_story(input).await?;
        self.fill_images().await
    }

    /// Phase one: ask the text model for title, theme, moral and exactly
    /// `page_count` (text, image prompt) pairs. On success every page starts
    /// unsettled and status moves to GeneratingImages; on any failure status
    /// moves to Error and no story is kept.
    pub async fn request_story(&mut self, input: &UserInput) -> Result<Story> {
        ensure!(
            self.status == GenerationStatus::Idle,
            "A story is already in progress; reset before generating another"
        );

        self.status = GenerationStatus::GeneratingStory;
        self.story = None;
        self.error = None;

        match self.generate_structure(input).await {
            Ok(story) => {
                log::info!(
                    "Story structure ready: \"{}\" ({} pages)",
                    story.title,
                    story.pages.len()
                );
                self.story = Some(story.clone());
                self.status = GenerationStatus::GeneratingImages;
                Ok(story)
            }
            Err(e) => {
                log::error!("Story structure generation failed: {:#}", e);
                self.status = GenerationStatus::Error;
                self.error = Some(GENERATION_ERROR_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    async fn generate_structure(&self, input: &UserInput) -> Result<Story> {
        input.validate()?;
        let user_prompt = prompt::structure_prompt(input);
        let response = self
            .llm
            .generate_json(prompt::SYSTEM_PROMPT, &user_prompt)
            .await
            .context("Story structure request failed")?;
        prompt::parse_structure(&response, input.page_count)
    }

    /// Phase two: fan out one image call per page and merge completions as
    /// they arrive, in whatever order the remote service resolves them. A
    /// failed or timed-out page settles with its fallback placeholder and
    /// never disturbs its siblings. Resolves only once every page settled,
    /// then status moves to Completed.
    pub async fn fill_images(&mut self) -> Result<()> {
        ensure!(
            self.status == GenerationStatus::GeneratingImages,
            "fill_images called before a story structure is ready"
        );
        let jobs: Vec<(usize, String)> = self
            .story
            .as_ref()
            .context("No story in progress")?
            .pages
            .iter()
            .map(|p| p.image_prompt.clone())
            .enumerate()
            .collect();

        let pb = if self.show_progress {
            let pb = ProgressBar::new(jobs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages")?
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let image = Arc::clone(&self.image);
        let timeout = self.image_timeout;
        let fan_out = jobs.len().max(1);

        let mut settlements = futures_util::stream::iter(jobs)
            .map(move |(index, prompt)| {
                let image = Arc::clone(&image);
                async move {
                    let url = match tokio::time::timeout(timeout, image.generate(&prompt)).await {
                        Ok(Ok(url)) => url,
                        Ok(Err(e)) => {
                            log::warn!("Image generation failed for page {}: {:#}", index + 1, e);
                            fallback_image_url(index)
                        }
                        Err(_) => {
                            log::warn!(
                                "Image generation timed out for page {} after {:?}",
                                index + 1,
                                timeout
                            );
                            fallback_image_url(index)
                        }
                    };
                    (index, url)
                }
            })
            .buffer_unordered(fan_out);

        while let Some((index, url)) = settlements.next().await {
            if let Some(current) = self.story.take() {
                self.story = Some(current.settle_page(index, url));
            }
            pb.inc(1);
        }
        drop(settlements);

        pb.finish_and_clear();
        self.status = GenerationStatus::Completed;
        Ok(())
    }
}
