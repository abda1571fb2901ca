use anyhow::{Context, Result};
use storyweaver::config::Config;
use storyweaver::workflow::StoryWorkflow;
use storyweaver::{book, image, llm, setup};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid model settings.");
            return Err(e);
        }
    };
    config.ensure_directories()?;

    let input = setup::collect_input()?;

    let llm = llm::create_llm(&config)?;
    let image = image::create_image_client(&config)?;
    let mut workflow = StoryWorkflow::new(&config, llm, image);

    println!("Writing the story...");
    if let Err(e) = workflow.run(&input).await {
        if let Some(message) = workflow.error() {
            eprintln!("{}", message);
        }
        return Err(e);
    }

    let story = workflow
        .story()
        .context("Story missing after completion")?;
    let (json_path, html_path) = book::export(story, &config.output_folder)?;

    println!("Storybook ready!");
    println!("  {}", json_path.display());
    println!("  {}", html_path.display());
    Ok(())
}
