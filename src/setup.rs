use crate::story::{ChildGender, UserInput, MAX_PAGE_COUNT, MIN_PAGE_COUNT};
use anyhow::Result;
use inquire::{CustomType, Select, Text};

const STYLE_CHOICES: &[&str] = &["Watercolor", "3D clay", "Cartoon", "Pencil sketch"];

/// Terminal input form: collects the day's description and book preferences.
pub fn collect_input() -> Result<UserInput> {
    let child_name = Text::new("Child's name:").prompt()?;

    let child_gender = Select::new(
        "Gender:",
        vec![ChildGender::Boy, ChildGender::Girl, ChildGender::Other],
    )
    .prompt()?;

    let activity_description = Text::new("What did they do today?")
        .with_help_message("e.g. \"Mia rode a bike for the first time\"")
        .prompt()?;

    let style_preference = Select::new("Illustration style:", STYLE_CHOICES.to_vec())
        .prompt()?
        .to_string();

    let page_count = CustomType::<usize>::new(&format!(
        "Number of pages ({}-{}):",
        MIN_PAGE_COUNT, MAX_PAGE_COUNT
    ))
    .with_default(5)
    .with_error_message("Please enter a number")
    .prompt()?;

    let input = UserInput {
        child_name,
        child_gender,
        activity_description,
        style_preference,
        page_count,
    };
    input.validate()?;
    Ok(input)
}
