//! Prompt builder for poet and critic invocations
//!
//! Constructs the full prompt for each gateway call:
//! - The role persona and the double dactyl form requirements
//! - On retries, the previous poem, the critic's feedback, and the
//!   escalation tone instruction
//! - For the critic, the poem under review and the expected verdict shape

use dactyl_core::PoemState;

use crate::escalation::escalate;

/// Role -> prompt-template mapping, constructed directly by the controller
///
/// Plain data instead of any registration mechanism: whoever builds the
/// loop owns the personas and can swap them wholesale.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    /// Who the poet is
    pub poet_persona: String,
    /// Who the critic is
    pub critic_persona: String,
    /// The double dactyl form requirements, shared by both roles
    pub form_requirements: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            poet_persona: "You are a witty poet who specializes in the double dactyl form. \
                           You take pride in your work and your comedic timing."
                .to_string(),
            critic_persona: "You are an exacting critic of light verse. You judge double \
                             dactyl poems strictly against the form requirements and point \
                             to specific lines when they fail."
                .to_string(),
            form_requirements: "\
1. Two stanzas of four lines each\n\
2. First three lines of each stanza are dactylic (stressed-unstressed-unstressed)\n\
3. Fourth line of each stanza is a single dactyl followed by a stressed syllable\n\
4. First line of first stanza must be a nonsense phrase\n\
5. Second line of first stanza must be a name (person, place, or thing)\n\
6. Sixth line must be a single word\n\
7. All lines must rhyme with their corresponding lines in the other stanza\n\
8. The poem should be humorous or witty"
                .to_string(),
        }
    }
}

/// Build the poet's prompt for a round
///
/// Round 1 asks for a fresh poem. Later rounds are revision prompts that
/// quote the previous poem and the critic's feedback, with the escalation
/// tone instruction for the current retry count.
pub fn build_generation_prompt(templates: &PromptTemplates, state: &PoemState) -> String {
    let mut prompt = String::new();

    prompt.push_str(&templates.poet_persona);
    prompt.push_str("\n\n");

    match (&state.previous_poem, &state.feedback) {
        (Some(previous), Some(feedback)) => {
            prompt.push_str("Revise your double dactyl poem based on the critic's feedback.\n\n");

            prompt.push_str("Your previous poem:\n<poem>\n");
            prompt.push_str(previous);
            prompt.push_str("\n</poem>\n\n");

            prompt.push_str("Critic's feedback:\n<feedback>\n");
            prompt.push_str(feedback);
            prompt.push_str("\n</feedback>\n\n");

            prompt.push_str(escalate(state.retry_count));
            prompt.push_str(
                " However, you must still follow the double dactyl form requirements:\n",
            );
            prompt.push_str(&templates.form_requirements);
            prompt.push_str(
                "\n\nIncorporate the feedback while maintaining your artistic vision. \
                 Respond with the revised poem only.",
            );
        }
        _ => {
            prompt.push_str(
                "Write a double dactyl poem. It must follow these form requirements:\n",
            );
            prompt.push_str(&templates.form_requirements);
            prompt.push_str("\n\nRespond with the poem only.");
        }
    }

    prompt
}

/// Build the critic's prompt for a poem
///
/// Asks for a structured JSON verdict; the loop still copes when the model
/// answers in prose instead.
pub fn build_validation_prompt(templates: &PromptTemplates, poem: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&templates.critic_persona);
    prompt.push_str("\n\n");

    prompt.push_str("Validate the following poem against the double dactyl form requirements:\n");
    prompt.push_str(&templates.form_requirements);
    prompt.push_str("\n\nThe poem:\n<poem>\n");
    prompt.push_str(poem);
    prompt.push_str("\n</poem>\n\n");

    prompt.push_str(
        "Respond with JSON of the shape \
         {\"valid\": true|false, \"issues\": [{\"line_number\": <n>, \"problem\": \"<text>\"}]}. \
         If the poem meets every requirement, say it is approved with an empty issue list.",
    );

    prompt
}
