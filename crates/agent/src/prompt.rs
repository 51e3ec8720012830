//! Prompt construction for the decision channel.
//!
//! The system prompt carries the case and the standing rules; the user
//! message carries the current screen, the recent action history, and the
//! iteration counter. Both are rebuilt deterministically every call.

use redress_types::CaseContext;

/// How many prior action descriptions the model gets to see.
const HISTORY_WINDOW: usize = 10;

/// Builds the per-run system prompt.
pub fn system_prompt(case: &CaseContext) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(
        "You are a customer-support assistant operating a mobile app on behalf of a customer. \
         You see the app screen as structured text and act through the tools provided.\n\n",
    );

    prompt.push_str(&format!("Customer: {}\n", case.customer_name));
    prompt.push_str(&format!("Issue: {}\n", case.issue));
    prompt.push_str(&format!("Desired outcome: {}\n", case.desired_outcome));
    if let Some(order_id) = &case.order_id {
        prompt.push_str(&format!("Order id: {}\n", order_id));
    }
    if case.has_attachments {
        prompt.push_str(
            "Evidence: the customer attached supporting files; upload them if the app asks for proof.\n",
        );
    }

    prompt.push_str(
        "\nNavigation strategy:\n\
         - Find the app's help, support, or chat section first; order pages often link to support.\n\
         - Prefer visible labels; scroll before assuming something is missing.\n\
         - If a screen is wrong, press back rather than improvising.\n",
    );

    prompt.push_str(
        "\nRules:\n\
         - Speak as the customer, in first person. Never identify yourself as automation.\n\
         - Never type credentials, card numbers, or government identifiers. If the app demands \
           sensitive data, request human review instead.\n\
         - Do not type into search bars; use them only by tapping suggested entries.\n\
         - Dismiss popups and promotions that block the flow.\n\
         - After sending a message, wait for the reply before acting again.\n\
         - Mark the case resolved only when the app confirms the outcome, not when you have merely asked.\n",
    );

    prompt
}

/// Builds the per-iteration user message.
pub fn user_message(
    case: &CaseContext,
    formatted_screen: &str,
    history: &[String],
    iteration: u32,
    max_iterations: u32,
) -> String {
    let mut message = String::with_capacity(formatted_screen.len() + 1024);

    message.push_str(&format!("Target app: {}\n\n", case.target_platform));
    message.push_str("Current screen:\n");
    message.push_str(formatted_screen);

    let window_start = history.len().saturating_sub(HISTORY_WINDOW);
    let window = &history[window_start..];
    if !window.is_empty() {
        message.push_str("\nPrevious actions:\n");
        for (offset, entry) in window.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", window_start + offset + 1, entry));
        }
    }

    message.push_str(&format!("\nIteration {} of {}.\n", iteration, max_iterations));
    message.push_str("Choose exactly one tool that makes the most progress on the case.\n");

    message
}
