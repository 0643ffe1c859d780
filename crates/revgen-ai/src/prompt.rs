//! Prompt assembly for review generation.

use std::fmt::Write;

use crate::client::ReviewRequest;

/// System prompt: establishes the persona and the strict JSON output
/// contract the client parses against.
#[must_use]
pub fn system_prompt(language: &str) -> String {
    format!(
        "You are a customer of an online shop writing a short, natural product \
         review in the language with ISO code '{language}'. \
         Vary tone and length; avoid marketing phrases and superlatives in every \
         sentence. \
         Respond with a single JSON object with exactly these keys: \
         \"reviewer_name\" (a plausible first name, optionally with a last \
         initial), \"rating\" (an integer from 1 to 5, mostly 4 or 5), \
         \"title\" (a short headline), \"content\" (two to five sentences)."
    )
}

/// User prompt: names the product and shop and includes recent real reviews
/// as few-shot samples when available.
#[must_use]
pub fn user_prompt(request: &ReviewRequest<'_>) -> String {
    let mut prompt = format!(
        "Write one review for the product \"{}\" sold by \"{}\".",
        request.product_name, request.shop_name
    );

    if !request.samples.is_empty() {
        prompt.push_str(
            "\n\nHere are recent real reviews from this shop; match their \
             overall tone and length, but do not copy phrases:\n",
        );
        for sample in request.samples {
            let _ = write!(
                prompt,
                "\n- [{}/5] {}: {}",
                sample.rating, sample.title, sample.content
            );
        }
    }

    prompt
}
