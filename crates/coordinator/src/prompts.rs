//! Prompt text for each request kind.
//!
//! Every builder is a pure function of its arguments. File contents are cut
//! to a per-kind character budget and marked when truncated.

use services::file_reader::ReadFile;

pub const EXPLAIN_FILE_CHARS: usize = 10_000;
pub const EXPLAIN_EDITOR_CHARS: usize = 15_000;
pub const EDIT_TARGET_CHARS: usize = 20_000;
pub const EDIT_CONTEXT_CHARS: usize = 5_000;

pub const TRUNCATION_MARKER: &str = "\n[... content truncated ...]\n";

const TOOL_PREAMBLE: &str =
    "You are a helpful assistant integrated into a development tool called GemNet.\n";

/// First `limit` characters of `content`, plus the marker when anything was cut.
pub fn truncate(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &content[..byte_idx], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

pub fn explain_files(files: &[ReadFile]) -> String {
    let mut prompt = String::from(TOOL_PREAMBLE);
    prompt.push_str(
        "Please explain the purpose and high-level functionality of the following file(s):\n\n",
    );
    for file in files {
        prompt.push_str(&format!("--- File: {} ---\n", file.file_name()));
        prompt.push_str(&truncate(&file.content, EXPLAIN_FILE_CHARS));
        prompt.push_str("---\n");
    }
    prompt.push_str("Provide the explanation below:");
    prompt
}

pub fn explain_editor(label: &str, content: &str) -> String {
    let mut prompt = String::from(TOOL_PREAMBLE);
    prompt.push_str(&format!(
        "Please explain the purpose and high-level functionality of the following code/text \
         currently open in the editor tab (source file: '{label}'):\n\n"
    ));
    prompt.push_str("--- Editor Content ---\n");
    prompt.push_str(&truncate(content, EXPLAIN_EDITOR_CHARS));
    prompt.push_str("\n---\n");
    prompt.push_str("Provide the explanation below:");
    prompt
}

/// `context_files` are supplementary files shown after the edit target.
pub fn edit(
    target_label: &str,
    target_content: &str,
    instructions: &str,
    context_files: &[&ReadFile],
) -> String {
    let mut prompt = String::from(
        "You are a helpful coding assistant integrated into a development tool called GemNet.\n",
    );
    prompt.push_str(&format!(
        "The user wants to modify the code/text (currently in '{target_label}' if known, \
         otherwise in the editor tab) based on the following instructions.\n"
    ));
    if !context_files.is_empty() {
        prompt.push_str(
            "Additional context from other selected files is provided below the main content.\n",
        );
    }
    prompt.push_str(&format!("Instructions: '{instructions}'\n\n"));
    prompt.push_str(&format!(
        "--- Content to Edit ('{target_label}' or Current Tab) ---\n"
    ));
    prompt.push_str(&truncate(target_content, EDIT_TARGET_CHARS));
    prompt.push_str("\n---\n");

    for file in context_files {
        prompt.push_str(&format!("\n--- Context File: {} ---\n", file.file_name()));
        prompt.push_str(&truncate(&file.content, EDIT_CONTEXT_CHARS));
        prompt.push_str("\n---\n");
    }

    prompt.push_str(
        "\nBased ONLY on the provided content and instructions, generate the COMPLETE, modified content.\n",
    );
    prompt.push_str(
        "IMPORTANT: Output *only* the raw, modified code/text. Do not include explanations, \
         introductions, apologies, ```markdown formatting```, or any text other than the content itself.",
    );
    prompt
}

pub fn create_file(filename: &str, description: &str) -> String {
    let mut prompt = String::from("You are a helpful file generation assistant called GemNet.\n");
    prompt.push_str(&format!(
        "The user wants to create a file named '{filename}' with the following purpose/content described:\n"
    ));
    prompt.push_str(&format!("Description: '{description}'\n\n"));
    prompt.push_str("Generate ONLY the raw file content based on the description.\n");
    prompt.push_str(
        "IMPORTANT: Do NOT include the filename, explanations, introductions, apologies, \
         ```markdown formatting```, or any text other than the required file content itself.",
    );
    prompt
}

pub fn chat(message: &str) -> String {
    format!(
        "You are a helpful assistant called GemNet. Respond concisely and helpfully.\n\nUser: {message}\n\nAssistant:"
    )
}
