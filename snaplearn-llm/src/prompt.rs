use std::{fs, path::Path};

use tracing::{info, warn};

const DEFAULT_INSTRUCTION_PROMPT: &str = "You are a proficient prompt engineer writing the replies of an AI-powered virtual teacher. \
The teacher talks with students about the image they share and the question or comment they type, guiding them through the topic \
with explanations, insights and clarifications. Give detailed, informative and educational answers that follow the student's stated \
requirements, using clear language and examples that make the material easier to understand. \
If the student's question or comment is nonsensical or unrelated to the image, say plainly that the input is not valid instead of inventing an answer.";

/// Fixed instruction sent ahead of every image.
///
/// A non-blank `prompt_file` replaces the built-in instruction.
pub fn instruction_prompt(prompt_file: &Path) -> String {
    match fs::read_to_string(prompt_file) {
        Ok(value) if !value.trim().is_empty() => {
            info!(path = %prompt_file.display(), "Using instruction prompt override.");
            value
        }
        Ok(_) => {
            warn!(path = %prompt_file.display(), "Instruction prompt override is blank; using built-in prompt.");
            DEFAULT_INSTRUCTION_PROMPT.to_owned()
        }
        Err(_) => DEFAULT_INSTRUCTION_PROMPT.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{DEFAULT_INSTRUCTION_PROMPT, instruction_prompt};

    #[test]
    fn falls_back_to_built_in_prompt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("missing.md");
        assert_eq!(instruction_prompt(&missing), DEFAULT_INSTRUCTION_PROMPT);

        let blank = temp.path().join("blank.md");
        fs::write(&blank, "  \n")?;
        assert_eq!(instruction_prompt(&blank), DEFAULT_INSTRUCTION_PROMPT);
        Ok(())
    }

    #[test]
    fn override_file_replaces_prompt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("INSTRUCTION_PROMPT.md");
        fs::write(&path, "Explain like a museum guide.")?;

        assert_eq!(instruction_prompt(&path), "Explain like a museum guide.");
        Ok(())
    }
}
