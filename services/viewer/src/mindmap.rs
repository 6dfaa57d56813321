//! services/viewer/src/mindmap.rs
//!
//! Derives mermaid `mindmap` code from pasted text, for content that was
//! uploaded by hand rather than generated remotely. Rendering is left to the
//! diagram library.

/// Longest label kept for a node, in words.
const LABEL_WORDS: usize = 5;
/// Children kept under each paragraph branch.
const MAX_CHILDREN: usize = 4;
/// Root label when the title has nothing left after sanitizing.
const UNTITLED: &str = "Untitled";

/// Builds a mindmap with the title at the root, one branch per paragraph
/// and the paragraph's following sentences as leaves.
pub fn from_text(title: &str, text: &str) -> String {
    let mut code = String::from("mindmap\n");
    let root = sanitize(title);
    let root = if root.is_empty() { UNTITLED } else { root.as_str() };
    code.push_str(&format!("  root(({}))\n", root));

    for paragraph in paragraphs(text) {
        // Mermaid rejects empty nodes, so sentences that sanitize away are skipped.
        let labels: Vec<String> = chunk_into_sentences(&paragraph)
            .iter()
            .map(|sentence| shorten(sentence))
            .filter(|label| !label.is_empty())
            .collect();
        let Some((first, rest)) = labels.split_first() else {
            continue;
        };
        code.push_str(&format!("    {}\n", first));
        for label in rest.iter().take(MAX_CHILDREN) {
            code.push_str(&format!("      {}\n", label));
        }
    }
    code
}

/// Splits on blank lines; single line breaks stay inside a paragraph.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}

/// A helper function to split a block of text into sentences.
fn chunk_into_sentences(text: &str) -> Vec<String> {
    text.split(|c: char| c == '.' || c == '?' || c == '!')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn shorten(sentence: &str) -> String {
    let words: Vec<&str> = sentence.split_whitespace().take(LABEL_WORDS).collect();
    sanitize(&words.join(" "))
}

/// Mermaid treats brackets and parentheses as node shapes.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTOSYNTHESIS: &str = "Photosynthesis is the process by which green plants use sunlight. \
It generates oxygen as a by-product.

The Calvin cycle occurs in the stroma of chloroplasts. CO2 is fixed into organic molecules. \
The end product is glucose.";

    #[test]
    fn one_branch_per_paragraph() {
        let code = from_text("Photosynthesis", PHOTOSYNTHESIS);
        let expected = "mindmap
  root((Photosynthesis))
    Photosynthesis is the process by
      It generates oxygen as a
    The Calvin cycle occurs in
      CO2 is fixed into organic
      The end product is glucose
";
        assert_eq!(code, expected);
    }

    #[test]
    fn shape_characters_are_stripped() {
        let code = from_text("Cells (Biology)", "Mitochondria [organelle] make ATP.");
        assert!(code.contains("root((Cells Biology))"));
        assert!(code.contains("    Mitochondria organelle make ATP\n"));
    }

    #[test]
    fn children_are_capped() {
        let text = "Root. One. Two. Three. Four. Five. Six.";
        let code = from_text("T", text);
        assert_eq!(code.lines().filter(|l| l.starts_with("      ")).count(), MAX_CHILDREN);
    }

    #[test]
    fn labels_made_only_of_shapes_never_become_empty_nodes() {
        let code = from_text("()", "(). Real sentence here. [].\n\n{}");
        let expected = "mindmap
  root((Untitled))
    Real sentence here
";
        assert_eq!(code, expected);
        assert!(!code.lines().any(|l| l.trim().is_empty()));
    }
}
