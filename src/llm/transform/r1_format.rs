//! R1-style conversion: no system slot, strictly alternating roles.
//!
//! Input must be canonical. Feeding the output of [`convert_to_r1_format`]
//! back in fails with [`LLMError::Conversion`]: the merge is not idempotent
//! over already-merged input.

use crate::llm::message::{Conversation, Turn};
use crate::llm::types::LLMError;

/// Collapse every run of consecutive same-role turns into one turn.
///
/// Parts of a merged turn keep their chronological order across the run.
/// Turns that already alternate are returned unchanged.
pub fn merge_consecutive_turns(turns: &[Turn]) -> Vec<Turn> {
    let mut merged: Vec<Turn> = Vec::with_capacity(turns.len());

    for turn in turns {
        match merged.last_mut() {
            Some(last) if last.role() == turn.role() => {
                last.append_parts(turn.parts().iter().cloned());
            }
            _ => merged.push(turn.clone()),
        }
    }

    merged
}

/// Fail if any two adjacent turns share a role
pub fn ensure_alternating(turns: &[Turn]) -> Result<(), LLMError> {
    for (index, pair) in turns.windows(2).enumerate() {
        if pair[0].role() == pair[1].role() {
            return Err(LLMError::Conversion(format!(
                "turns {} and {} are both '{}' after merging",
                index,
                index + 1,
                pair[0].role().as_str()
            )));
        }
    }
    Ok(())
}

/// Prepend `system` as a user turn, merge same-role runs, verify alternation.
pub fn convert_to_r1_format(
    system: &str,
    conversation: &Conversation,
) -> Result<Conversation, LLMError> {
    if conversation.is_merged() {
        return Err(LLMError::Conversion(
            "conversation was already merged; R1 conversion expects canonical input".to_string(),
        ));
    }

    let mut turns = Vec::with_capacity(conversation.len() + 1);
    if !system.is_empty() {
        turns.push(Turn::user(system));
    }
    turns.extend(conversation.turns().iter().cloned());

    let merged = merge_consecutive_turns(&turns);
    ensure_alternating(&merged)?;

    Ok(Conversation::merged_from(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::{ContentPart, ImageData, Role};

    #[test]
    fn test_system_becomes_leading_user_turn() {
        let conversation = Conversation::new()
            .with_turn(Turn::assistant("hello"))
            .with_turn(Turn::user("hi"));

        let converted = convert_to_r1_format("be terse", &conversation).unwrap();
        let turns = converted.turns();

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[0].text(), "be terse");
        assert!(converted.is_merged());
    }

    #[test]
    fn test_system_merges_into_first_user_turn() {
        let conversation = Conversation::new().with_turn(Turn::user("question"));

        let converted = convert_to_r1_format("instructions", &conversation).unwrap();

        assert_eq!(converted.len(), 1);
        assert_eq!(converted.turns()[0].text(), "instructions\nquestion");
    }

    #[test]
    fn test_empty_system_is_skipped() {
        let conversation = Conversation::new().with_turn(Turn::user("question"));
        let converted = convert_to_r1_format("", &conversation).unwrap();
        assert_eq!(converted.turns()[0].text(), "question");
    }

    #[test]
    fn test_merge_keeps_images_in_chronological_order() {
        let first = ImageData::new("image/png", vec![1]);
        let second = ImageData::new("image/jpeg", vec![2]);
        let turns = vec![
            Turn::user("a").with_image(first.clone()),
            Turn::user("b").with_image(second.clone()),
        ];

        let merged = merge_consecutive_turns(&turns);

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].parts(),
            &[
                ContentPart::Text("a".into()),
                ContentPart::Image(first),
                ContentPart::Text("b".into()),
                ContentPart::Image(second),
            ]
        );
    }

    #[test]
    fn test_ensure_alternating_reports_position() {
        let turns = vec![Turn::user("a"), Turn::assistant("b"), Turn::assistant("c")];
        let err = ensure_alternating(&turns).unwrap_err();
        assert!(matches!(err, LLMError::Conversion(ref msg) if msg.contains("turns 1 and 2")));
    }

    #[test]
    fn test_second_pass_is_rejected() {
        let conversation = Conversation::new()
            .with_turn(Turn::user("a"))
            .with_turn(Turn::user("b"));

        let once = convert_to_r1_format("sys", &conversation).unwrap();
        let twice = convert_to_r1_format("sys", &once);

        assert!(matches!(twice, Err(LLMError::Conversion(_))));
    }
}
