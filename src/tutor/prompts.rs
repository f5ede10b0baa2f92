use crate::geometry::GeometryKind;
use crate::problem::ProblemContext;

/// Problem text longer than this (in characters, trimmed) counts as a real
/// problem statement for the opening question.
pub const NON_TRIVIAL_TEXT_CHARS: usize = 10;

pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error. Please try again.";

/// Stands in for a reply that finished without any text.
pub const EMPTY_REPLY_MESSAGE: &str = "(The tutor had nothing to add. Try rephrasing the question.)";

pub fn system_instruction(context: &ProblemContext) -> String {
    format!(
        "You are a patient Socratic tutor for solid geometry.\n\
         The learner is working on a {kind} problem.\n\
         Problem statement: \"{text}\"\n\
         \n\
         Rules:\n\
         - Never hand over the final answer; guide with one question at a time.\n\
         - Each user message may start with a bracketed [Context: ...] block of reference \
         definitions and formulas. Prefer those formulas and quote them exactly.\n\
         - If the shape is unknown or complex, ask the learner to describe its faces and \
         vertices before doing any calculation.\n\
         - Keep replies short and check the learner's reasoning before moving on.",
        kind = context.kind().label(),
        text = context.text(),
    )
}

/// The tutor's first message, chosen before the learner says anything.
pub fn opening_message(context: &ProblemContext) -> String {
    if context.signals_image() {
        return "Thanks for the picture! I can't read images directly yet, so could you \
                type out the measurements shown in it, such as edge lengths, heights or areas?"
            .to_string();
    }
    if context.kind() == GeometryKind::Complex {
        return "This looks like a less common solid. Can you describe it for me: how many \
                faces does it have, what shape is each face, and how many vertices are there?"
            .to_string();
    }
    let kind = context.kind().label().to_lowercase();
    if context.text().trim().chars().count() > NON_TRIVIAL_TEXT_CHARS {
        return format!(
            "Let's work through this {kind} problem together. Looking at what you've given, \
             what is the first variable we need to identify?"
        );
    }
    format!("We have a {kind} to explore. Where would you like to start?")
}

pub fn augmented_prompt(retrieved: &str, user_text: &str) -> String {
    format!("[Context: {retrieved}] User Question: {user_text}")
}

#[cfg(test)]
mod tests {
    use super::{augmented_prompt, opening_message, system_instruction};
    use crate::geometry::GeometryKind;
    use crate::problem::{ImageRef, ProblemContext};

    #[test]
    fn image_opener_takes_priority_over_complex() {
        let context = ProblemContext::from_image(GeometryKind::Complex, ImageRef::new("img"));
        assert!(opening_message(&context).contains("measurements"));
    }

    #[test]
    fn complex_opener_asks_for_faces_and_vertices() {
        let context = ProblemContext::new(GeometryKind::Complex, "A long description of a shape");
        let opener = opening_message(&context);
        assert!(opener.contains("faces"));
        assert!(opener.contains("vertices"));
    }

    #[test]
    fn primitive_openers_never_ask_for_faces() {
        let long = ProblemContext::new(GeometryKind::Cube, "Edge length is 4 cm, find the volume");
        let short = ProblemContext::new(GeometryKind::Pyramid, "pyramid");
        let long_opener = opening_message(&long);
        let short_opener = opening_message(&short);

        assert!(long_opener.contains("first variable"));
        assert!(short_opener.contains("Where would you like to start"));
        for opener in [long_opener, short_opener] {
            assert!(!opener.contains("faces"));
            assert!(!opener.contains("vertices"));
        }
    }

    #[test]
    fn system_instruction_embeds_kind_and_text() {
        let context = ProblemContext::new(GeometryKind::Frustum, "bases 4 and 2, height 3");
        let instruction = system_instruction(&context);
        assert!(instruction.contains("Frustum problem"));
        assert!(instruction.contains("\"bases 4 and 2, height 3\""));
    }

    #[test]
    fn augmented_prompt_brackets_context() {
        assert_eq!(
            augmented_prompt("Definition: x", "why?"),
            "[Context: Definition: x] User Question: why?"
        );
    }
}
