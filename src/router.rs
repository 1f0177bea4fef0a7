//! Decides whether a message is addressed to the bot and pulls out the query.

use crate::{
    message::{Mention, MessageEvent},
    slack::{Block, RichTextElement, RichTextSection},
};

/// Finds the first rich text section that mentions `bot_user_id` and carries
/// text, and turns it into a [`Mention`].
///
/// Blocks and sections are scanned in order and the scan stops at the first
/// qualifying section. A section that mentions the bot but has no text does
/// not borrow text from its neighbours.
pub fn route(event: &MessageEvent, bot_user_id: &str) -> Option<Mention> {
    let query = event
        .blocks
        .iter()
        .flatten()
        .flat_map(rich_text_sections)
        .find_map(|section| section_query(section, bot_user_id))?;

    Some(Mention {
        query: query.to_string(),
        thread_id: event.thread_id().to_string(),
        channel: event.channel.clone(),
        ts: event.ts.clone(),
    })
}

fn rich_text_sections(block: &Block) -> &[RichTextSection] {
    match block {
        Block::RichText {
            elements: Some(sections),
            ..
        } => sections,
        _ => &[],
    }
}

fn section_query<'a>(section: &'a RichTextSection, bot_user_id: &str) -> Option<&'a str> {
    let elements = section.elements.as_deref()?;

    let mentioned = elements.iter().any(|element| {
        matches!(element, RichTextElement::User { user_id } if user_id == bot_user_id)
    });

    if !mentioned {
        return None;
    }

    elements.iter().find_map(|element| match element {
        RichTextElement::Text { text } => Some(text.as_str()),
        _ => None,
    })
}
