//! Instructions and expected payload shapes sent with each extraction

use crate::model::{PageTarget, Section};
use serde_json::{json, Value};

/// Instruction for a listing page
pub fn listing_instruction(section: &Section, target: &PageTarget) -> String {
    format!(
        "This is page {} of the \"{}\" archive listing. Extract every post \
         summary shown in the listing in page order: the absolute URL of the \
         post, its title, its publication date as printed, and any categories \
         or tags. Also extract the absolute URL of the next (older) listing \
         page, or null if there is none. Do not invent posts or URLs.",
        target.number, section.name
    )
}

/// Instruction for a detail page
pub fn detail_instruction(section: &Section) -> String {
    format!(
        "This is a single post from the \"{}\" archive (section slug \"{}\"). \
         Extract the post's slug, title, canonical URL, publication date, \
         categories, tags and its full body content as Markdown. Leave out \
         navigation, comments, sharing widgets and related-post lists.",
        section.name, section.slug
    )
}

/// Schema-less instruction used to capture what a listing page actually shows
pub fn diagnostic_instruction(target: &PageTarget) -> String {
    format!(
        "Describe the content of listing page {} in as much structure as \
         possible: every link with its text, any visible dates, and any \
         pagination controls.",
        target.number
    )
}

/// Expected shape of a listing payload
pub fn listing_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "posts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "url": { "type": "string" },
                        "title": { "type": "string" },
                        "date": { "type": ["string", "null"] },
                        "categories": { "type": "array", "items": { "type": "string" } },
                        "tags": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["url", "title"]
                }
            },
            "next_page_url": { "type": ["string", "null"] }
        },
        "required": ["posts"]
    })
}

/// Expected shape of a detail payload
pub fn detail_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "slug": { "type": "string" },
            "title": { "type": "string" },
            "url": { "type": "string" },
            "date": { "type": ["string", "null"] },
            "section": { "type": "string" },
            "categories": { "type": "array", "items": { "type": "string" } },
            "tags": { "type": "array", "items": { "type": "string" } },
            "content": { "type": "string" }
        },
        "required": ["slug", "title", "url", "section", "categories", "tags", "content"]
    })
}
