use crate::cafes;
use crate::prompts::{
    DESCRIPTION_FALLBACK, GUIDE_SYSTEM_PROMPT, PLACE_USER_PROMPT,
};
use crate::weather;
use crate::AppState;
use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs,
};
use std::fmt::Write;
use std::time::Duration;
use tracing::{instrument, warn};

/// Joins the weather block and the per-place sections.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

pub const REVIEW_HEADER: &str = "📝 방문자 리뷰:";

/// Separator between a section's title line and its body.
const TITLE_RULE: &str = "──────────";

/// Shown when the user submits nothing but commas and whitespace.
pub const EMPTY_INPUT_HINT: &str =
    "궁금한 관광지 이름을 입력해 주세요! (예: 청남대, 문의문화재단지)";

const DESCRIPTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Split user input into place names: comma-separated, trimmed, empty
/// entries discarded, input order preserved.
pub fn split_places(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn build_place_messages(
    place: &str,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let system = ChatCompletionRequestSystemMessageArgs::default()
        .content(GUIDE_SYSTEM_PROMPT)
        .build()?;
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(PLACE_USER_PROMPT.replace("{place}", place))
        .build()?;
    Ok(vec![
        ChatCompletionRequestMessage::System(system),
        ChatCompletionRequestMessage::User(user),
    ])
}

/// Ask the language model for a description of one place.
///
/// This never errors: a missing client, a failed call, a timeout, or an
/// empty completion all degrade to the fixed fallback sentence so the
/// rest of the submission keeps going.
#[instrument(skip(state))]
async fn describe_place(state: &AppState, place: &str) -> String {
    let Some(client) = state.openai_client.as_ref() else {
        warn!("No OpenAI client configured, using description fallback");
        return DESCRIPTION_FALLBACK.to_string();
    };

    let messages = match build_place_messages(place) {
        Ok(messages) => messages,
        Err(e) => {
            warn!("Failed to build description prompt: {}", e);
            return DESCRIPTION_FALLBACK.to_string();
        }
    };

    let call =
        client.chat_completion(state.chat_model.clone(), messages);
    match tokio::time::timeout(DESCRIPTION_TIMEOUT, call).await {
        Ok(Ok(response)) => response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(|content| content.trim())
            .filter(|content| !content.is_empty())
            .map(String::from)
            .unwrap_or_else(|| DESCRIPTION_FALLBACK.to_string()),
        Ok(Err(e)) => {
            warn!("Description request for '{}' failed: {}", place, e);
            DESCRIPTION_FALLBACK.to_string()
        }
        Err(_) => {
            warn!("Description request for '{}' timed out", place);
            DESCRIPTION_FALLBACK.to_string()
        }
    }
}

/// Render one per-place section: title, rule, description, then the
/// review block (omitted when empty) and the café block.
pub fn render_place_section(
    place: &str,
    description: &str,
    site_reviews: &[String],
    cafe_block: &str,
) -> String {
    let mut section =
        format!("📍 **{}**\n{}\n{}", place, TITLE_RULE, description);
    if !site_reviews.is_empty() {
        write!(section, "\n\n{}", REVIEW_HEADER).unwrap();
        for review in site_reviews {
            write!(section, "\n- {}", review).unwrap();
        }
    }
    write!(section, "\n\n{}", cafe_block).unwrap();
    section
}

/// Concatenate the weather block and per-place sections in order.
pub fn assemble(weather_block: &str, sections: &[String]) -> String {
    let mut blocks = Vec::with_capacity(sections.len() + 1);
    blocks.push(weather_block.to_string());
    blocks.extend(sections.iter().cloned());
    blocks.join(SECTION_SEPARATOR)
}

/// Produce the full response for one user submission.
///
/// Collaborator calls run sequentially, one per place plus one weather
/// lookup; the catalog lookups themselves are pure reads.
#[instrument(skip(state))]
pub async fn respond(state: &AppState, user_input: &str) -> String {
    let places = split_places(user_input);

    let weather = weather::weather_block(
        state.weather_client.as_ref(),
        &state.weather_location,
        state.timezone,
    )
    .await;

    if places.is_empty() {
        return assemble(&weather, &[EMPTY_INPUT_HINT.to_string()]);
    }

    let mut sections = Vec::with_capacity(places.len());
    for place in &places {
        let rows = state.catalog.matches(place);
        let description = describe_place(state, place).await;
        let site_reviews =
            cafes::summarize_reviews(&rows, &state.placeholder_reviews);
        let cafe_block = cafes::format_cafes(&rows, &state.placeholder_reviews);
        sections.push(render_place_section(
            place,
            &description,
            &site_reviews,
            &cafe_block,
        ));
    }

    assemble(&weather, &sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_places_trims_and_drops_empties() {
        assert_eq!(
            split_places(" 청남대 , 문의문화재단지 ,, "),
            vec!["청남대", "문의문화재단지"]
        );
        assert_eq!(split_places(",,,"), Vec::<String>::new());
        assert_eq!(split_places("청남대"), vec!["청남대"]);
    }

    #[test]
    fn assemble_puts_weather_first_and_preserves_order() {
        let joined = assemble(
            "날씨 블록",
            &["첫째 구역".to_string(), "둘째 구역".to_string()],
        );
        assert_eq!(joined, "날씨 블록\n\n---\n\n첫째 구역\n\n---\n\n둘째 구역");
    }

    #[test]
    fn section_omits_review_block_when_no_reviews_survive() {
        let section =
            render_place_section("청남대", "설명 텍스트", &[], "카페 블록");
        assert!(!section.contains(REVIEW_HEADER));
        assert!(section.contains("설명 텍스트"));
        assert!(section.ends_with("카페 블록"));
    }

    #[test]
    fn section_lists_site_reviews_after_description() {
        let reviews =
            vec!["경치가 좋아요".to_string(), "주차가 편해요".to_string()];
        let section =
            render_place_section("청남대", "설명", &reviews, "카페 블록");
        assert!(section.contains(REVIEW_HEADER));
        assert!(section.contains("- 경치가 좋아요"));
        assert!(section.contains("- 주차가 편해요"));
        let description_at = section.find("설명").unwrap();
        let reviews_at = section.find(REVIEW_HEADER).unwrap();
        let cafes_at = section.find("카페 블록").unwrap();
        assert!(description_at < reviews_at && reviews_at < cafes_at);
    }
}
