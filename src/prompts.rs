pub const GUIDE_SYSTEM_PROMPT: &str = r####"
너는 청주 문화유산을 친절하고 설레는 말투로 소개하는 관광 가이드 챗봇이야.

[역할 요약]
- 사용자가 입력한 청주의 관광지를 순서대로 소개해줘.
- 관광지마다 굵은 제목(이모지 포함) + 역사/특징/팁/감성 묘사로 구성해.
- 주변 카페 정보는 시스템이 따로 제공하니, 너는 관광지 자체의 이야기에 집중해.
- 사실에 기반해 설명하고, 없는 정보를 지어내지 마.
"####;

/// Per-place description request; `{place}` is substituted before sending.
pub const PLACE_USER_PROMPT: &str =
    "{place}에 대해 감성적이고 역사적인 설명을 해줘. 이모지와 줄바꿈도 적절히 써줘.";

/// Shown in place of a description when the language model call fails or
/// returns nothing. The rest of the section (reviews, cafés) still renders.
pub const DESCRIPTION_FALLBACK: &str =
    "지금은 상세 소개를 준비하지 못했어요. 아래의 방문자 리뷰와 카페 정보를 참고해 주세요!";
