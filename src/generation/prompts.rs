//! Message builders for the drafting and tone-correction stages.

use std::sync::LazyLock;

use regex::Regex;

use super::{ChatTurn, Role};
use crate::catalog::{BrandStory, CrmGoal};
use crate::domain::{Persona, Review, Stage};
use crate::retrieval::CrmSnippet;
use crate::retrieval::highlight::clip_chars;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"));
static THINK_UNCLOSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*").expect("static regex"));

/// Removes `<think>` reasoning blocks (closed or trailing) and trims.
pub fn clean_model_output(text: &str) -> String {
    let text = THINK_BLOCK.replace_all(text, "");
    let text = THINK_UNCLOSED.replace_all(&text, "");
    text.trim().to_string()
}

/// `key: value` pairs of the persona joined with ` | `.
pub fn summarize_persona(persona: &Persona) -> String {
    let traits = persona.traits.join(", ");
    [
        ("name", persona.name.as_str()),
        ("skin_type", persona.skin_type.as_str()),
        ("value_focus", persona.value_focus.as_str()),
        ("shopping_style", persona.shopping_style.as_str()),
        ("growth_point", persona.growth_point.as_str()),
        ("traits", traits.as_str()),
    ]
    .into_iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{k}: {v}"))
    .collect::<Vec<_>>()
    .join(" | ")
}

pub struct DraftInput<'a> {
    pub brand: &'a str,
    pub product_name: &'a str,
    pub persona: &'a Persona,
    pub reviews: &'a [Review],
    pub highlights: &'a [String],
}

pub fn drafter_messages(input: &DraftInput<'_>) -> Vec<ChatTurn> {
    let traits = input.persona.traits.join(", ");
    let value_focus = if input.persona.value_focus.is_empty() {
        "제품 품질"
    } else {
        input.persona.value_focus.as_str()
    };
    let reviews = input
        .reviews
        .iter()
        .take(3)
        .map(|r| format!("- {}", clip_chars(&r.text, 150, "")))
        .collect::<Vec<_>>()
        .join("\n");
    let highlights = input
        .highlights
        .iter()
        .take(3)
        .map(|h| format!("- {h}"))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "당신은 마케팅 카피라이터입니다. 아래 정보를 바탕으로 마케팅 초안을 작성하세요.\n\n\
[제품]\n브랜드: {brand}\n제품명: {product}\n\n\
[타겟 페르소나]\n특성: {traits}\n주요 관심사: {value_focus}\n\n\
[고객 리뷰 요약]\n{reviews}\n\n\
[핵심 포인트]\n{highlights}\n\n\
작성 규칙:\n\
1. 반드시 다음 형식을 따르세요:\n[제목]\n(간결하고 임팩트 있게, 30~40자)\n[본문]\n(페르소나 공감과 제품 효과 중심, 200~300자)\n\
2. 리뷰에서 확인 가능한 사실만 사용하세요.\n\
3. 숫자, 할인율, 이벤트명은 절대 사용하지 마세요.\n\
4. 페르소나의 가치관을 반영하되, 페르소나 이름(고객군명)은 절대 직접 언급하지 마세요.\n\
5. 고객을 \"당신\", \"이 제품을 원하는 분들\" 등으로 표현하세요.\n",
        brand = input.brand,
        product = input.product_name,
    );

    let persona_name = if input.persona.name.is_empty() {
        "고객"
    } else {
        input.persona.name.as_str()
    };

    vec![
        ChatTurn::new(
            Role::System,
            format!("{persona_name} 페르소나를 위한 마케팅 전문가입니다."),
        ),
        ChatTurn::new(Role::User, user),
    ]
}

pub struct CorrectionInput<'a> {
    pub draft: &'a str,
    pub persona: &'a Persona,
    pub brand_story: &'a BrandStory,
    pub crm_goal: &'a CrmGoal,
    pub stage: Stage,
    pub crm_snippets: &'a [CrmSnippet],
    pub style_examples: &'a [String],
    pub event_hook: Option<&'a str>,
}

pub fn corrector_messages(input: &CorrectionInput<'_>) -> Vec<ChatTurn> {
    let goal = input.crm_goal;

    let mut sections = Vec::new();
    if !input.crm_snippets.is_empty() {
        let refs = input
            .crm_snippets
            .iter()
            .map(|s| format!("- ({:.3}) {}", s.score, s.text))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("[CRM 유사 사례 (RAG)]\n{refs}"));
    }
    if !input.style_examples.is_empty() {
        let refs = input
            .style_examples
            .iter()
            .map(|t| format!("--- [참고 템플릿] ---\n{t}"))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("[CRM 캠페인 스타일 참고]\n{refs}"));
    }
    if let Some(hook) = input.event_hook {
        sections.push(format!("[이벤트 안내]\n{hook}"));
    }

    let user = format!(
        "다음 초안을 CRM 톤에 맞게 보정하세요. 출력은 JSON 형태로 title/body를 제공합니다.\n\n\
[입력 초안]\n{draft}\n\n\
[페르소나]\n{persona}\n\n\
[브랜드 스토리/톤]\n{story}\n톤 키워드: {tone}\n\n\
[발신 목적]\n스테이지: {stage} ({stage_kr})\n목표: {objective}\n타겟 상태: {target}\n\
허용 맥락: {allowed}\n금지 맥락: {forbidden}\nCTA 스타일: {cta}\n\n\
{extra}\n\n\
규칙:\n\
1) 금지 맥락과 과한 할인/과장 표현을 피하고, 허용 맥락 안에서 자연스럽게 씁니다.\n\
2) 브랜드 톤 키워드를 반영해 어휘와 문장 리듬을 조정합니다.\n\
3) 페르소나의 관심사와 가치 포인트를 한두 군데 녹여 공감도를 높입니다.\n\
4) 발신 목적에 맞는 CTA 문장을 1개 포함합니다.\n\
5) 숫자/변수 자리의 대괄호 템플릿은 유지하되 새로 만들지 않습니다.\n\
6) 출력 형식은 아래 두 줄입니다. 레이블을 그대로 포함하세요.\n\
7) 영어는 줄이고 최대한 한국어로 작성하세요.\n\
[제목] 한 줄 요약 제목\n\
[본문] 페르소나 공감+브랜드 톤 반영 본문 (CTA 포함)\n",
        draft = input.draft,
        persona = summarize_persona(input.persona),
        story = input.brand_story.story,
        tone = input.brand_story.tone_keywords.join(", "),
        stage = input.stage,
        stage_kr = goal.stage_kr,
        objective = goal.objective,
        target = goal.target_state,
        allowed = goal.allowed_context.join(", "),
        forbidden = goal.forbidden_context.join(", "),
        cta = goal.cta_style,
        extra = sections.join("\n\n"),
    );

    vec![
        ChatTurn::new(
            Role::System,
            "당신은 CRM 카피라이터이자 톤 보정 전문가입니다. 간결하고 명료하게 한국어로 답하세요.",
        ),
        ChatTurn::new(Role::User, user),
    ]
}
