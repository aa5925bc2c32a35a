use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::error::EvaluatorError;
use crate::candidates::Candidate;

pub const SYSTEM_PROMPT: &str = "너는 마케팅 문장 평가자다.\n\
목표는 “전환 가능성이 더 높은 CRM 메시지”를 고르는 것이다.\n\n\
다음 기준으로 두 응답을 비교하라:\n\
1. 수신자가 실제 행동(클릭/재구매)을 할 가능성\n\
2. persona와 구매 단계 적합성\n\
3. 상품·브랜드 핵심 장점 전달력\n\
4. 불필요한 장식 없이 명확한가\n\n\
더 나은 쪽을 선택하라.";

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("static regex"));

#[derive(Debug, Serialize)]
pub struct ContentBlock<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct InputMessage<'a> {
    pub role: &'static str,
    pub content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JudgeRequest<'a> {
    pub model: &'a str,
    pub input: Vec<InputMessage<'a>>,
}

/// Context block followed by the candidates, each tagged with its response id.
pub fn user_prompt(prompt: &str, candidates: &[Candidate]) -> String {
    let block = candidates
        .iter()
        .map(|c| format!("[{}] {}", c.response_id, c.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("요약:\n{prompt}\n\n후보:\n{block}\n\n더 나은 후보의 인덱스만 정수로 반환하라.")
}

pub fn build_request<'a>(model: &'a str, user: &'a str) -> JudgeRequest<'a> {
    let message = |role, text| InputMessage {
        role,
        content: vec![ContentBlock {
            kind: "input_text",
            text,
        }],
    };
    JudgeRequest {
        model,
        input: vec![message("system", SYSTEM_PROMPT), message("user", user)],
    }
}

/// Reply text from either a top-level `output_text` or `output[].content[]` blocks.
pub fn extract_response_text(data: &Value) -> Result<String, EvaluatorError> {
    if let Some(text) = data.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Ok(text.trim().to_string());
        }
    }

    if let Some(output) = data.get("output").and_then(Value::as_array) {
        let mut parts: Vec<&str> = Vec::new();
        for item in output.iter().filter_map(Value::as_object) {
            match item.get("content") {
                Some(Value::Array(blocks)) => {
                    for block in blocks {
                        match block {
                            Value::String(s) => parts.push(s),
                            Value::Object(obj) => {
                                if let Some(text) = obj.get("text").and_then(Value::as_str) {
                                    parts.push(text);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Some(Value::String(s)) => parts.push(s),
                _ => {}
            }
        }
        if !parts.is_empty() {
            return Ok(parts.concat().trim().to_string());
        }
    }

    Err(EvaluatorError::InvalidResponse(
        crate::retrieval::highlight::clip_chars(&data.to_string(), 300, "..."),
    ))
}

/// First integer-looking substring of the reply (may be negative).
pub fn parse_choice(reply: &str) -> Result<i64, EvaluatorError> {
    INTEGER
        .find(reply)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| EvaluatorError::NoInteger(reply.to_string()))
}

/// Position of the chosen candidate: response id first, then list index.
pub fn resolve_choice(choice: i64, candidates: &[Candidate]) -> Result<usize, EvaluatorError> {
    if let Some(pos) = candidates.iter().position(|c| c.response_id == choice) {
        return Ok(pos);
    }
    usize::try_from(choice)
        .ok()
        .filter(|&i| i < candidates.len())
        .ok_or(EvaluatorError::UnresolvedChoice {
            choice,
            count: candidates.len(),
        })
}
