//! Prompt construction for relation proposals

use crate::annotation::Span;

/// Context characters sent along with a relation question
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 2000;

/// One numbered line per entity: `0. [person] "孔子" (0-2)`
pub fn entity_listing(spans: &[Span]) -> String {
    spans
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. [{}] \"{}\" ({}-{})", i, s.label, s.text, s.start, s.end))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The document excerpt sent as context: at most `max_chars` characters.
pub fn context_excerpt(plain_text: &str, max_chars: usize) -> String {
    plain_text.chars().take(max_chars).collect()
}

/// Question asking the service to relate entities by list position.
pub fn relation_question(spans: &[Span]) -> String {
    format!(
        "以下是从原文中标注出的实体列表（序号从0开始）：\n\
         {}\n\n\
         请根据原文内容，找出这些实体之间存在的关系（如君臣、父子、师生、征伐、位于等）。\n\
         只返回JSON，不要输出其他文字，格式如下：\n\
         {{\"relations\": [{{\"entity1Index\": 0, \"entity2Index\": 1, \"relationName\": \"关系名称\"}}]}}\n\
         entity1Index 与 entity2Index 必须是上面列表中的序号，且不能相同。",
        entity_listing(spans)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_numbers_from_zero() {
        let spans = vec![
            Span::new(0, 2, "person", "孔子"),
            Span::new(3, 4, "place", "齊"),
        ];
        assert_eq!(entity_listing(&spans), "0. [person] \"孔子\" (0-2)\n1. [place] \"齊\" (3-4)");
        assert!(relation_question(&spans).contains("\"relationName\""));
    }

    #[test]
    fn excerpt_counts_characters() {
        let text = "天".repeat(2500);
        assert_eq!(context_excerpt(&text, DEFAULT_MAX_CONTEXT_CHARS).chars().count(), 2000);
        assert_eq!(context_excerpt("短", 2000), "短");
    }
}
