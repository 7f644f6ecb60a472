//! Prompts for the plan and story stages

/// Facts block, or an explicit note that nothing was found
fn facts_block(facts: &str) -> &str {
    let facts = facts.trim();
    if facts.is_empty() {
        "(No reference facts were found. Rely on general knowledge and do not invent precise figures.)"
    } else {
        facts
    }
}

/// System role for chat-style backends
pub const STORYTELLER_ROLE: &str = "You are a creative travel storyteller.";

/// Closing instruction: fun fact, then the sources when there are any
fn ending_instruction(topic: &str, links: &[String]) -> String {
    if links.is_empty() {
        return format!("- End with a short fun fact about {}", topic);
    }
    let list: Vec<String> = links.iter().map(|l| format!("  - {}", l)).collect();
    format!(
        "- End with a short fun fact about {}, then a \"Sources\" list with these links:\n{}",
        topic,
        list.join("\n")
    )
}

/// Stage 1: structured outline
pub fn plan_prompt(topic: &str, facts: &str, style: &str) -> String {
    format!(
        r#"You are a creative travel storyteller planning a short story about "{topic}".

## Style
{style}

## Facts
{facts}

## Task
Write a structured plan for the story with these sections:
1. Introduction - where and when the story opens
2. Key moments - the main events, in order
3. Twists - at least one unexpected turn
4. Dialogue - two or three lines the characters might say
5. Little-known facts - details from the facts above worth weaving in
6. Ending - how the story resolves

Answer with the plan only."#,
        topic = topic.trim(),
        style = style.trim(),
        facts = facts_block(facts),
    )
}

/// Stage 2: full narrative following the plan
pub fn story_prompt(topic: &str, plan: &str, facts: &str, style: &str, links: &[String]) -> String {
    format!(
        r#"You are a creative travel storyteller. Write the full story about "{topic}" following the plan below.

## Style
{style}

## Plan
{plan}

## Facts
{facts}

## Requirements
- Markdown, with a title
- At least 700 words
- Follow the plan's structure, including the twist and the dialogue
- Weave in the little-known facts naturally
{ending}

Answer with the story only."#,
        topic = topic.trim(),
        style = style.trim(),
        plan = plan.trim(),
        facts = facts_block(facts),
        ending = ending_instruction(topic.trim(), links),
    )
}
