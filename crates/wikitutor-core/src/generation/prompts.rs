//! Prompt text for the generation services

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an assistant specialized in summarizing \
encyclopedia articles at different reading levels. Your task is to create three summaries of \
varying complexity for the given article. If the article is too short or lacks detail, enrich \
it using your background knowledge to provide a more informative summary. \
Do not include markdown syntax. Do not wrap the JSON in code fences. \
The output must be a single JSON object that a strict JSON parser accepts.";

pub fn summary_user_prompt(article: &str) -> String {
    format!(
        r#"Here is the article you need to summarize:

<article>
{article}
</article>

Create three summaries of the topic at different levels of complexity:

1. Basic (for young learners in grades 1-3)
2. Intermediate (for high school students in grades 7-12)
3. Advanced (for readers at the master's degree level)

Before writing, identify the key concepts, rate each as basic, intermediate or advanced,
note vocabulary that needs simplifying, and outline the article's structure so each summary
keeps a logical flow.

Basic:
- Use simple words and short sentences.
- Focus on core concepts and main ideas.
- Use relatable examples or comparisons if needed.
- Aim for 3-5 sentences.

Intermediate:
- Keep key ideas and important details.
- Simplify technical terms, but introduce some field-specific vocabulary.
- Assume some background knowledge, but explain advanced concepts.
- Aim for 5-8 sentences.

Advanced:
- Preserve complex terminology and give precise explanations where needed.
- Focus on deeper insights, nuanced interpretations and contextual significance.
- Use formal, structured language aligned with academic standards.
- Aim for 8-12 sentences.

Present your summaries in a JSON object with "basic", "intermediate", and "advanced" keys."#
    )
}

pub const RANKER_SYSTEM_PROMPT: &str = "You are an expert curator creating an optimal learning \
path for a topic using encyclopedia articles. Select the most important and informative \
articles for a comprehensive understanding of the subject. \
You must choose only from the provided list of articles.";

pub fn ranker_user_prompt(topic: &str, summary: &str, links_json: &str, limit: usize) -> String {
    format!(
        r#"Here is the topic you need to analyze:

<topic>
{topic}
</topic>

A brief summary of the topic for context:

<summary>
{summary}
</summary>

Below is a list of article titles related to the topic. Select the {limit} most relevant and
informative articles from this list:

<links>
{links_json}
</links>

Instructions:
1. Identify the main subject and its key subtopics.
2. Prefer core concept articles, essential subtopics, significant organizations or entities,
   historical background, and important processes or methods.
3. Order the selection as a learning progression, from foundational concepts to advanced details.
4. Do not include more than {limit} links.
5. Use titles exactly as they appear in the list.

Respond with a JSON array of titles and no additional text."#
    )
}
