//! Canonical scoring prompt shared by every provider.

use super::PromptInput;

/// Build the deterministic prompt for one page.
///
/// Technical facts (element counts, alt text, meta description, title presence)
/// are checked locally, so the model is told to leave them out.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let keyword_section = match input.keyword {
        Some(keyword) => format!(
            "**Target Keyword**: {keyword}\n\
             Rate \"keywords\" by how well the content, headings and title target this keyword.\n"
        ),
        None => "**Target Keyword**: none defined. Return 0 for \"keywords\".\n".to_string(),
    };

    format!(
        r#"Analyze the following HTML code of a webpage and provide a rating in the following categories (scale 0-100):

1. **GEO** (Generative Engine Optimization): How well the content can be understood, quoted and summarized by AI answer engines; structured data, clear entities, factual statements
2. **Performance**: Page structure, image optimization, CSS/JS inclusion
3. **Semantics**: Correct HTML5 semantics, heading hierarchy, ARIA labels
4. **Keywords**: Use of the target keyword in title, headings and content structure
5. **Accessibility**: Readable content, meaningful link texts, landmarks, form labels

Also provide concrete improvement suggestions with a type (warning, success or info).

Do NOT report on the number of headings or other elements, image alt attributes, the meta description or the presence of a title tag. These are checked separately.

**Page Title**: {title}

{keyword_section}
**HTML Code**:
```html
{html}
```

**Response Format** (JSON only, no explanations):
```json
{{
  "scores": {{
    "geo": 85,
    "performance": 70,
    "semantics": 95,
    "keywords": 60,
    "accessibility": 80
  }},
  "suggestions": [
    {{"type": "warning", "message": "Content lacks a concise summary near the top"}},
    {{"type": "success", "message": "Clear heading hierarchy"}},
    {{"type": "info", "message": "Consider adding FAQ structured data"}}
  ]
}}
```"#,
        title = input.title,
        keyword_section = keyword_section,
        html = input.html,
    )
}
