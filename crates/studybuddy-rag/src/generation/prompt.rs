//! Prompt templates for chat, flashcards and quizzes

/// Prompt builder for study requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Chat prompt: persona, document content, history, question, tone
    pub fn chat_prompt(document_content: &str, transcript: &str, message: &str) -> String {
        format!(
            r#"You are StudyBuddy chatbot.
Based on the following information from the document:
{document_content}

And considering this conversation history:
{transcript}

Current question: {message}

Please respond in a warm, friendly manner as if you are chatting with a friend. Your response should:
- Address the question directly using relevant document information
- Use a conversational, natural tone
- Show empathy and understanding
- Include light acknowledgments of the user's question
- Avoid overly formal or technical language unless necessary
- Keep responses concise but complete
- End with a friendly follow-up question when appropriate

Balance being informative with being personable."#
        )
    }

    /// Flashcard prompt asking for a raw JSON array of `{front, back}`
    pub fn flashcard_prompt(document_content: &str, topic: &str, count: usize) -> String {
        format!(
            r#"Based on the following information from the document:
{document_content}

Generate exactly {count} unique flashcards on the topic "{topic}" in valid JSON format.

Each flashcard must:
- Cover a distinct concept or piece of information
- Not overlap significantly with other flashcards
- Have "front": A concise question or keyword
- Have "back": A short, clear explanation or answer

Before finalizing, verify that each flashcard addresses a different aspect of the topic.

Strictly return only a JSON array, like this:
[
  {{"front": "What is Newton's First Law?", "back": "An object at rest stays at rest unless acted upon by an external force."}},
  {{"front": "What is the capital of France?", "back": "Paris"}}
]

DO NOT include any extra text or explanations. Return only JSON."#
        )
    }

    /// MCQ prompt asking for a raw JSON array of four-option questions
    pub fn mcq_prompt(document_content: &str, topic: &str, count: usize) -> String {
        format!(
            r#"Based on the following information from the document:
{document_content}

Generate exactly {count} unique multiple-choice questions (MCQs) on the topic "{topic}".
Each MCQ must:
- Cover a distinct concept or fact from the document
- Not overlap significantly with other questions
- Test different aspects of the topic

Each MCQ must contain exactly four fields:
- "question": A concise question.
- "options": An array of exactly 4 unique answer options.
- "correct_answer": The correct answer, which must be one of the 4 options.
- "explanation": A brief explanation of the correct answer.

Your response must be a valid JSON array and nothing else. Do not include any explanations, markdown formatting, or code blocks. Return the raw JSON array only.

Here's the exact format:
[
  {{"question": "What is the capital of France?", "options": ["Berlin", "Madrid", "Paris", "Rome"], "correct_answer": "Paris", "explanation": "Paris is the capital of France."}},
  {{"question": "Which element has the atomic number 1?", "options": ["Helium", "Oxygen", "Hydrogen", "Nitrogen"], "correct_answer": "Hydrogen", "explanation": "Hydrogen has atomic number 1."}}
]"#
        )
    }
}
