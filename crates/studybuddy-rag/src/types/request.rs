//! Request bodies and their validation
//!
//! Every field is optional on the wire so that a missing field becomes a
//! `Validation` error with a readable message instead of a deserializer
//! rejection. Validation runs before any external call is made.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Marker every delete URL must contain; what follows is the storage path
pub const UPLOADS_SEGMENT: &str = "/uploads/";

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require_all<'a, const N: usize>(
    fields: [&'a Option<String>; N],
    message: &str,
) -> Result<[String; N]> {
    let mut values: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = present(field)
            .ok_or_else(|| Error::validation(message))?
            .to_string();
    }
    Ok(values)
}

/// POST /generate_vectors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateVectorsRequest {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Display name for the upload registry (defaults to the URL's last segment)
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Validated ingestion request
#[derive(Debug, Clone, PartialEq)]
pub struct IngestCommand {
    pub locator: String,
    pub owner_id: String,
    pub file_name: Option<String>,
}

impl GenerateVectorsRequest {
    pub fn validate(self) -> Result<IngestCommand> {
        let [locator, owner_id] = require_all(
            [&self.file_url, &self.user_id],
            "Missing file_url or user_id in request",
        )?;
        Ok(IngestCommand {
            locator,
            owner_id,
            file_name: present(&self.file_name).map(str::to_string),
        })
    }
}

/// Any request carrying only an owner (`/check_vectors`, `/get_chats`,
/// `/list_user_uploads`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// POST /check_vectors
pub type CheckVectorsRequest = OwnerRequest;

impl OwnerRequest {
    pub fn validate(self) -> Result<String> {
        let [owner_id] = require_all([&self.user_id], "Missing user_id in request")?;
        Ok(owner_id)
    }
}

/// POST /generate_flashcards and /generate_mcqs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Validated topic request
#[derive(Debug, Clone, PartialEq)]
pub struct TopicCommand {
    pub owner_id: String,
    pub topic: String,
}

impl TopicRequest {
    pub fn validate(self) -> Result<TopicCommand> {
        let [topic, owner_id] = require_all(
            [&self.topic, &self.user_id],
            "Missing topic or user_id in request",
        )?;
        Ok(TopicCommand { owner_id, topic })
    }
}

/// POST /chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Validated chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCommand {
    pub owner_id: String,
    pub message: String,
}

impl ChatRequest {
    pub fn validate(self) -> Result<ChatCommand> {
        let [message, owner_id] = require_all(
            [&self.message, &self.user_id],
            "Missing message or user_id in request",
        )?;
        Ok(ChatCommand { owner_id, message })
    }
}

/// POST /delete_user_uploads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteUploadRequest {
    #[serde(default)]
    pub download_url: Option<String>,
    /// When present, only this owner's vectors of the document are removed
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Validated delete request
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteUploadCommand {
    pub download_url: String,
    /// Object path inside the uploads bucket
    pub relative_path: String,
    pub owner_id: Option<String>,
}

impl DeleteUploadRequest {
    pub fn validate(self) -> Result<DeleteUploadCommand> {
        let [download_url] =
            require_all([&self.download_url], "Missing download_url in request")?;
        let relative_path = download_url
            .split_once(UPLOADS_SEGMENT)
            .map(|(_, rest)| rest.to_string())
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| Error::validation("Invalid download_url format."))?;
        Ok(DeleteUploadCommand {
            download_url,
            relative_path,
            owner_id: present(&self.user_id).map(str::to_string),
        })
    }
}

/// POST /save_quiz_results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizResultRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, rename = "correctAnswers")]
    pub correct_answers: Option<u32>,
    #[serde(default, rename = "totalQuestions")]
    pub total_questions: Option<u32>,
    /// Seconds spent on the quiz
    #[serde(default, rename = "timeTaken")]
    pub time_taken: Option<f64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Validated quiz result
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub owner_id: String,
    pub topic: String,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub time_taken: f64,
}

impl QuizResultRequest {
    pub fn validate(self) -> Result<QuizResult> {
        fn missing(field: &str) -> Error {
            Error::validation(format!("Missing {} in request", field))
        }

        let topic = present(&self.topic).ok_or_else(|| missing("topic"))?.to_string();
        let correct_answers = self.correct_answers.ok_or_else(|| missing("correctAnswers"))?;
        let total_questions = self.total_questions.ok_or_else(|| missing("totalQuestions"))?;
        let time_taken = self.time_taken.ok_or_else(|| missing("timeTaken"))?;
        let owner_id = present(&self.user_id).ok_or_else(|| missing("user_id"))?.to_string();

        if correct_answers > total_questions {
            return Err(Error::validation(
                "correctAnswers cannot exceed totalQuestions",
            ));
        }

        Ok(QuizResult {
            owner_id,
            topic,
            correct_answers,
            total_questions,
            time_taken,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fail_fast() {
        let err = GenerateVectorsRequest {
            file_url: Some("https://host/uploads/a.pdf".into()),
            user_id: None,
            file_name: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Missing file_url or user_id in request"));

        let err = ChatRequest {
            message: Some("   ".into()),
            user_id: Some("u1".into()),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_topic_request_trims() {
        let cmd = TopicRequest {
            topic: Some("  photosynthesis ".into()),
            user_id: Some("u1".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(cmd.topic, "photosynthesis");
    }

    #[test]
    fn test_delete_request_extracts_relative_path() {
        let cmd = DeleteUploadRequest {
            download_url: Some("https://x.supabase.co/storage/v1/object/public/uploads/u1/a.pdf".into()),
            user_id: None,
        }
        .validate()
        .unwrap();
        assert_eq!(cmd.relative_path, "u1/a.pdf");

        let err = DeleteUploadRequest {
            download_url: Some("https://example.com/a.pdf".into()),
            user_id: Some("u1".into()),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_quiz_result_reports_each_missing_field() {
        let err = QuizResultRequest {
            topic: Some("cells".into()),
            correct_answers: Some(3),
            total_questions: None,
            time_taken: Some(12.5),
            user_id: Some("u1".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing totalQuestions in request");
    }

    #[test]
    fn test_quiz_result_wire_names() {
        let req: QuizResultRequest = serde_json::from_str(
            r#"{"topic":"cells","correctAnswers":4,"totalQuestions":5,"timeTaken":30,"user_id":"u1"}"#,
        )
        .unwrap();
        let result = req.validate().unwrap();
        assert_eq!(result.correct_answers, 4);
        assert_eq!(result.time_taken, 30.0);
    }
}
