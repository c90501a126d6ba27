//! Core types for the study assistant

pub mod conversation;
pub mod request;
pub mod response;
pub mod study;
pub mod vector;

pub use conversation::ConversationTurn;
pub use request::{
    ChatRequest, CheckVectorsRequest, DeleteUploadRequest, GenerateVectorsRequest,
    OwnerRequest, QuizResultRequest, TopicRequest,
};
pub use response::{
    ChatResponse, ChatsResponse, Degradation, FlashcardsResponse, IngestResponse,
    McqsResponse, StatusResponse, UploadSummary, UploadsResponse, VectorsExistResponse,
};
pub use study::{Flashcard, Mcq};
pub use vector::{NearestMatch, StoredVector, UploadRecord};
