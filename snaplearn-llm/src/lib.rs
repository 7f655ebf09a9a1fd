pub mod client;
pub mod extraction;
pub mod intake;
pub mod prompt;
pub mod vision;

pub use client::{GeminiConfig, GeminiService};
pub use extraction::{NormalizeError, normalize_response};
pub use intake::{ImagePayload, IntakeError, UploadedFile, intake_image};
pub use vision::{RawResponse, RequestPart, VisionModel, VisionRequest};
