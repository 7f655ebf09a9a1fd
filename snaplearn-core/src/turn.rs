use anyhow::Context as _;
use snaplearn_ledger::ChatTurn;
use snaplearn_llm::{
    IntakeError, NormalizeError, UploadedFile, VisionRequest, intake_image, normalize_response,
};
use snaplearn_utils::formatting::{excerpt, image_data_url};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::Data;

/// Why a submission did not produce an answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("no image was uploaded")]
    MissingImage,
    #[error("unsupported image: {0}")]
    UnsupportedImageType(String),
    #[error("remote service error: {0:#}")]
    RemoteService(anyhow::Error),
    #[error("malformed model response: {0}")]
    MalformedResponse(#[from] NormalizeError),
}

impl From<IntakeError> for TurnError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::MissingImage => Self::MissingImage,
            IntakeError::UnsupportedType { file_name } => Self::UnsupportedImageType(file_name),
        }
    }
}

impl TurnError {
    /// Message shown on the page.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingImage => "Please upload an image first.",
            Self::UnsupportedImageType(_) => "Please upload a jpg, jpeg or png image.",
            Self::RemoteService(_) => {
                "The model could not be reached right now. Please try again."
            }
            Self::MalformedResponse(_) => {
                "The model replied in a format that could not be read. Please try again."
            }
        }
    }

    /// Input problems the user can fix, as opposed to failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::MissingImage | Self::UnsupportedImageType(_))
    }
}

/// A turn that produced an answer.
#[derive(Clone, Debug)]
pub struct CompletedTurn {
    pub turn: ChatTurn,
    /// `data:` URL of the submitted image.
    pub image_preview: String,
    /// Whether the turn reached the ledger.
    pub saved: bool,
}

/// Run one submission: intake, remote call, normalization, then the ledger append.
///
/// Nothing is written to the ledger unless an answer was extracted.
pub async fn run_turn(
    data: &Data,
    user_input: &str,
    upload: Option<UploadedFile>,
) -> Result<CompletedTurn, TurnError> {
    let image = intake_image(upload)?;
    let image_preview = image_data_url(&image.mime_type, &image.bytes);

    let _gate = data.turn_gate().lock().await;
    info!(mime_type = %image.mime_type, image_bytes = image.bytes.len(), "Processing turn.");
    debug!(prompt = %excerpt(user_input, 80), "turn prompt");

    let request = VisionRequest::compose(&data.instruction, image, user_input);
    let raw = data
        .llm
        .generate(&request)
        .await
        .map_err(TurnError::RemoteService)?;
    drop(request);

    let answer = normalize_response(&raw).inspect_err(|err| {
        warn!(?err, "model reply could not be normalized");
    })?;
    debug!(answer = %excerpt(&answer, 80), "turn answer");

    if !data.reveal_delay.is_zero() {
        tokio::time::sleep(data.reveal_delay).await;
    }

    let turn = ChatTurn::now(user_input, answer);
    let saved = match append_to_ledger(data, &turn).await {
        Ok(()) => true,
        Err(err) => {
            error!(?err, path = %data.ledger.path().display(), "failed to save turn to history");
            false
        }
    };

    info!(saved, "Turn complete.");
    Ok(CompletedTurn {
        turn,
        image_preview,
        saved,
    })
}

async fn append_to_ledger(data: &Data, turn: &ChatTurn) -> anyhow::Result<()> {
    let ledger = data.ledger.clone();
    let turn = turn.clone();
    tokio::task::spawn_blocking(move || ledger.append(&turn))
        .await
        .context("ledger append task failed")?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use snaplearn_ledger::Ledger;
    use tokio::sync::Notify;
    use tokio::time::Instant;
    use snaplearn_llm::{
        NormalizeError, RawResponse, RequestPart, UploadedFile, VisionModel, VisionRequest,
    };

    use super::{TurnError, run_turn};
    use crate::Data;

    #[derive(Debug)]
    enum Reply {
        Text(&'static str),
        NonText,
        Empty,
        Fail,
    }

    #[derive(Debug)]
    struct FakeModel {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionModel for FakeModel {
        async fn generate(&self, request: &VisionRequest) -> anyhow::Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(matches!(request.parts().first(), Some(RequestPart::Text(text)) if text == "Teach."));
            assert!(matches!(request.parts().get(1), Some(RequestPart::Image(_))));
            match self.reply {
                Reply::Text(text) => Ok(RawResponse::from_text(text)),
                Reply::NonText => Ok(RawResponse::new(vec![json!({
                    "inlineData": { "mimeType": "image/png", "data": "AAAA" }
                })])),
                Reply::Empty => Ok(RawResponse::default()),
                Reply::Fail => Err(anyhow::anyhow!("connection reset")),
            }
        }
    }

    /// Holds every `generate` call until the test releases it.
    #[derive(Debug, Default)]
    struct GatedModel {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl VisionModel for GatedModel {
        async fn generate(&self, _request: &VisionRequest) -> anyhow::Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(RawResponse::from_text("Answer: \"Done.\""))
        }
    }

    fn png() -> Option<UploadedFile> {
        Some(UploadedFile {
            file_name: "leaf.png".to_owned(),
            content_type: Some("image/png".to_owned()),
            bytes: b"png-bytes".to_vec(),
        })
    }

    fn data(ledger: Ledger, model: Arc<FakeModel>) -> Data {
        Data::new(ledger, model, "Teach.", Duration::ZERO)
    }

    #[tokio::test]
    async fn successful_turn_is_appended_to_the_ledger() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let ledger = Ledger::new(temp.path().join("chat_history.csv"));
        let model = FakeModel::new(Reply::Text("Answer: \"Leaves **make** sugar.\""));
        let data = data(ledger.clone(), model.clone());

        let completed = run_turn(&data, "What does a leaf do?", png()).await?;
        assert_eq!(completed.turn.bot_response(), "Answer: \"Leaves make sugar.\"");
        assert_eq!(completed.turn.user_input(), "What does a leaf do?");
        assert!(completed.saved);
        assert!(completed.image_preview.starts_with("data:image/png;base64,"));
        assert_eq!(model.calls(), 1);

        let history = ledger.load_all();
        assert_eq!(history.turns().last(), Some(&completed.turn));
        Ok(())
    }

    #[tokio::test]
    async fn missing_image_never_touches_the_ledger_or_model() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("chat_history.csv");
        let model = FakeModel::new(Reply::Text("unused"));
        let data = data(Ledger::new(&path), model.clone());

        let result = run_turn(&data, "What is this?", None).await;
        assert!(matches!(result, Err(TurnError::MissingImage)));
        assert_eq!(model.calls(), 0);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_image_is_a_warning() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("chat_history.csv");
        let model = FakeModel::new(Reply::Text("unused"));
        let data = data(Ledger::new(&path), model.clone());
        let upload = Some(UploadedFile {
            file_name: "clip.gif".to_owned(),
            content_type: Some("image/gif".to_owned()),
            bytes: b"gif".to_vec(),
        });

        let err = run_turn(&data, "", upload).await.unwrap_err();
        assert!(err.is_warning());
        assert_eq!(model.calls(), 0);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn remote_failure_leaves_no_partial_write() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("chat_history.csv");
        let data = data(Ledger::new(&path), FakeModel::new(Reply::Fail));

        let err = run_turn(&data, "Explain", png()).await.unwrap_err();
        assert!(matches!(err, TurnError::RemoteService(_)));
        assert!(!err.is_warning());
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_reply_leaves_no_partial_write() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let ledger = Ledger::new(temp.path().join("chat_history.csv"));
        run_turn(&data(ledger.clone(), FakeModel::new(Reply::Text("first answer"))), "first", png())
            .await?;

        for reply in [Reply::NonText, Reply::Empty] {
            let err = run_turn(&data(ledger.clone(), FakeModel::new(reply)), "second", png())
                .await
                .unwrap_err();
            assert!(matches!(err, TurnError::MalformedResponse(_)));
        }

        assert_eq!(ledger.load_all().turns().len(), 1);
        Ok(())
    }

    #[test]
    fn normalize_errors_map_to_malformed_response() {
        let err = TurnError::from(NormalizeError::MissingColon);
        assert!(matches!(err, TurnError::MalformedResponse(_)));
        assert_eq!(
            err.user_message(),
            "The model replied in a format that could not be read. Please try again."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn turns_run_one_at_a_time_and_wait_out_the_reveal_delay() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let ledger = Ledger::new(temp.path().join("chat_history.csv"));
        let model = Arc::new(GatedModel::default());
        let delay = Duration::from_secs(2);
        let data = Data::new(ledger.clone(), model.clone(), "Teach.", delay);

        let first = tokio::spawn({
            let data = data.clone();
            async move { run_turn(&data, "first", png()).await }
        });
        model.entered.notified().await;

        let second = tokio::spawn({
            let data = data.clone();
            async move { run_turn(&data, "second", png()).await }
        });
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert!(!second.is_finished());

        let released = Instant::now();
        model.release.notify_one();
        let first = first.await??;
        assert!(released.elapsed() >= delay);
        assert_eq!(first.turn.bot_response(), "Answer: \"Done.\"");

        model.entered.notified().await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        let released = Instant::now();
        model.release.notify_one();
        let second = second.await??;
        assert!(released.elapsed() >= delay);

        let history = ledger.load_all();
        let inputs: Vec<&str> = history.turns().iter().map(|turn| turn.user_input()).collect();
        assert_eq!(inputs, vec!["first", "second"]);
        assert_eq!(second.turn.user_input(), "second");
        Ok(())
    }
}
