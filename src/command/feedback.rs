use super::Command;
use crate::domain::HttpResult;
use crate::error::{CoreError, CoreResult, require_non_empty};
use crate::service::ExerciseService;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Post answers to a feedback form
pub struct SendFeedback {
    answers: HashMap<String, String>,
    url: String,
    service: Arc<dyn ExerciseService>,
}

impl SendFeedback {
    pub fn new(answers: HashMap<String, String>, url: impl Into<String>, service: Arc<dyn ExerciseService>) -> Self {
        Self {
            answers,
            url: url.into(),
            service,
        }
    }
}

#[async_trait]
impl Command for SendFeedback {
    type Output = HttpResult;

    fn name(&self) -> &'static str {
        "send_feedback"
    }

    fn validate(&self) -> CoreResult<()> {
        require_non_empty(&[("url", self.url.as_str())])?;
        if self.answers.is_empty() {
            return Err(CoreError::Validation(
                "parameter 'answers' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(self) -> CoreResult<HttpResult> {
        let result = self
            .service
            .send_feedback(&self.answers, &self.url)
            .await
            .map_err(CoreError::Transport)?;

        if result.is_success() {
            info!("Sent {} feedback answers", self.answers.len());
        } else {
            warn!("Feedback endpoint answered {}", result.status_code);
        }
        Ok(result)
    }
}
