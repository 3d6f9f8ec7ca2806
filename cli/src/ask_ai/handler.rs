use uuid::Uuid;

use crate::{
    ask_ai::{
        ollama::VisionModel,
        types::{AnalysisRequest, AnalysisResponse},
    },
    error::Result,
    utils::{log_analysis, Logger, Timer},
};

/// Send a chart snapshot to the vision model and return its answer verbatim.
///
/// One attempt only. Nothing is retried and no state is touched on failure.
pub async fn run_analysis(model: &dyn VisionModel, png: &[u8]) -> Result<AnalysisResponse> {
    let logger = Logger::new("ASK_AI");
    let request = AnalysisRequest::from_png(png)?;
    let timer = Timer::start("chart analysis");

    log_analysis(&format!(
        "Sending {} byte snapshot to {}",
        png.len(),
        model.model_name()
    ));

    let text = match model.analyze(&request).await {
        Ok(text) => text,
        Err(e) => {
            logger.warn_with_error(&format!("{} failed", model.model_name()), &e);
            return Err(e);
        }
    };

    let response = AnalysisResponse {
        id: Uuid::new_v4(),
        model: model.model_name().to_string(),
        text,
        elapsed_ms: timer.elapsed_ms(),
    };
    timer.log_elapsed("ASK_AI");
    logger.debug(&format!("analysis {} returned {} chars", response.id, response.text.len()));

    Ok(response)
}
