mod pipeline;

pub use pipeline::{
    is_accepted_content_type, ExtractionPipeline, PipelineStage, UploadedImage,
    ACCEPTED_CONTENT_TYPES,
};
