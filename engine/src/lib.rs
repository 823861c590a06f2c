pub mod backend;
pub mod batch;
pub mod request;

pub use backend::{GenerateError, ImageBackend, OpenAiImages};
pub use batch::{BatchSummary, LineRecord, dispatch, run_batch};
pub use request::{GenerationRequest, JobSpec, RequestDefaults, slugify};
