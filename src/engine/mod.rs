// Engine orchestration — request dispatch, cache strategies, and worker lifecycle.

pub mod dispatcher;
pub mod document;
pub mod events;
pub mod image;
pub mod lifecycle;
pub mod worker;
